// Copyright @yucwang 2026

pub extern crate nalgebra as na;

pub mod core;
pub mod integrators;
pub mod io;
pub mod math;
pub mod shapes;
pub mod solvers;

pub use crate::core::config::ViewFactorConfig;
pub use crate::core::error::{ Result, ViewFactorError };
pub use crate::core::patch::Patch;
pub use crate::solvers::view_factors::{ compute_view_factors, compute_view_factors_with, RunStats, ViewFactorResult };
