// Copyright @yucwang 2026

pub mod bvh;
pub mod config;
pub mod enclosure_loader;
pub mod error;
pub mod link_table;
pub mod occluder;
pub mod patch;
pub mod rng;
pub mod shape;
pub mod tree;
