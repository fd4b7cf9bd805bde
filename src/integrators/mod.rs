// Copyright @yucwang 2026

pub mod form_factor;
pub mod pairwise;
pub mod visibility;
