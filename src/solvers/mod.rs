// Copyright @yucwang 2026

pub mod view_factors;
