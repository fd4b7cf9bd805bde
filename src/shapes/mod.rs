// Copyright @yucwang 2026

pub mod bilinear;
pub mod facet;
pub mod triangle;
