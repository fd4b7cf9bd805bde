// Copyright @yucwang 2026

pub mod matrix_io;
pub mod obj_utils;
pub mod ply_utils;
