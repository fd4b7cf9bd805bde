/* Copyright 2020 @Yuchen Wong */

pub type Float = f64;
pub type Int = i32;

pub type Vector2f = nalgebra::Vector2<Float>;
pub type Vector3f = nalgebra::Vector3<Float>;

pub const FLOAT_MIN: Float = std::f64::MIN;
pub const FLOAT_MAX: Float = std::f64::MAX;

pub const EPSILON: Float = 1e-9;
pub const PI: Float = std::f64::consts::PI;
pub const INV_PI: Float = std::f64::consts::FRAC_1_PI;

// Cosines at or below this value put a sample behind one of the surfaces.
pub const COS_EPSILON: Float = 1e-8;
// Squared distances below this value are treated as coincident points.
pub const SINGULAR_DISTANCE2: Float = 1e-24;
