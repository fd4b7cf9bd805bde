// Copyright @yucwang 2026

//! Fixed Gauss-Legendre rules on the unit interval and the unit square.
//!
//! Triangle domains reuse the square rule through the collapsed map
//! `(s, t) -> (s, t (1 - s))`, whose Jacobian `1 - s` is folded into the
//! weight. All patch variants therefore integrate with the same table.

use super::constants::Float;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadraturePoint {
    pub u: Float,
    pub v: Float,
    pub w: Float,
}

/// Parametric domain of a patch variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Domain {
    /// `0 <= u, v <= 1`
    UnitSquare,
    /// `u, v >= 0, u + v <= 1`
    UnitTriangle,
}

/// 4-point Gauss-Legendre rule mapped to [0, 1]: (abscissa, weight).
pub const GAUSS_1D: [(Float, Float); 4] = [
    (0.069_431_844_202_973_7, 0.173_927_422_568_726_9),
    (0.330_009_478_207_571_9, 0.326_072_577_431_273_1),
    (0.669_990_521_792_428_1, 0.326_072_577_431_273_1),
    (0.930_568_155_797_026_3, 0.173_927_422_568_726_9),
];

pub fn rule_1d() -> impl Iterator<Item = (Float, Float)> {
    GAUSS_1D.iter().copied()
}

/// Tensor product rule on the unit square.
pub fn rule_2d() -> impl Iterator<Item = QuadraturePoint> {
    GAUSS_1D.iter().flat_map(|&(u, wu)| {
        GAUSS_1D.iter().map(move |&(v, wv)| QuadraturePoint { u, v, w: wu * wv })
    })
}

pub fn points(domain: Domain) -> impl Iterator<Item = QuadraturePoint> {
    rule_2d().map(move |q| match domain {
        Domain::UnitSquare => q,
        Domain::UnitTriangle => QuadraturePoint {
            u: q.u,
            v: q.v * (1.0 - q.u),
            w: q.w * (1.0 - q.u),
        },
    })
}

impl Domain {
    pub fn contains(&self, u: Float, v: Float) -> bool {
        match self {
            Domain::UnitSquare => (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v),
            Domain::UnitTriangle => u >= 0.0 && v >= 0.0 && u + v <= 1.0,
        }
    }

    pub fn measure(&self) -> Float {
        match self {
            Domain::UnitSquare => 1.0,
            Domain::UnitTriangle => 0.5,
        }
    }
}
