// Copyright @yucwang 2026

//! Cosine-law integrals between a point and a patch, and between two patches.
//!
//! Flat targets in full view of the emitting point use the closed contour
//! form of the point-to-area factor. It stays exact when the target touches
//! the emitting patch along an edge or a corner, where the fixed quadrature
//! rule does not converge under refinement.

use crate::core::shape::ParametricSurface;
use crate::math::constants::{ COS_EPSILON, Float, INV_PI, SINGULAR_DISTANCE2, Vector3f };
use crate::math::quadrature;

/// Differential-area to area factor from the point `from` with unit normal
/// `from_normal` to `target`:
///
/// `F = sum_i w_i dA(u_i, v_i) cosA_i cosB_i / (pi r_i^2)`
///
/// Samples behind either surface, and samples coinciding with `from`,
/// contribute nothing.
pub fn integrate_diff_to_area<S>(target: &S, from: &Vector3f, from_normal: &Vector3f) -> Float
where
    S: ParametricSurface + ?Sized,
{
    let mut f = 0.0;
    for q in quadrature::points(target.domain()) {
        let d = target.position(q.u, q.v) - from;
        let r2 = d.norm_squared();
        if r2 < SINGULAR_DISTANCE2 {
            continue;
        }
        let r = r2.sqrt();

        let cos_a = d.dot(from_normal) / r;
        if cos_a <= COS_EPSILON {
            continue;
        }

        let n = match target.normal(q.u, q.v) {
            Some(n) => n,
            None => continue,
        };
        let cos_b = -d.dot(&n) / r;
        if cos_b <= COS_EPSILON {
            continue;
        }

        f += q.w * target.area_element(q.u, q.v) * cos_a * cos_b / r2;
    }

    f * INV_PI
}

// Target corners below this height over the tangent plane, relative to
// their distance, count as behind the horizon.
const HORIZON_TOLERANCE: Float = 1e-9;

/// Exact differential-area to area factor of the flat polygon `outline`
/// with unit normal `target_normal`:
///
/// `F = |sum_k theta_k n . (R_k x R_k+1) / |R_k x R_k+1|| / (2 pi)`
///
/// with `R_k` the corners relative to `from`. Returns `None` when part of
/// the polygon lies behind the tangent plane at `from`, since the contour
/// form does not clip at the horizon.
pub fn polygon_diff_to_area(outline: &[Vector3f],
                            target_normal: &Vector3f,
                            from: &Vector3f,
                            from_normal: &Vector3f) -> Option<Float> {
    let scale = outline.iter().map(|c| (c - from).norm()).fold(0.0, Float::max);
    if !(scale > 0.0) {
        return Some(0.0);
    }
    // Behind the target, or in its plane.
    if target_normal.dot(&(from - outline[0])) <= HORIZON_TOLERANCE * scale {
        return Some(0.0);
    }
    for c in outline {
        let d = c - from;
        if d.dot(from_normal) < -HORIZON_TOLERANCE * d.norm() {
            return None;
        }
    }

    let mut sum = 0.0;
    for k in 0..outline.len() {
        let r0 = outline[k] - from;
        let r1 = outline[(k + 1) % outline.len()] - from;
        let g = r0.cross(&r1);
        let g_norm = g.norm();
        if !(g_norm > 0.0) {
            continue;
        }
        let theta = g_norm.atan2(r0.dot(&r1));
        sum += theta * from_normal.dot(&g) / g_norm;
    }

    Some((0.5 * INV_PI * sum).abs())
}

/// Midpoint estimate: `integrate_diff_to_area` from the centroid of `from`.
pub fn estimate_from_centroid<A, B>(from: &A, target: &B) -> Float
where
    A: ParametricSurface + ?Sized,
    B: ParametricSurface + ?Sized,
{
    match from.centroid_normal() {
        Some(n) => integrate_diff_to_area(target, &from.centroid(), &n),
        None => 0.0,
    }
}

/// Unoccluded exchange `A_a F_ab` between two patches: the differential
/// factor to `target`, integrated over `source`. The inner factor is the
/// contour form for flat targets in full view, the quadrature otherwise.
pub fn integrate_area_to_area<A, B>(source: &A, target: &B) -> Float
where
    A: ParametricSurface + ?Sized,
    B: ParametricSurface + ?Sized,
{
    let flat = target.flat_outline()
        .and_then(|outline| target.centroid_normal().map(|n| (outline, n)));

    let mut flux = 0.0;
    for q in quadrature::points(source.domain()) {
        let n = match source.normal(q.u, q.v) {
            Some(n) => n,
            None => continue,
        };
        let ea = source.area_element(q.u, q.v);
        if !(ea > 0.0) {
            continue;
        }
        let p = source.position(q.u, q.v);
        let f = flat.as_ref()
            .and_then(|(outline, target_normal)| polygon_diff_to_area(outline, target_normal, &p, &n))
            .unwrap_or_else(|| integrate_diff_to_area(target, &p, &n));
        flux += q.w * ea * f;
    }
    flux
}
