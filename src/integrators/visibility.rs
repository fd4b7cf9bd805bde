// Copyright @yucwang 2026

use crate::core::occluder::RayOccluder;
use crate::core::rng::PairRng;
use crate::core::shape::ParametricSurface;
use crate::math::constants::{ Float, Vector2f };
use crate::math::quadrature::Domain;

/// Uniform parametric sample on `domain`. Triangle samples are drawn on the
/// unit square and rejected outside `u + v <= 1`.
pub fn sample_domain(domain: Domain, rng: &mut PairRng) -> Vector2f {
    loop {
        let u = rng.next_float();
        let v = rng.next_float();
        if domain.contains(u, v) {
            return Vector2f::new(u, v);
        }
    }
}

/// Casts `nrays` segments between random points of `a` and `b` and returns
/// how many of them are not blocked.
pub fn count_unblocked<A, B>(a: &A,
                             b: &B,
                             nrays: usize,
                             occluder: &dyn RayOccluder,
                             rng: &mut PairRng) -> usize
where
    A: ParametricSurface + ?Sized,
    B: ParametricSurface + ?Sized,
{
    let mut hit = 0usize;
    for _ in 0..nrays {
        let sa = sample_domain(a.domain(), rng);
        let sb = sample_domain(b.domain(), rng);
        let p0 = a.position(sa.x, sa.y);
        let p1 = b.position(sb.x, sb.y);
        if !occluder.ray_blocked(&p0, &p1) {
            hit += 1;
        }
    }
    hit
}

/// Fraction of unblocked rays, `hit / nrays`.
pub fn visible_fraction(hit: usize, nrays: usize) -> Float {
    if nrays == 0 {
        0.0
    } else {
        hit as Float / nrays as Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::occluder::{ NoOcclusion, OccluderScene };
    use crate::core::patch::Patch;
    use crate::math::constants::Vector3f;
    use crate::shapes::bilinear::BiLinear;
    use crate::shapes::triangle::Triangle;

    fn square(z: Float, half: Float) -> Patch {
        BiLinear::from_corners([Vector3f::new(0.5 - half, 0.5 - half, z),
                                Vector3f::new(0.5 + half, 0.5 - half, z),
                                Vector3f::new(0.5 + half, 0.5 + half, z),
                                Vector3f::new(0.5 - half, 0.5 + half, z)]).into()
    }

    #[test]
    fn test_triangle_samples_stay_inside() {
        let mut rng = PairRng::new(3);
        for _ in 0..1000 {
            let s = sample_domain(Domain::UnitTriangle, &mut rng);
            assert!(s.x + s.y <= 1.0);
        }
    }

    #[test]
    fn test_counts_follow_occluder() {
        let a = square(0.0, 0.5);
        let b = square(2.0, 0.5);
        let blocker = square(1.0, 1.5);
        let mut rng = PairRng::new(11);

        assert_eq!(count_unblocked(&a, &b, 16, &NoOcclusion, &mut rng), 16);

        let scene = OccluderScene::new(&[a.clone(), b.clone(), blocker], 4, 1e-4);
        assert_eq!(count_unblocked(&a, &b, 16, &scene, &mut rng), 0);

        // Blocker covering only half the line of sight.
        let half = BiLinear::from_corners([Vector3f::new(-1.0, -1.0, 1.0),
                                           Vector3f::new(0.5, -1.0, 1.0),
                                           Vector3f::new(0.5, 2.0, 1.0),
                                           Vector3f::new(-1.0, 2.0, 1.0)]);
        let scene = OccluderScene::new(&[a.clone(), b.clone(), half.into()], 4, 1e-4);
        let hit = count_unblocked(&a, &b, 256, &scene, &mut rng);
        assert!(hit > 0 && hit < 256);
        assert!((visible_fraction(hit, 256) - 0.5).abs() < 0.15);
    }

    #[test]
    fn test_triangle_patch_sampling() {
        let t = Triangle::new(Vector3f::new(0.0, 0.0, 0.0),
                              Vector3f::new(1.0, 0.0, 0.0),
                              Vector3f::new(0.0, 1.0, 0.0));
        let b = square(1.0, 0.5);
        let mut rng = PairRng::new(5);
        assert_eq!(count_unblocked(&t, &b, 8, &NoOcclusion, &mut rng), 8);
        assert_eq!(visible_fraction(0, 0), 0.0);
    }
}
