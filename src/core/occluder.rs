// Copyright @yucwang 2026

use crate::core::bvh::BVH;
use crate::core::patch::Patch;
use crate::core::shape::ParametricSurface;
use crate::math::constants::{ Float, Vector3f };
use crate::math::ray::Ray3f;
use crate::shapes::facet::Facet;

/// Line-of-sight query against the complete enclosure geometry.
pub trait RayOccluder: Send + Sync {
    /// True when something lies strictly between `p0` and `p1`.
    fn ray_blocked(&self, p0: &Vector3f, p1: &Vector3f) -> bool;
}

/// Occluder that never blocks. Useful for convex enclosures.
pub struct NoOcclusion;

impl RayOccluder for NoOcclusion {
    fn ray_blocked(&self, _p0: &Vector3f, _p1: &Vector3f) -> bool {
        false
    }
}

/// Flat-facet approximation of all patches behind a BVH.
pub struct OccluderScene {
    facets: Vec<Facet>,
    bvh: BVH,
    trim: Float,
}

impl OccluderScene {
    pub fn new(patches: &[Patch], resolution: usize, trim: Float) -> Self {
        let facets = patches.iter()
            .flat_map(|patch| patch.tessellate(resolution))
            .collect();
        Self::from_facets(facets, trim)
    }

    pub fn from_facets(facets: Vec<Facet>, trim: Float) -> Self {
        // Flat facets give zero-thickness boxes; pad them so the slab test
        // stays robust.
        let bounds = facets.iter().map(|f| f.bounding_box().padded(1e-9)).collect();
        let bvh = BVH::new(bounds);
        log::debug!("occluder: {} facets", facets.len());
        Self { facets, bvh, trim }
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }
}

impl RayOccluder for OccluderScene {
    fn ray_blocked(&self, p0: &Vector3f, p1: &Vector3f) -> bool {
        let ray = match Ray3f::segment(*p0, *p1, self.trim) {
            Some(ray) => ray,
            None => return false,
        };
        self.bvh.any_hit(&ray, |idx, ray| self.facets[idx].ray_intersection_t(ray))
    }
}
