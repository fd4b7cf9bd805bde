// Copyright @yucwang 2023

use crate::math::aabb::AABB;
use crate::math::constants::{ Float, Vector3f };
use crate::math::ray::Ray3f;

// Rays closer than this to the facet plane (|cos|) are treated as parallel.
const PARALLEL_EPSILON: Float = 1e-12;

/// Flat triangle used by the occluder.
#[derive(Debug, Clone)]
pub struct Facet {
    p0: Vector3f,
    p1: Vector3f,
    p2: Vector3f,
}

impl Facet {
    pub fn new(p0: Vector3f, p1: Vector3f, p2: Vector3f) -> Self {
        Self { p0, p1, p2 }
    }

    pub fn vertices(&self) -> (Vector3f, Vector3f, Vector3f) {
        (self.p0, self.p1, self.p2)
    }

    pub fn bounding_box(&self) -> AABB {
        let mut bound = AABB::new(self.p0, self.p1);
        bound.expand_by_point(&self.p2);

        bound
    }

    pub fn surface_area(&self) -> Float {
        0.5 * (self.p1 - self.p0).cross(&(self.p2 - self.p0)).norm()
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.surface_area() > 0.0)
    }

    /// Any-hit test inside the ray's `[min_t, max_t]` window.
    pub fn ray_intersection_t(&self, ray: &Ray3f) -> bool {
        let edge0 = self.p1 - self.p0;
        let edge1 = self.p2 - self.p0;
        let geo_normal = edge0.cross(&edge1);
        let norm = geo_normal.norm();
        if !(norm > 0.0) {
            return false;
        }
        let geo_normal = geo_normal / norm;

        let n_dot_dir = geo_normal.dot(&ray.dir());
        if n_dot_dir.abs() < PARALLEL_EPSILON {
            return false;
        }

        let plane_d = geo_normal.dot(&self.p0);
        let t = (plane_d - geo_normal.dot(&ray.origin())) / n_dot_dir;
        if !ray.test_segment(t) {
            return false;
        }

        self.is_in_triangle(&ray.at(t))
    }

    fn is_in_triangle(&self, p: &Vector3f) -> bool {
        let geo_normal = (self.p1 - self.p0).cross(&(self.p2 - self.p0));

        let n0 = (self.p1 - self.p0).cross(&(p - self.p0));
        let n1 = (self.p2 - self.p1).cross(&(p - self.p1));
        let n2 = (self.p0 - self.p2).cross(&(p - self.p2));

        n0.dot(&geo_normal) >= 0.0 && n1.dot(&geo_normal) >= 0.0 && n2.dot(&geo_normal) >= 0.0
    }
}
