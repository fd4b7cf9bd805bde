// Copyright 2020 @TwoCookingMice

use super::constants::{Float, Vector3f};

pub struct Ray3f {
    origin: Vector3f,
    dir: Vector3f,
    pub min_t: Float,
    pub max_t: Float
}

impl Ray3f {
    pub fn new(o: Vector3f, d: Vector3f,
               min_t: Option<Float>, max_t: Option<Float>) -> Self {
        Self { origin: o, dir: d.normalize(),
               min_t: min_t.unwrap_or(0.0),
               max_t: max_t.unwrap_or(std::f64::MAX)}
    }

    /// Ray covering the open segment `p0 -> p1`, shrunk by `trim * |p1 - p0|`
    /// at both ends. Returns `None` for coincident end points.
    pub fn segment(p0: Vector3f, p1: Vector3f, trim: Float) -> Option<Self> {
        let d = p1 - p0;
        let length = d.norm();
        if !(length > 0.0) {
            return None;
        }

        let margin = trim * length;
        Some(Self { origin: p0, dir: d / length,
                    min_t: margin,
                    max_t: length - margin })
    }

    pub fn origin(&self) -> Vector3f {
        self.origin
    }

    pub fn dir(&self) -> Vector3f {
        self.dir
    }

    pub fn at(&self, t: Float) -> Vector3f {
        self.origin + self.dir * t
    }

    pub fn test_segment(&self, t: Float) -> bool {
        t >= self.min_t && t <= self.max_t
    }
}

/* Tests for Ray */

#[cfg(test)]
mod tests {
    use super::Vector3f;
    use super::{Ray3f};

    #[test]
    fn test_ray3f() {
        let o = Vector3f::new(0.0, 0.0, 0.0);
        let d = Vector3f::new(1.0, 0.0, 1.0);
        let ray = Ray3f::new(o, d, None, None);
        assert_eq!(o, ray.origin());

        let v1 = ray.at(2.0);
        assert!((v1[0] - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!(v1[1].abs() < 1e-12);
        assert!((v1[2] - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn test_segment_window() {
        let p0 = Vector3f::new(0.0, 0.0, 0.0);
        let p1 = Vector3f::new(0.0, 0.0, 4.0);
        let ray = Ray3f::segment(p0, p1, 0.25).unwrap();

        assert!((ray.min_t - 1.0).abs() < 1e-12);
        assert!((ray.max_t - 3.0).abs() < 1e-12);
        assert!(ray.test_segment(2.0));
        assert!(!ray.test_segment(0.5));
        assert!(!ray.test_segment(3.5));

        assert!(Ray3f::segment(p0, p0, 0.25).is_none());
    }
}
