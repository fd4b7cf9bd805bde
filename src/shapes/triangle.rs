// Copyright @yucwang 2023

use crate::core::shape::{ curve_length, transform_fields, Field, ParametricSurface, PatchKind };
use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::quadrature::Domain;
use crate::shapes::facet::Facet;

const FLAT_NORMAL_TOLERANCE: Float = 1e-8;

/// Linear triangle. Each field is `a0 + a1 u + a2 v` on `u, v >= 0, u + v <= 1`;
/// vertices sit at (0,0), (1,0) and (0,1).
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    fields: [[Float; 3]; 6],
}

impl Triangle {
    pub fn from_fields(fields: [[Float; 3]; 6]) -> Self {
        Self { fields }
    }

    pub fn from_nodes(vertices: [Vector3f; 3], normals: [Vector3f; 3]) -> Self {
        let mut fields = [[0.0; 3]; 6];
        for axis in 0..3 {
            fields[axis] = nodal_to_poly([vertices[0][axis], vertices[1][axis], vertices[2][axis]]);
            fields[axis + 3] = nodal_to_poly([normals[0][axis], normals[1][axis], normals[2][axis]]);
        }
        Self { fields }
    }

    /// Vertices only; the normal is the geometric one, `(p1 - p0) x (p2 - p0)`.
    pub fn new(p0: Vector3f, p1: Vector3f, p2: Vector3f) -> Self {
        let n = (p1 - p0).cross(&(p2 - p0));
        let n = if n.norm() > 0.0 { n.normalize() } else { n };
        Self::from_nodes([p0, p1, p2], [n, n, n])
    }

    pub fn fields(&self) -> &[[Float; 3]; 6] {
        &self.fields
    }

    pub fn vertices(&self) -> [Vector3f; 3] {
        [self.position(0.0, 0.0), self.position(1.0, 0.0), self.position(0.0, 1.0)]
    }

    pub fn flip_normals(&mut self) {
        for field in Field::NORMAL {
            for a in self.fields[field.index()].iter_mut() {
                *a = -*a;
            }
        }
    }

    pub fn apply_transform(&mut self, scale: &Vector3f, translate: &Vector3f) {
        transform_fields(&mut self.fields, scale, translate);
    }

    fn refit(&self, corners: [(Float, Float); 3]) -> Self {
        let mut fields = [[0.0; 3]; 6];
        for field in Field::ALL {
            let nodal = corners.map(|(u, v)| self.value(u, v, field));
            fields[field.index()] = nodal_to_poly(nodal);
        }
        Self { fields }
    }

    fn edge_lengths(&self) -> [Float; 3] {
        [curve_length(self, |t| (t, 0.0, 1.0, 0.0)),
         curve_length(self, |t| (1.0 - t, t, -1.0, 1.0)),
         curve_length(self, |t| (0.0, 1.0 - t, 0.0, -1.0))]
    }
}

fn nodal_to_poly(f: [Float; 3]) -> [Float; 3] {
    [f[0], f[1] - f[0], f[2] - f[0]]
}

impl ParametricSurface for Triangle {
    fn kind(&self) -> PatchKind {
        PatchKind::Triangle
    }

    fn domain(&self) -> Domain {
        Domain::UnitTriangle
    }

    fn value(&self, u: Float, v: Float, field: Field) -> Float {
        let a = &self.fields[field.index()];
        a[0] + a[1] * u + a[2] * v
    }

    fn partial_u(&self, _u: Float, _v: Float, field: Field) -> Float {
        self.fields[field.index()][1]
    }

    fn partial_v(&self, _u: Float, _v: Float, field: Field) -> Float {
        self.fields[field.index()][2]
    }

    fn centroid_uv(&self) -> Vector2f {
        Vector2f::new(1.0 / 3.0, 1.0 / 3.0)
    }

    /// Bisects the longest edge; children keep the parent's orientation.
    fn subdivide(&self) -> (Self, Self) {
        let [e0, e1, e2] = self.edge_lengths();
        if e0 >= e1 && e0 >= e2 {
            (self.refit([(0.0, 0.0), (0.5, 0.0), (0.0, 1.0)]),
             self.refit([(0.5, 0.0), (1.0, 0.0), (0.0, 1.0)]))
        } else if e1 >= e2 {
            (self.refit([(0.0, 0.0), (1.0, 0.0), (0.5, 0.5)]),
             self.refit([(0.0, 0.0), (0.5, 0.5), (0.0, 1.0)]))
        } else {
            (self.refit([(0.0, 0.0), (1.0, 0.0), (0.0, 0.5)]),
             self.refit([(0.0, 0.5), (1.0, 0.0), (0.0, 1.0)]))
        }
    }

    fn is_planar(&self) -> bool {
        true
    }

    fn tessellate(&self, _resolution: usize) -> Vec<Facet> {
        let [p0, p1, p2] = self.vertices();
        let facet = Facet::new(p0, p1, p2);
        if facet.is_degenerate() {
            Vec::new()
        } else {
            vec![facet]
        }
    }

    /// Only for a constant normal field; smoothed vertex normals keep the
    /// quadrature path.
    fn flat_outline(&self) -> Option<Vec<Vector3f>> {
        let n0 = self.normal(0.0, 0.0)?;
        for (u, v) in [(1.0, 0.0), (0.0, 1.0)] {
            if (self.normal(u, v)? - n0).norm() > FLAT_NORMAL_TOLERANCE {
                return None;
            }
        }
        Some(self.vertices().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right_triangle() -> Triangle {
        Triangle::new(Vector3f::new(0.0, 0.0, 0.0),
                      Vector3f::new(2.0, 0.0, 0.0),
                      Vector3f::new(0.0, 1.0, 0.0))
    }

    #[test]
    fn test_area_and_normal() {
        let tri = right_triangle();
        assert!((tri.area() - 1.0).abs() < 1e-14);
        assert!((tri.area_element(0.2, 0.2) - 2.0).abs() < 1e-14);

        let n = tri.normal(0.1, 0.1).unwrap();
        assert!((n - Vector3f::new(0.0, 0.0, 1.0)).norm() < 1e-14);

        let c = tri.centroid();
        assert!((c - Vector3f::new(2.0 / 3.0, 1.0 / 3.0, 0.0)).norm() < 1e-14);
    }

    #[test]
    fn test_subdivide_bisects_longest_edge() {
        let tri = right_triangle();
        let (left, right) = tri.subdivide();

        // Hypotenuse from (2,0,0) to (0,1,0) is the longest edge.
        let mid = Vector3f::new(1.0, 0.5, 0.0);
        assert!((left.vertices()[2] - mid).norm() < 1e-14);
        assert!((right.vertices()[1] - mid).norm() < 1e-14);
        assert!((left.area() + right.area() - tri.area()).abs() < 1e-14);

        for child in [&left, &right] {
            let n = child.normal(0.2, 0.2).unwrap();
            assert!((n - Vector3f::new(0.0, 0.0, 1.0)).norm() < 1e-14);
            let g = child.dp_du(0.0, 0.0).cross(&child.dp_dv(0.0, 0.0));
            assert!(g.z > 0.0);
        }
    }

    #[test]
    fn test_flat_outline_needs_constant_normals() {
        let tri = right_triangle();
        assert_eq!(tri.flat_outline().unwrap().len(), 3);

        let p = tri.vertices();
        let up = Vector3f::new(0.0, 0.0, 1.0);
        let tilted = Vector3f::new(0.0, 0.6, 0.8);
        let smooth = Triangle::from_nodes(p, [up, up, tilted]);
        assert!(smooth.flat_outline().is_none());
    }

    #[test]
    fn test_tessellate_single_facet() {
        let facets = right_triangle().tessellate(8);
        assert_eq!(facets.len(), 1);
        assert!((facets[0].surface_area() - 1.0).abs() < 1e-14);
    }
}
