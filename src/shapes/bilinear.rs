// Copyright @yucwang 2026

use crate::core::shape::{ curve_length, transform_fields, Field, ParametricSurface, PatchKind };
use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::quadrature::Domain;
use crate::shapes::facet::Facet;

// Relative tolerance of the planarity test.
const PLANAR_TOLERANCE: Float = 1e-8;

/// Parametric corners in nodal order: (0,0), (1,0), (1,1), (0,1).
const UNIT_CORNERS: [(Float, Float); 4] = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

/// Bilinear quadrilateral. Each field is `a0 + a1 u + a2 v + a3 u v` on the
/// unit square.
#[derive(Debug, Clone, PartialEq)]
pub struct BiLinear {
    fields: [[Float; 4]; 6],
}

impl BiLinear {
    pub fn from_fields(fields: [[Float; 4]; 6]) -> Self {
        Self { fields }
    }

    /// Corner positions and corner normals, counter-clockwise seen from the
    /// side the normals point to.
    pub fn from_nodes(corners: [Vector3f; 4], normals: [Vector3f; 4]) -> Self {
        let mut fields = [[0.0; 4]; 6];
        for axis in 0..3 {
            fields[axis] = nodal_to_poly([corners[0][axis], corners[1][axis],
                                          corners[2][axis], corners[3][axis]]);
            fields[axis + 3] = nodal_to_poly([normals[0][axis], normals[1][axis],
                                              normals[2][axis], normals[3][axis]]);
        }
        Self { fields }
    }

    /// Corner positions only; corner normals follow `dP/du x dP/dv`.
    pub fn from_corners(corners: [Vector3f; 4]) -> Self {
        let mut geometry = Self::from_nodes(corners, [Vector3f::zeros(); 4]);
        let mut normals = [Vector3f::zeros(); 4];
        for (n, &(u, v)) in normals.iter_mut().zip(UNIT_CORNERS.iter()) {
            let g = geometry.dp_du(u, v).cross(&geometry.dp_dv(u, v));
            if g.norm() > 0.0 {
                *n = g.normalize();
            }
        }
        for axis in 0..3 {
            geometry.fields[axis + 3] = nodal_to_poly([normals[0][axis], normals[1][axis],
                                                       normals[2][axis], normals[3][axis]]);
        }
        geometry
    }

    pub fn fields(&self) -> &[[Float; 4]; 6] {
        &self.fields
    }

    pub fn corners(&self) -> [Vector3f; 4] {
        UNIT_CORNERS.map(|(u, v)| self.position(u, v))
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

    /// Re-fit the basis through the fields sampled at four parametric
    /// corners of a sub-domain.
    fn refit(&self, corners: [(Float, Float); 4]) -> Self {
        let mut fields = [[0.0; 4]; 6];
        for field in Field::ALL {
            let nodal = corners.map(|(u, v)| self.value(u, v, field));
            fields[field.index()] = nodal_to_poly(nodal);
        }
        Self { fields }
    }

    fn u_length(&self) -> Float {
        curve_length(self, |t| (t, 0.0, 1.0, 0.0)) + curve_length(self, |t| (t, 1.0, 1.0, 0.0))
    }

    fn v_length(&self) -> Float {
        curve_length(self, |t| (0.0, t, 0.0, 1.0)) + curve_length(self, |t| (1.0, t, 0.0, 1.0))
    }
}

fn nodal_to_poly(f: [Float; 4]) -> [Float; 4] {
    [f[0], f[1] - f[0], f[3] - f[0], f[0] - f[1] + f[2] - f[3]]
}

impl ParametricSurface for BiLinear {
    fn kind(&self) -> PatchKind {
        PatchKind::BiLinear
    }

    fn domain(&self) -> Domain {
        Domain::UnitSquare
    }

    fn value(&self, u: Float, v: Float, field: Field) -> Float {
        let a = &self.fields[field.index()];
        a[0] + a[1] * u + a[2] * v + a[3] * u * v
    }

    fn partial_u(&self, _u: Float, v: Float, field: Field) -> Float {
        let a = &self.fields[field.index()];
        a[1] + a[3] * v
    }

    fn partial_v(&self, u: Float, _v: Float, field: Field) -> Float {
        let a = &self.fields[field.index()];
        a[2] + a[3] * u
    }

    fn centroid_uv(&self) -> Vector2f {
        Vector2f::new(0.5, 0.5)
    }

    fn subdivide(&self) -> (Self, Self) {
        if self.u_length() > self.v_length() {
            (self.refit([(0.0, 0.0), (0.5, 0.0), (0.5, 1.0), (0.0, 1.0)]),
             self.refit([(0.5, 0.0), (1.0, 0.0), (1.0, 1.0), (0.5, 1.0)]))
        } else {
            (self.refit([(0.0, 0.0), (1.0, 0.0), (1.0, 0.5), (0.0, 0.5)]),
             self.refit([(0.0, 0.5), (1.0, 0.5), (1.0, 1.0), (0.0, 1.0)]))
        }
    }

    fn is_planar(&self) -> bool {
        let c = self.corners();
        let size = (c[2] - c[0]).norm().max((c[3] - c[1]).norm());
        if !(size > 0.0) {
            return true;
        }

        let plane = (c[1] - c[0]).cross(&(c[3] - c[0]));
        if plane.norm() > 0.0 {
            let offset = (c[2] - c[0]).dot(&plane.normalize()).abs();
            if offset > PLANAR_TOLERANCE * size {
                return false;
            }
        }

        let normals: Vec<Option<Vector3f>> = UNIT_CORNERS.iter()
            .map(|&(u, v)| self.normal(u, v))
            .collect();
        match normals[0] {
            Some(n0) => normals.iter().all(|n| match n {
                Some(n) => (n - n0).norm() <= PLANAR_TOLERANCE,
                None => false,
            }),
            None => false,
        }
    }

    fn flat_outline(&self) -> Option<Vec<Vector3f>> {
        if self.is_planar() {
            Some(self.corners().to_vec())
        } else {
            None
        }
    }

    fn tessellate(&self, resolution: usize) -> Vec<Facet> {
        let n = if self.is_planar() { 1 } else { resolution.max(1) };
        let step = 1.0 / n as Float;
        let mut facets = Vec::with_capacity(2 * n * n);
        for j in 0..n {
            for i in 0..n {
                let (u0, v0) = (i as Float * step, j as Float * step);
                let (u1, v1) = (u0 + step, v0 + step);
                let p00 = self.position(u0, v0);
                let p10 = self.position(u1, v0);
                let p11 = self.position(u1, v1);
                let p01 = self.position(u0, v1);
                facets.push(Facet::new(p00, p10, p11));
                facets.push(Facet::new(p00, p11, p01));
            }
        }
        facets.retain(|f| !f.is_degenerate());
        facets
    }
}
