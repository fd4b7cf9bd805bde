// Copyright @yucwang 2026

use crate::core::shape::{ Field, ParametricSurface, PatchKind };
use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::math::quadrature::Domain;
use crate::shapes::bilinear::BiLinear;
use crate::shapes::facet::Facet;
use crate::shapes::triangle::Triangle;

/// A boundary element: one of the supported parametric variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    BiLinear(BiLinear),
    Triangle(Triangle),
}

impl From<BiLinear> for Patch {
    fn from(p: BiLinear) -> Self {
        Patch::BiLinear(p)
    }
}

impl From<Triangle> for Patch {
    fn from(p: Triangle) -> Self {
        Patch::Triangle(p)
    }
}

impl Patch {
    pub fn flip_normals(&mut self) {
        match self {
            Patch::BiLinear(p) => p.flip_normals(),
            Patch::Triangle(p) => p.flip_normals(),
        }
    }

    pub fn apply_transform(&mut self, scale: &Vector3f, translate: &Vector3f) {
        match self {
            Patch::BiLinear(p) => p.apply_transform(scale, translate),
            Patch::Triangle(p) => p.apply_transform(scale, translate),
        }
    }
}

impl ParametricSurface for Patch {
    fn kind(&self) -> PatchKind {
        match self {
            Patch::BiLinear(p) => p.kind(),
            Patch::Triangle(p) => p.kind(),
        }
    }

    fn domain(&self) -> Domain {
        match self {
            Patch::BiLinear(p) => p.domain(),
            Patch::Triangle(p) => p.domain(),
        }
    }

    fn value(&self, u: Float, v: Float, field: Field) -> Float {
        match self {
            Patch::BiLinear(p) => p.value(u, v, field),
            Patch::Triangle(p) => p.value(u, v, field),
        }
    }

    fn partial_u(&self, u: Float, v: Float, field: Field) -> Float {
        match self {
            Patch::BiLinear(p) => p.partial_u(u, v, field),
            Patch::Triangle(p) => p.partial_u(u, v, field),
        }
    }

    fn partial_v(&self, u: Float, v: Float, field: Field) -> Float {
        match self {
            Patch::BiLinear(p) => p.partial_v(u, v, field),
            Patch::Triangle(p) => p.partial_v(u, v, field),
        }
    }

    fn centroid_uv(&self) -> Vector2f {
        match self {
            Patch::BiLinear(p) => p.centroid_uv(),
            Patch::Triangle(p) => p.centroid_uv(),
        }
    }

    fn subdivide(&self) -> (Self, Self) {
        match self {
            Patch::BiLinear(p) => {
                let (l, r) = p.subdivide();
                (Patch::BiLinear(l), Patch::BiLinear(r))
            }
            Patch::Triangle(p) => {
                let (l, r) = p.subdivide();
                (Patch::Triangle(l), Patch::Triangle(r))
            }
        }
    }

    fn is_planar(&self) -> bool {
        match self {
            Patch::BiLinear(p) => p.is_planar(),
            Patch::Triangle(p) => p.is_planar(),
        }
    }

    fn tessellate(&self, resolution: usize) -> Vec<Facet> {
        match self {
            Patch::BiLinear(p) => p.tessellate(resolution),
            Patch::Triangle(p) => p.tessellate(resolution),
        }
    }

    fn flat_outline(&self) -> Option<Vec<Vector3f>> {
        match self {
            Patch::BiLinear(p) => p.flat_outline(),
            Patch::Triangle(p) => p.flat_outline(),
        }
    }
}

/// Surface area of a boundary element.
pub fn patch_area(patch: &Patch) -> Float {
    patch.area()
}
