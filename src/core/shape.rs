// Copyright @yucwang 2026

use crate::math::constants::{ EPSILON, Float, Vector2f, Vector3f };
use crate::math::quadrature::{ self, Domain };
use crate::shapes::facet::Facet;

/// The six scalar fields every patch interpolates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    X = 0,
    Y = 1,
    Z = 2,
    NormalX = 3,
    NormalY = 4,
    NormalZ = 5,
}

impl Field {
    pub const ALL: [Field; 6] = [Field::X, Field::Y, Field::Z,
                                 Field::NormalX, Field::NormalY, Field::NormalZ];
    pub const POSITION: [Field; 3] = [Field::X, Field::Y, Field::Z];
    pub const NORMAL: [Field; 3] = [Field::NormalX, Field::NormalY, Field::NormalZ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PatchKind {
    BiLinear,
    Triangle,
}

/// A surface fragment described by six fields over a parametric domain.
///
/// Implementors provide field evaluation, partial derivatives, subdivision
/// and tessellation; positions, normals and the area element are derived.
pub trait ParametricSurface {
    fn kind(&self) -> PatchKind;
    fn domain(&self) -> Domain;

    fn value(&self, u: Float, v: Float, field: Field) -> Float;
    fn partial_u(&self, u: Float, v: Float, field: Field) -> Float;
    fn partial_v(&self, u: Float, v: Float, field: Field) -> Float;

    /// Parametric centroid used for the midpoint estimates.
    fn centroid_uv(&self) -> Vector2f;

    /// Split into two halves along the longer parametric direction.
    fn subdivide(&self) -> (Self, Self) where Self: Sized;

    fn is_planar(&self) -> bool;

    /// Flat triangles approximating the surface, for occlusion queries.
    fn tessellate(&self, resolution: usize) -> Vec<Facet>;

    /// Corner polygon of a flat patch whose normal field is constant.
    /// `None` for curved patches.
    fn flat_outline(&self) -> Option<Vec<Vector3f>> {
        None
    }

    fn position(&self, u: Float, v: Float) -> Vector3f {
        Vector3f::new(self.value(u, v, Field::X),
                      self.value(u, v, Field::Y),
                      self.value(u, v, Field::Z))
    }

    fn dp_du(&self, u: Float, v: Float) -> Vector3f {
        Vector3f::new(self.partial_u(u, v, Field::X),
                      self.partial_u(u, v, Field::Y),
                      self.partial_u(u, v, Field::Z))
    }

    fn dp_dv(&self, u: Float, v: Float) -> Vector3f {
        Vector3f::new(self.partial_v(u, v, Field::X),
                      self.partial_v(u, v, Field::Y),
                      self.partial_v(u, v, Field::Z))
    }

    /// Unit normal at `(u, v)`. Falls back to the orientation of the
    /// position field when the interpolated normal vanishes.
    fn normal(&self, u: Float, v: Float) -> Option<Vector3f> {
        let n = Vector3f::new(self.value(u, v, Field::NormalX),
                              self.value(u, v, Field::NormalY),
                              self.value(u, v, Field::NormalZ));
        let len2 = n.norm_squared();
        if len2 > EPSILON * EPSILON {
            return Some(n / len2.sqrt());
        }

        let g = self.dp_du(u, v).cross(&self.dp_dv(u, v));
        let len2 = g.norm_squared();
        if len2 > 0.0 {
            Some(g / len2.sqrt())
        } else {
            None
        }
    }

    /// `sqrt(det a_ij)` of the first fundamental form.
    fn area_element(&self, u: Float, v: Float) -> Float {
        let pu = self.dp_du(u, v);
        let pv = self.dp_dv(u, v);
        let auu = pu.dot(&pu);
        let auv = pu.dot(&pv);
        let avv = pv.dot(&pv);

        (auu * avv - auv * auv).max(0.0).sqrt()
    }

    fn area(&self) -> Float {
        quadrature::points(self.domain())
            .map(|q| q.w * self.area_element(q.u, q.v))
            .sum()
    }

    fn centroid(&self) -> Vector3f {
        let c = self.centroid_uv();
        self.position(c.x, c.y)
    }

    fn centroid_normal(&self) -> Option<Vector3f> {
        let c = self.centroid_uv();
        self.normal(c.x, c.y)
    }
}

/// Arc length of the parametric curve `t -> position(curve(t))`, t in [0, 1].
pub fn curve_length<S, C>(surface: &S, curve: C) -> Float
where
    S: ParametricSurface + ?Sized,
    C: Fn(Float) -> (Float, Float, Float, Float),
{
    // `curve` yields (u, v, du/dt, dv/dt).
    quadrature::rule_1d()
        .map(|(t, w)| {
            let (u, v, du, dv) = curve(t);
            let tangent = surface.dp_du(u, v) * du + surface.dp_dv(u, v) * dv;
            w * tangent.norm()
        })
        .sum()
}

/// Scales then translates the position fields of a coefficient table. Normal
/// fields follow the inverse scale so they stay perpendicular to the surface.
pub fn transform_fields<const N: usize>(fields: &mut [[Float; N]; 6],
                                        scale: &Vector3f,
                                        translate: &Vector3f) {
    for axis in 0..3 {
        for a in fields[axis].iter_mut() {
            *a *= scale[axis];
        }
        fields[axis][0] += translate[axis];

        if scale[axis] != 0.0 {
            for a in fields[axis + 3].iter_mut() {
                *a /= scale[axis];
            }
        }
    }
}
