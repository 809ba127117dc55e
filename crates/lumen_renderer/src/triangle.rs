//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::{Hitpoint, Hittable, Ray};
use lumen_math::{Aabb, DVec3, EPS};

/// Determinants below this are treated as a ray parallel to the triangle.
const PARALLEL_EPS: f64 = 1e-12;

/// Möller-Trumbore ray-triangle intersection.
///
/// Returns `(t, beta, gamma)` where `beta` and `gamma` are the barycentric
/// weights of `v1` and `v2`. Hits closer than [`EPS`] are rejected.
pub(crate) fn intersect_triangle(
    ray: &Ray,
    v0: DVec3,
    v1: DVec3,
    v2: DVec3,
) -> Option<(f64, f64, f64)> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction().cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < PARALLEL_EPS {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin() - v0;
    let beta = f * s.dot(h);

    if !(0.0..=1.0).contains(&beta) {
        return None;
    }

    let q = s.cross(edge1);
    let gamma = f * ray.direction().dot(q);

    if gamma < 0.0 || beta + gamma > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if t < EPS {
        return None;
    }

    Some((t, beta, gamma))
}

/// Bounding box of three vertices, padded so axis-aligned triangles keep volume.
pub(crate) fn triangle_bbox(v0: DVec3, v1: DVec3, v2: DVec3) -> Aabb {
    Aabb::from_points([v0, v1, v2]).pad(EPS)
}

/// A single triangle primitive.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    v0: DVec3,
    v1: DVec3,
    v2: DVec3,
    /// Face normal (unit length), counter-clockwise winding
    normal: DVec3,
    bbox: Aabb,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: DVec3, v1: DVec3, v2: DVec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();

        Self {
            v0,
            v1,
            v2,
            normal,
            bbox: triangle_bbox(v0, v1, v2),
        }
    }

    pub fn vertices(&self) -> [DVec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    pub fn normal(&self) -> DVec3 {
        self.normal
    }
}

impl Hittable for Triangle {
    fn hit(&self, ray: &Ray) -> Option<Hitpoint> {
        let (t, beta, gamma) = intersect_triangle(ray, self.v0, self.v1, self.v2)?;
        Some(Hitpoint::at(ray, t, self.normal).with_uv(beta, gamma))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
