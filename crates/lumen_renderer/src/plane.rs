//! Infinite plane primitive.

use crate::{Hitpoint, Hittable, Ray};
use lumen_math::{Aabb, DVec3, EPS};

/// Half-size of a plane's bounding box along its in-plane directions.
///
/// Finite so box areas stay finite in the BVH cost model.
pub const PLANE_EXTENT: f64 = 1e64;

/// An infinite plane through `point` with unit `normal`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    point: DVec3,
    normal: DVec3,
    bbox: Aabb,
}

impl Plane {
    pub fn new(point: DVec3, normal: DVec3) -> Self {
        let normal = normal.normalize_or_zero();

        // Thin along the normal when it is axis-aligned, huge everywhere else
        let half = DVec3::select(
            normal.abs().cmpge(DVec3::splat(1.0 - EPS)),
            DVec3::splat(EPS),
            DVec3::splat(PLANE_EXTENT),
        );
        let bbox = Aabb::new(point - half, point + half);

        Self {
            point,
            normal,
            bbox,
        }
    }

    pub fn normal(&self) -> DVec3 {
        self.normal
    }
}

impl Hittable for Plane {
    fn hit(&self, ray: &Ray) -> Option<Hitpoint> {
        let denom = ray.direction().dot(self.normal);
        if denom.abs() < 1e-12 {
            return None;
        }

        let t = (self.point - ray.origin()).dot(self.normal) / denom;
        if t <= EPS {
            return None;
        }

        let position = ray.at(t);
        // Planar coordinates for checker or image lookup
        let (u, v) = if self.normal.y.abs() >= self.normal.x.abs().max(self.normal.z.abs()) {
            (position.x, position.z)
        } else if self.normal.x.abs() >= self.normal.z.abs() {
            (position.y, position.z)
        } else {
            (position.x, position.y)
        };

        Some(Hitpoint {
            distance: t,
            position,
            normal: self.normal,
            u,
            v,
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
