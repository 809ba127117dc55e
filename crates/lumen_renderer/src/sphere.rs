//! Sphere primitive for ray tracing.

use crate::{Hitpoint, Hittable, Ray};
use lumen_math::{Aabb, DVec3, EPS};
use std::f64::consts::PI;

/// A sphere primitive.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    center: DVec3,
    radius: f64,
    bbox: Aabb,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: DVec3, radius: f64) -> Self {
        let radius = radius.max(0.0);
        let rvec = DVec3::splat(radius + EPS);
        let bbox = Aabb::new(center - rvec, center + rvec);

        Self {
            center,
            radius,
            bbox,
        }
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn get_sphere_uv(p: DVec3) -> (f64, f64) {
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;

        (phi / (2.0 * PI), theta / PI)
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray) -> Option<Hitpoint> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        if a == 0.0 {
            return None;
        }
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();
        let near = (h - sqrtd) / a;
        let far = (h + sqrtd) / a;

        // Nearest root in front of the origin; the far root covers rays
        // starting inside the sphere.
        let t = if near > EPS {
            near
        } else if far > EPS {
            far
        } else {
            return None;
        };

        let position = ray.at(t);
        let normal = (position - self.center).normalize();
        let (u, v) = Self::get_sphere_uv(normal);

        Some(Hitpoint {
            distance: t,
            position,
            normal,
            u,
            v,
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, -1.0), 0.5);
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 0.0, -1.0));

        let hit = sphere.hit(&ray).expect("should hit");
        assert!((hit.distance - 0.5).abs() < 1e-9);
        assert!((hit.normal - DVec3::Z).length() < 1e-9);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, -1.0), 0.5);

        // Ray pointing away from sphere
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 1.0, 0.0));
        assert!(sphere.hit(&ray).is_none());

        // Sphere entirely behind the origin
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        assert!(sphere.hit(&ray).is_none());
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let sphere = Sphere::new(DVec3::ZERO, 2.0);
        let ray = Ray::new(DVec3::ZERO, DVec3::X);

        let hit = sphere.hit(&ray).expect("should hit far side");
        assert!((hit.distance - 2.0).abs() < 1e-9);
        // Outward normal, same direction as the ray
        assert!(hit.normal.dot(ray.direction()) > 0.0);
    }

    #[test]
    fn test_sphere_unnormalized_direction() {
        let sphere = Sphere::new(DVec3::new(0.0, 0.0, -10.0), 1.0);
        let ray = Ray::new(DVec3::ZERO, DVec3::new(0.0, 0.0, -3.0));

        let hit = sphere.hit(&ray).expect("should hit");
        assert!((hit.distance - 3.0).abs() < 1e-9);
        assert!((hit.position.z + 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_huge_radius_precision() {
        // Cornell-box style wall: radius 1e5
        let wall = Sphere::new(DVec3::new(1e5 + 1.0, 40.8, 81.6), 1e5);
        let ray = Ray::new(DVec3::new(50.0, 40.8, 81.6), -DVec3::X);

        let hit = wall.hit(&ray).expect("should hit the wall");
        assert!((hit.position.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_bbox() {
        let sphere = Sphere::new(DVec3::new(1.0, 2.0, 3.0), 1.0);
        let bbox = sphere.bounding_box();
        assert!(bbox.min().x < 0.0 && bbox.min().x > -1e-3);
        assert!(bbox.max().z > 4.0 && bbox.max().z < 4.001);
    }
}
