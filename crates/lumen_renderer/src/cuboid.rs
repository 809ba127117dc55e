//! Axis-aligned solid box primitive.

use crate::{Hitpoint, Hittable, Ray};
use lumen_math::{Aabb, DVec3, EPS};

/// A solid axis-aligned box.
#[derive(Debug, Clone, Copy)]
pub struct Cuboid {
    min: DVec3,
    max: DVec3,
    bbox: Aabb,
}

/// Outward normal of the face crossed along `axis`, on the max side or not.
fn face_normal(axis: usize, max_side: bool) -> DVec3 {
    let mut n = DVec3::ZERO;
    n[axis] = if max_side { 1.0 } else { -1.0 };
    n
}

impl Cuboid {
    /// Create a box from two opposite corners, in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            min,
            max,
            bbox: Aabb::new(min, max).pad(EPS),
        }
    }

    pub fn min(&self) -> DVec3 {
        self.min
    }

    pub fn max(&self) -> DVec3 {
        self.max
    }
}

impl Hittable for Cuboid {
    fn hit(&self, ray: &Ray) -> Option<Hitpoint> {
        let origin = ray.origin();
        let direction = ray.direction();

        let mut t_in = f64::NEG_INFINITY;
        let mut t_out = f64::INFINITY;
        let mut normal_in = DVec3::ZERO;
        let mut normal_out = DVec3::ZERO;

        for axis in 0..3 {
            let inv = 1.0 / direction[axis];
            let positive = inv >= 0.0;
            let (near, far) = if positive {
                (self.min[axis], self.max[axis])
            } else {
                (self.max[axis], self.min[axis])
            };
            let t_near = (near - origin[axis]) * inv;
            let t_far = (far - origin[axis]) * inv;

            if t_near > t_in {
                t_in = t_near;
                normal_in = face_normal(axis, !positive);
            }
            if t_far < t_out {
                t_out = t_far;
                normal_out = face_normal(axis, positive);
            }
        }

        if !(t_in < t_out && t_out > EPS) {
            return None;
        }

        // Entry face from outside, exit face from inside
        let (t, normal) = if t_in > EPS {
            (t_in, normal_in)
        } else {
            (t_out, normal_out)
        };

        Some(Hitpoint::at(ray, t, normal))
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}
