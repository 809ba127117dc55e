use crate::{DVec3, Ray, EPS};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// Stored as two corners with `min <= max` component-wise, plus a cached
/// center. The corners are private so the ordering invariant holds after
/// every mutation. [`Aabb::EMPTY`] (min = +inf, max = -inf) is the identity
/// element of [`Aabb::surrounding`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    min: DVec3,
    max: DVec3,
    center: DVec3,
}

impl Aabb {
    /// The empty box (contains nothing, merges as identity).
    pub const EMPTY: Aabb = Aabb {
        min: DVec3::INFINITY,
        max: DVec3::NEG_INFINITY,
        center: DVec3::ZERO,
    };

    /// Create an AABB from two corner points, in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            min,
            max,
            center: (min + max) * 0.5,
        }
    }

    /// Create an AABB around a set of points. Returns [`Aabb::EMPTY`] for no points.
    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        points
            .into_iter()
            .fold(Aabb::EMPTY, |acc, p| Aabb::surrounding(&acc, &Aabb::new(p, p)))
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        if box0.is_empty() {
            return *box1;
        }
        if box1.is_empty() {
            return *box0;
        }
        Aabb::new(box0.min.min(box1.min), box0.max.max(box1.max))
    }

    /// Grow this box in place so it also encloses `other`.
    pub fn grow(&mut self, other: &Aabb) {
        *self = Aabb::surrounding(self, other);
    }

    /// Replace both corners, re-establishing the ordering invariant.
    pub fn set_corners(&mut self, a: DVec3, b: DVec3) {
        *self = Aabb::new(a, b);
    }

    #[inline]
    pub fn min(&self) -> DVec3 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> DVec3 {
        self.max
    }

    /// Returns the center point of the bounding box (origin for an empty box).
    #[inline]
    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// True when the box contains no point at all.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Edge lengths along x, y and z.
    pub fn extent(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Surface area `2 (lx ly + lx lz + ly lz)`. Zero for empty and flat boxes.
    pub fn area(&self) -> f64 {
        let l = self.extent();
        2.0 * (l.x * l.y + l.x * l.z + l.y * l.z)
    }

    /// True when `other` lies entirely inside this box (boundaries included).
    pub fn contains(&self, other: &Aabb) -> bool {
        if other.is_empty() {
            return true;
        }
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    /// Test if a ray intersects this AABB.
    ///
    /// Slab method: the entry time is the largest per-axis near distance,
    /// the exit time the smallest per-axis far distance. A zero direction
    /// component yields an infinite reciprocal, which IEEE-754 min/max
    /// propagate without special-casing. The hit must end strictly in front
    /// of the origin (`exit > EPS`), so a ray leaving the box from a face
    /// reports no hit.
    pub fn hit(&self, ray: &Ray) -> bool {
        if self.is_empty() {
            return false;
        }

        let inv = ray.direction.recip();
        let t_a = (self.min - ray.origin) * inv;
        let t_b = (self.max - ray.origin) * inv;

        let t_near = t_a.min(t_b);
        let t_far = t_a.max(t_b);

        let t0 = t_near.max_element();
        let t1 = t_far.min_element();

        t0 < t1 && t1 > EPS
    }

    /// Translate (move) the AABB by an offset vector.
    pub fn translate(&self, offset: DVec3) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb::new(self.min + offset, self.max + offset)
    }

    /// Scale both corners about the origin.
    pub fn scale(&self, factor: f64) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb::new(self.min * factor, self.max * factor)
    }

    /// Grow the box by `delta` on every side.
    pub fn pad(&self, delta: f64) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb::new(self.min - DVec3::splat(delta), self.max + DVec3::splat(delta))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}
