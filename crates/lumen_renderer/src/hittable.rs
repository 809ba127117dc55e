//! Hittable trait, hit records and scene objects.

use std::sync::Arc;

use crate::{Color, Material, Ray};
use lumen_math::{Aabb, DVec3};

/// Record of a ray-surface intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitpoint {
    /// Parameter t along the ray, `f64::INFINITY` for "no hit"
    pub distance: f64,
    /// Point of intersection
    pub position: DVec3,
    /// Geometric surface normal (unit length, not oriented against the ray)
    pub normal: DVec3,
    /// Surface parameterization for texture lookup
    pub u: f64,
    pub v: f64,
}

impl Default for Hitpoint {
    fn default() -> Self {
        Self {
            distance: f64::INFINITY,
            position: DVec3::ZERO,
            normal: DVec3::ZERO,
            u: 0.0,
            v: 0.0,
        }
    }
}

impl Hitpoint {
    /// Build a hitpoint at parameter `t` along `ray`.
    pub fn at(ray: &Ray, t: f64, normal: DVec3) -> Self {
        Self {
            distance: t,
            position: ray.at(t),
            normal,
            u: 0.0,
            v: 0.0,
        }
    }

    /// Attach surface coordinates.
    pub fn with_uv(mut self, u: f64, v: f64) -> Self {
        self.u = u;
        self.v = v;
        self
    }

    /// The normal flipped, if needed, to face the side the ray came from.
    #[inline]
    pub fn orienting_normal(&self, direction: DVec3) -> DVec3 {
        if self.normal.dot(direction) < 0.0 {
            self.normal
        } else {
            -self.normal
        }
    }
}

/// The nearest hit across a set of objects, plus the id of its owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub hitpoint: Hitpoint,
    pub object_id: usize,
}

/// Trait for geometry that can be hit by rays.
///
/// Implementations must be total: degenerate configurations report `None`
/// rather than panicking.
pub trait Hittable: Send + Sync {
    /// Nearest intersection strictly in front of the ray origin, if any.
    fn hit(&self, ray: &Ray) -> Option<Hitpoint>;

    /// Tight axis-aligned bounding box of this geometry.
    fn bounding_box(&self) -> Aabb;
}

/// A piece of geometry paired with the material it is shaded with.
pub struct Object {
    shape: Box<dyn Hittable>,
    material: Arc<Material>,
}

impl Object {
    /// Create a new scene object.
    pub fn new(shape: impl Hittable + 'static, material: Arc<Material>) -> Self {
        Self {
            shape: Box::new(shape),
            material,
        }
    }

    /// Create a scene object from already boxed geometry.
    pub fn from_boxed(shape: Box<dyn Hittable>, material: Arc<Material>) -> Self {
        Self { shape, material }
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Center of the bounding box, used as the light position by the preview tracer.
    pub fn center(&self) -> DVec3 {
        self.shape.bounding_box().center()
    }

    pub fn emission(&self) -> Color {
        self.material.emission()
    }
}

impl Hittable for Object {
    fn hit(&self, ray: &Ray) -> Option<Hitpoint> {
        self.shape.hit(ray)
    }

    fn bounding_box(&self) -> Aabb {
        self.shape.bounding_box()
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("bbox", &self.shape.bounding_box())
            .field("material", &self.material)
            .finish()
    }
}
