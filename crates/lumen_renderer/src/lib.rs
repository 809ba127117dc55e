//! Lumen Renderer - CPU Path Tracing
//!
//! A Monte Carlo path tracer built around a surface-area-heuristic BVH.
//! Scenes are flat lists of [`Object`]s indexed by a [`Bvh`]; the
//! [`integrator`] resolves the nearest hit per bounce and recurses with
//! Russian-roulette termination.

mod bucket;
mod bvh;
mod camera;
mod cuboid;
mod environment;
mod hittable;
pub mod integrator;
mod material;
mod mesh;
mod plane;
mod renderer;
mod scene;
pub mod scenes;
mod sphere;
mod texture;
mod triangle;

pub use bucket::{generate_buckets, Bucket, DEFAULT_BUCKET_SIZE};
pub use bvh::{Bvh, BvhConfig, BvhNode};
pub use camera::{PinholeCamera, ViewPlane};
pub use cuboid::Cuboid;
pub use environment::{ConstantEnvironment, Environment, SkyGradient, TextureEnvironment};
pub use hittable::{Hitpoint, Hittable, Intersection, Object};
pub use integrator::{intersect_objects, path_trace, TraceConfig, Tracer};
pub use material::{Color, Material, MaterialRegistry, ReflectionType};
pub use mesh::{Shading, TriangleMesh};
pub use plane::{Plane, PLANE_EXTENT};
pub use renderer::{encode_gamma, render, ImageBuffer, RenderConfig, RenderMode};
pub use scene::{Scene, SceneError, SceneResult};
pub use sphere::Sphere;
pub use texture::{
    CheckerTexture, ConstantTexture, ImageTexture, SphericalMap, Texture, TextureError,
    TextureResult,
};
pub use triangle::Triangle;

/// Re-export DVec3 and common math types from lumen_math
pub use lumen_math::{Aabb, DVec2, DVec3, Ray, EPS};
