// Re-export glam for convenience
pub use glam::*;

// Lumen math types
mod aabb;
mod basis;
mod ray;

pub use aabb::Aabb;
pub use basis::{orthonormal_basis, reflect};
pub use ray::Ray;

/// Tolerance used by every "strictly in front of the origin" test.
pub const EPS: f64 = 1e-6;
