//! Local frames and mirror reflection.

use crate::{DVec3, EPS};

/// Build two tangent vectors `(u, v)` completing `w` to a right-handed
/// orthonormal basis.
///
/// `w` is assumed to be unit length. The helper axis is +Y unless `w` is
/// (nearly) perpendicular to X, in which case +X is used so the cross
/// product never degenerates.
pub fn orthonormal_basis(w: DVec3) -> (DVec3, DVec3) {
    let helper = if w.x.abs() > EPS { DVec3::Y } else { DVec3::X };
    let u = helper.cross(w).normalize();
    let v = w.cross(u);
    (u, v)
}

/// Mirror `dir` about `normal`: `dir - normal * 2 * dot(normal, dir)`.
#[inline]
pub fn reflect(dir: DVec3, normal: DVec3) -> DVec3 {
    dir - normal * 2.0 * normal.dot(dir)
}
