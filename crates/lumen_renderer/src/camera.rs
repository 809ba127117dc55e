//! Pinhole camera and the view plane that primary rays pass through.

use lumen_math::{DVec2, DVec3, Ray};

/// Camera with its eye at a point, looking towards `lookat`.
///
/// The view plane sits `dist` in front of the eye; world up is +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    eye: DVec3,
    lookat: DVec3,
    dist: f64,
    u: DVec3,
    v: DVec3,
    w: DVec3,
}

impl PinholeCamera {
    pub fn new(eye: DVec3, lookat: DVec3, dist: f64) -> Self {
        let w = (eye - lookat).normalize();
        let u = DVec3::Y.cross(w).normalize();
        let v = w.cross(u);

        Self {
            eye,
            lookat,
            dist,
            u,
            v,
            w,
        }
    }

    pub fn eye(&self) -> DVec3 {
        self.eye
    }

    pub fn lookat(&self) -> DVec3 {
        self.lookat
    }

    /// Camera basis `(u, v, w)`; `w` points from the target back to the eye.
    pub fn basis(&self) -> (DVec3, DVec3, DVec3) {
        (self.u, self.v, self.w)
    }

    /// Unit direction from the eye through view-plane point `p`.
    pub fn ray_direction(&self, p: DVec2) -> DVec3 {
        (p.x * self.u + p.y * self.v - self.dist * self.w).normalize()
    }

    /// Primary ray through view-plane point `p`.
    pub fn ray(&self, p: DVec2) -> Ray {
        Ray::new(self.eye, self.ray_direction(p))
    }
}

/// Pixel grid laid over the view plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPlane {
    pub plane_width: f64,
    pub width: u32,
    pub height: u32,
    pixel_size: f64,
}

impl ViewPlane {
    pub fn new(plane_width: f64, width: u32, height: u32) -> Self {
        Self {
            plane_width,
            width,
            height,
            pixel_size: plane_width / f64::from(width.max(1)),
        }
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    pub fn plane_height(&self) -> f64 {
        self.pixel_size * f64::from(self.height)
    }

    /// Centre of subpixel `(i, j)` of pixel `(row, column)` on an
    /// `super_samples` x `super_samples` grid. Row 0 is the top of the image.
    pub fn sample_point(&self, row: u32, column: u32, i: u32, j: u32, super_samples: u32) -> DVec2 {
        let ss = f64::from(super_samples.max(1));
        let half_w = 0.5 * f64::from(self.width);
        let half_h = 0.5 * f64::from(self.height);

        DVec2::new(
            self.pixel_size * (f64::from(column) - half_w + (f64::from(j) + 0.5) / ss),
            self.pixel_size * (half_h - f64::from(row) - 1.0 + (f64::from(i) + 0.5) / ss),
        )
    }
}
