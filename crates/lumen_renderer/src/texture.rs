//! Textures: spatially varying colors evaluated at a hitpoint.
//!
//! Materials hold their albedo as an `Arc<dyn Texture>` so one image can be
//! shared by many objects and by the environment.

use std::f64::consts::PI;
use std::path::Path;

use thiserror::Error;

use crate::{Color, Hitpoint};
use lumen_math::{DVec3, EPS};

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Texture has no pixels: {0}")]
    Empty(String),

    #[error("Pixel buffer of {got} texels does not match {width}x{height}")]
    SizeMismatch { width: u32, height: u32, got: usize },
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A color that varies over a surface.
pub trait Texture: Send + Sync + std::fmt::Debug {
    fn value(&self, hitpoint: &Hitpoint) -> Color;
}

/// The same color everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTexture {
    pub color: Color,
}

impl ConstantTexture {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Texture for ConstantTexture {
    fn value(&self, _hitpoint: &Hitpoint) -> Color {
        self.color
    }
}

/// 3D checkerboard in world space with cells of edge `size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckerTexture {
    pub color1: Color,
    pub color2: Color,
    pub size: f64,
}

impl CheckerTexture {
    pub fn new(color1: Color, color2: Color, size: f64) -> Self {
        Self {
            color1,
            color2,
            size,
        }
    }
}

impl Texture for CheckerTexture {
    fn value(&self, hitpoint: &Hitpoint) -> Color {
        let p = hitpoint.position * PI / self.size + DVec3::splat(EPS);
        let v = p.x.sin() * p.y.sin() * p.z.sin();

        if v < 0.0 {
            self.color1
        } else {
            self.color2
        }
    }
}

/// Latitude-longitude mapping of a unit direction, rotated about +Y.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SphericalMap {
    rotation: f64,
}

impl SphericalMap {
    /// Rotation in whole degrees; values wrap at 360.
    pub fn new(degrees: i32) -> Self {
        Self {
            rotation: 2.0 * PI * f64::from(degrees.rem_euclid(360)) / 360.0,
        }
    }

    /// `(u, v)` in `[0, 1]` for a unit direction. `v = 1` is straight up.
    pub fn uv(&self, direction: DVec3) -> (f64, f64) {
        let theta = direction.y.clamp(-1.0, 1.0).acos();
        let phi = (direction.x.atan2(direction.z) + self.rotation).rem_euclid(2.0 * PI);

        (phi / (2.0 * PI), 1.0 - theta / PI)
    }
}

/// A bitmap looked up by nearest texel.
#[derive(Debug, Clone)]
pub struct ImageTexture {
    width: u32,
    height: u32,
    /// Row-major, top row first
    pixels: Vec<Color>,
    mapping: Option<SphericalMap>,
}

impl ImageTexture {
    /// Create a texture from row-major pixel data, top row first.
    pub fn new(width: u32, height: u32, pixels: Vec<Color>) -> TextureResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty(format!("{width}x{height}")));
        }
        if pixels.len() != (width as usize) * (height as usize) {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                got: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            mapping: None,
        })
    }

    /// Load an image file in any format the `image` crate decodes.
    ///
    /// Radiance `.hdr` files keep their linear radiance values; 8-bit formats
    /// are scaled to `[0, 1]`.
    pub fn open(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let img = image::open(path)?.into_rgb32f();
        let (width, height) = img.dimensions();

        let pixels = img
            .pixels()
            .map(|p| Color::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])))
            .collect();

        log::debug!("Loaded texture: {} ({}x{})", path.display(), width, height);

        Self::new(width, height, pixels)
    }

    /// Address texels through a spherical map of the hit normal instead of (u, v).
    pub fn with_mapping(mut self, mapping: SphericalMap) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at `(u, v)`, wrapped into `[0, 1)`, with `v = 0` at the bottom.
    pub fn sample(&self, u: f64, v: f64) -> Color {
        let u = if u == 1.0 { u } else { u.rem_euclid(1.0) };
        let v = if v == 1.0 { v } else { v.rem_euclid(1.0) };

        let row = ((1.0 - v) * f64::from(self.height - 1)) as usize;
        let column = (u * f64::from(self.width - 1)) as usize;

        let row = row.min(self.height as usize - 1);
        let column = column.min(self.width as usize - 1);
        self.pixels[row * self.width as usize + column]
    }
}

impl Texture for ImageTexture {
    fn value(&self, hitpoint: &Hitpoint) -> Color {
        let (u, v) = match &self.mapping {
            Some(mapping) => mapping.uv(hitpoint.normal),
            None => (hitpoint.u, hitpoint.v),
        };
        self.sample(u, v)
    }
}
