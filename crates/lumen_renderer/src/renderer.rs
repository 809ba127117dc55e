//! Renderer driver.
//!
//! Walks the view plane bucket by bucket with rayon, averages
//! `samples * super_samples^2` estimates per pixel and hands back an
//! [`ImageBuffer`] that can be written as PPM or any format `image` knows.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bucket::BucketResult;
use crate::{
    generate_buckets, Bucket, Color, Scene, SceneResult, Tracer, ViewPlane, DEFAULT_BUCKET_SIZE,
};

/// Which estimator produces each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Monte Carlo path tracing
    #[default]
    Pt,
    /// Direct-lighting preview with shadow rays
    Rt,
    /// Surface albedo only
    Debug,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pt" => Ok(Self::Pt),
            "rt" => Ok(Self::Rt),
            "debug" => Ok(Self::Debug),
            other => Err(format!("unknown render mode '{other}' (expected pt, rt or debug)")),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pt => "pt",
            Self::Rt => "rt",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Path samples per subpixel
    pub samples: u32,
    /// Subpixel grid is `super_samples` x `super_samples`
    pub super_samples: u32,
    /// Width of the view plane in world units
    pub plane_width: f64,
    /// Base seed; every bucket derives its own stream from it
    pub seed: u64,
    /// Edge length of a bucket in pixels
    pub bucket_size: u32,
    pub mode: RenderMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            samples: 2,
            super_samples: 4,
            plane_width: 1.5,
            seed: 1,
            bucket_size: DEFAULT_BUCKET_SIZE,
            mode: RenderMode::Pt,
        }
    }
}

impl RenderConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_samples(mut self, samples: u32, super_samples: u32) -> Self {
        self.samples = samples;
        self.super_samples = super_samples;
        self
    }

    pub fn with_plane_width(mut self, plane_width: f64) -> Self {
        self.plane_width = plane_width;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_bucket_size(mut self, bucket_size: u32) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Estimates averaged into one pixel.
    pub fn estimates_per_pixel(&self) -> u32 {
        let ss = self.super_samples.max(1);
        let samples = match self.mode {
            RenderMode::Pt => self.samples.max(1),
            RenderMode::Rt | RenderMode::Debug => 1,
        };
        samples * ss * ss
    }
}

/// Seed of a bucket's private random stream.
fn bucket_seed(seed: u64, bucket: &Bucket) -> u64 {
    seed ^ (bucket.index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Everything a worker needs, shared immutably across threads.
struct Frame<'a> {
    tracer: Tracer<'a>,
    scene: &'a Scene,
    view_plane: ViewPlane,
    lights: Vec<usize>,
    config: &'a RenderConfig,
}

impl Frame<'_> {
    fn render_bucket(&self, bucket: &Bucket) -> BucketResult {
        let mut rng = StdRng::seed_from_u64(bucket_seed(self.config.seed, bucket));
        let pixels = bucket
            .pixels()
            .map(|(column, row)| self.render_pixel(row, column, &mut rng))
            .collect();
        BucketResult::new(*bucket, pixels)
    }

    fn render_pixel(&self, row: u32, column: u32, rng: &mut StdRng) -> Color {
        let ss = self.config.super_samples.max(1);
        let camera = self.scene.camera();
        let mut pixel = Color::ZERO;

        for i in 0..ss {
            for j in 0..ss {
                let point = self.view_plane.sample_point(row, column, i, j, ss);
                let ray = camera.ray(point);

                pixel += match self.config.mode {
                    RenderMode::Pt => (0..self.config.samples.max(1))
                        .map(|_| self.tracer.path_trace(&ray, &mut *rng, 0))
                        .sum::<Color>(),
                    RenderMode::Rt => self.tracer.ray_trace(&ray, &self.lights),
                    RenderMode::Debug => self.tracer.trace_albedo(&ray),
                };
            }
        }

        pixel / f64::from(self.config.estimates_per_pixel())
    }
}

/// Render a constructed scene.
///
/// Output is identical for identical `(scene, config)` regardless of how
/// rayon schedules the buckets.
pub fn render(scene: &Scene, config: &RenderConfig) -> SceneResult<ImageBuffer> {
    let frame = Frame {
        tracer: scene.tracer()?,
        scene,
        view_plane: ViewPlane::new(config.plane_width, config.width, config.height),
        lights: scene.lights(),
        config,
    };

    let buckets = generate_buckets(config.width, config.height, config.bucket_size);
    log::info!(
        "Rendering {}x{} in {} buckets ({} mode, {} estimates per pixel)",
        config.width,
        config.height,
        buckets.len(),
        config.mode,
        config.estimates_per_pixel()
    );

    let start = Instant::now();
    let results: Vec<BucketResult> = buckets
        .par_iter()
        .map(|bucket| frame.render_bucket(bucket))
        .collect();

    let mut image = ImageBuffer::new(config.width, config.height);
    for result in results {
        for ((column, row), color) in result.bucket.pixels().zip(result.pixels) {
            image.set(column, row, color);
        }
    }

    log::info!(
        "Rendered {}x{} in {:.2?}",
        config.width,
        config.height,
        start.elapsed()
    );

    Ok(image)
}

/// Gamma-encode a linear value to 8 bits.
#[inline]
pub fn encode_gamma(linear: f64) -> u8 {
    (linear.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0 + 0.5) as u8
}

/// Linear radiance image, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; (width as usize) * (height as usize)],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.offset(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let offset = self.offset(x, y);
        self.pixels[offset] = color;
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Gamma-encoded RGB bytes.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| [encode_gamma(c.x), encode_gamma(c.y), encode_gamma(c.z)])
            .collect()
    }

    /// Gamma-encoded RGBA bytes with opaque alpha.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| [encode_gamma(c.x), encode_gamma(c.y), encode_gamma(c.z), 255])
            .collect()
    }

    /// Write an ASCII (P3) PPM file.
    pub fn save_ppm(&self, path: impl AsRef<Path>) -> SceneResult<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);

        writeln!(out, "P3")?;
        writeln!(out, "{} {}", self.width, self.height)?;
        writeln!(out, "255")?;
        for rgb in self.to_rgb8().chunks_exact(3) {
            writeln!(out, "{} {} {}", rgb[0], rgb[1], rgb[2])?;
        }
        out.flush()?;

        log::info!("Wrote {}", path.display());
        Ok(())
    }

    /// Write the image in the format implied by the file extension.
    ///
    /// `.ppm` goes through [`ImageBuffer::save_ppm`]; anything else through `image`.
    pub fn save(&self, path: impl AsRef<Path>) -> SceneResult<()> {
        let path = path.as_ref();
        let is_ppm = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ppm"));

        if is_ppm {
            return self.save_ppm(path);
        }

        image::save_buffer(
            path,
            &self.to_rgb8(),
            self.width,
            self.height,
            image::ColorType::Rgb8,
        )?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}
