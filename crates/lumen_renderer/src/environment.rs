//! Background radiance for rays that leave the scene.

use std::sync::Arc;

use crate::{Color, Hitpoint, Texture};
use lumen_math::DVec3;

/// Radiance arriving from infinitely far away along a direction.
pub trait Environment: Send + Sync {
    fn radiance(&self, direction: DVec3) -> Color;
}

/// Solid background color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantEnvironment(pub Color);

impl Environment for ConstantEnvironment {
    fn radiance(&self, _direction: DVec3) -> Color {
        self.0
    }
}

/// White at the horizon below, sky blue straight up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyGradient {
    pub horizon: Color,
    pub zenith: Color,
}

impl Default for SkyGradient {
    fn default() -> Self {
        Self {
            horizon: Color::ONE,
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }
}

impl Environment for SkyGradient {
    fn radiance(&self, direction: DVec3) -> Color {
        let unit_direction = direction.normalize_or_zero();
        let a = 0.5 * (unit_direction.y + 1.0);
        self.horizon * (1.0 - a) + self.zenith * a
    }
}

/// Image-based lighting: a texture evaluated with the direction as normal.
///
/// Pair it with an [`crate::ImageTexture`] carrying a [`crate::SphericalMap`]
/// for a latitude-longitude environment map.
#[derive(Debug, Clone)]
pub struct TextureEnvironment {
    texture: Arc<dyn Texture>,
}

impl TextureEnvironment {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        Self { texture }
    }
}

impl Environment for TextureEnvironment {
    fn radiance(&self, direction: DVec3) -> Color {
        let hitpoint = Hitpoint {
            normal: direction.normalize_or_zero(),
            ..Hitpoint::default()
        };
        self.texture.value(&hitpoint)
    }
}
