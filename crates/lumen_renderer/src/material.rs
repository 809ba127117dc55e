//! Surface materials and the named-material registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::scene::{SceneError, SceneResult};
use crate::{CheckerTexture, ConstantTexture, Hitpoint, Texture};
use lumen_math::DVec3;

/// Color type alias (linear RGB radiance or reflectance)
pub type Color = DVec3;

/// How a surface scatters light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflectionType {
    /// Lambertian, sampled over the cosine-weighted hemisphere
    Diffuse,
    /// Perfect mirror
    Specular,
    /// Dielectric with Fresnel-weighted reflection and refraction
    Refractive,
}

/// Reflectance texture, emission and scattering model of a surface.
#[derive(Debug, Clone)]
pub struct Material {
    albedo: Arc<dyn Texture>,
    emission: Color,
    reflection: ReflectionType,
}

impl Material {
    pub fn new(albedo: Arc<dyn Texture>, emission: Color, reflection: ReflectionType) -> Self {
        Self {
            albedo,
            emission,
            reflection,
        }
    }

    /// Diffuse material with a constant albedo.
    pub fn diffuse(albedo: Color) -> Self {
        Self::textured(Arc::new(ConstantTexture::new(albedo)))
    }

    /// Diffuse material with a spatially varying albedo.
    pub fn textured(albedo: Arc<dyn Texture>) -> Self {
        Self::new(albedo, Color::ZERO, ReflectionType::Diffuse)
    }

    /// Mirror tinted by `albedo`.
    pub fn specular(albedo: Color) -> Self {
        Self::new(
            Arc::new(ConstantTexture::new(albedo)),
            Color::ZERO,
            ReflectionType::Specular,
        )
    }

    /// Glass-like dielectric tinted by `albedo`.
    pub fn refractive(albedo: Color) -> Self {
        Self::new(
            Arc::new(ConstantTexture::new(albedo)),
            Color::ZERO,
            ReflectionType::Refractive,
        )
    }

    /// Black diffuse emitter.
    pub fn light(emission: Color) -> Self {
        Self::new(
            Arc::new(ConstantTexture::new(Color::ZERO)),
            emission,
            ReflectionType::Diffuse,
        )
    }

    /// Reflectance at a hitpoint.
    #[inline]
    pub fn albedo_at(&self, hitpoint: &Hitpoint) -> Color {
        self.albedo.value(hitpoint)
    }

    #[inline]
    pub fn emission(&self) -> Color {
        self.emission
    }

    #[inline]
    pub fn reflection(&self) -> ReflectionType {
        self.reflection
    }

    pub fn is_emissive(&self) -> bool {
        self.emission.element_sum() > 0.0
    }
}

/// Named materials shared between scene objects.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: HashMap<String, Arc<Material>>,
}

impl MaterialRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the stock palette used by the built-in scenes.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.insert("red", Material::diffuse(Color::new(0.75, 0.25, 0.25)));
        registry.insert("blue", Material::diffuse(Color::new(0.25, 0.25, 0.75)));
        registry.insert("gray", Material::diffuse(Color::splat(0.75)));
        registry.insert("black", Material::diffuse(Color::ZERO));
        registry.insert("cyan", Material::diffuse(Color::new(0.25, 0.75, 0.75)));
        registry.insert("green", Material::diffuse(Color::new(0.25, 0.75, 0.25)));
        registry.insert("specular", Material::specular(Color::splat(0.99)));
        registry.insert("refraction", Material::refractive(Color::splat(0.99)));
        registry.insert("light", Material::light(Color::splat(36.0)));
        registry.insert("weak_light_1", Material::light(Color::splat(25.0)));
        registry.insert("weak_light_2", Material::light(Color::splat(5.0)));
        registry.insert(
            "checker",
            Material::textured(Arc::new(CheckerTexture::new(
                Color::ONE,
                Color::ZERO,
                1.0,
            ))),
        );

        registry
    }

    /// Register a material, replacing any previous one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, material: Material) -> Arc<Material> {
        let name = name.into();
        let material = Arc::new(material);
        log::debug!("Registered material '{}': {:?}", name, material.reflection());
        self.materials.insert(name, material.clone());
        material
    }

    /// Look up a material by name.
    pub fn get(&self, name: &str) -> SceneResult<Arc<Material>> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| SceneError::UnknownMaterial(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.materials.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
