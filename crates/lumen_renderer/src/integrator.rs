//! Light transport: nearest-hit resolution and the Monte Carlo path tracer.
//!
//! [`Tracer`] bundles the read-only scene data a ray needs (objects, BVH,
//! environment, constants) so it can be shared across worker threads;
//! each worker brings its own random number generator.

use std::f64::consts::PI;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{Bvh, Color, Environment, Hittable, Intersection, Object, ReflectionType, Ray};
use lumen_math::{orthonormal_basis, reflect, DVec3, EPS};

/// Light intensity divisor of the direct-lighting preview.
const PREVIEW_LIGHT_SCALE: f64 = 360.0;

/// Integrator constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Bounces up to this depth always continue
    pub guaranteed_depth: u32,
    /// Past this depth the survival probability halves every bounce
    pub depth_limit: u32,
    /// Up to this depth dielectrics trace both reflection and refraction
    pub fresnel_split_depth: u32,
    /// Index of refraction of dielectrics (outside medium is 1.0)
    pub ior: f64,
    /// Hard recursion ceiling; a path reaching it returns its emission
    pub max_depth: u32,
    /// Ambient term of the direct-lighting preview
    pub ambient: f64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            guaranteed_depth: 4,
            depth_limit: 16,
            fresnel_split_depth: 2,
            ior: 1.5,
            max_depth: 256,
            ambient: 0.05,
        }
    }
}

/// Outcome of Snell's law at a dielectric boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Refraction {
    TotalInternalReflection,
    /// Refracted direction plus Schlick reflectance and transmittance weights
    Split {
        direction: DVec3,
        reflectance: f64,
        transmittance: f64,
    },
}

/// Refract unit `direction` at a surface with geometric `normal`.
///
/// `orienting_normal` faces the incoming side; comparing it with `normal`
/// tells whether the ray enters or leaves the medium.
pub fn refract(direction: DVec3, normal: DVec3, orienting_normal: DVec3, ior: f64) -> Refraction {
    let into = normal.dot(orienting_normal) > 0.0;

    let (n1, n2) = (1.0, ior);
    let n1n2 = if into { n1 / n2 } else { n2 / n1 };
    let ddn = direction.dot(orienting_normal);
    let cos2t = 1.0 - n1n2 * n1n2 * (1.0 - ddn * ddn);

    if cos2t < 0.0 {
        return Refraction::TotalInternalReflection;
    }

    let sign = if into { 1.0 } else { -1.0 };
    let refracted = (direction * n1n2 - normal * sign * (ddn * n1n2 + cos2t.sqrt())).normalize();

    // Schlick's approximation
    let r0 = ((n2 - n1) / (n2 + n1)).powi(2);
    let c = 1.0 - if into { -ddn } else { refracted.dot(-orienting_normal) };
    let reflectance = r0 + (1.0 - r0) * c.powi(5);
    let transmittance = (1.0 - reflectance) * n1n2 * n1n2;

    Refraction::Split {
        direction: refracted,
        reflectance,
        transmittance,
    }
}

/// Sample a direction around `w` with density proportional to `cos^exponent`.
///
/// An exponent of 1 gives cosine-weighted hemisphere sampling.
pub fn sample_hemisphere(
    u: DVec3,
    v: DVec3,
    w: DVec3,
    exponent: f64,
    rng: &mut dyn RngCore,
) -> DVec3 {
    let phi = 2.0 * PI * rng.gen::<f64>();
    let cos_theta = rng.gen::<f64>().powf(1.0 / (exponent + 1.0));
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

    u * (sin_theta * phi.cos()) + v * (sin_theta * phi.sin()) + w * cos_theta
}

/// Nearest hit among the BVH candidates of `ray`.
///
/// Only objects in leaves the ray passes through are tested.
pub fn intersect_objects(ray: &Ray, objects: &[Object], bvh: &Bvh) -> Option<Intersection> {
    let mut nearest: Option<Intersection> = None;

    bvh.for_each_candidate(ray, |object_id| {
        if let Some(hitpoint) = objects[object_id].hit(ray) {
            if nearest.map_or(true, |n| hitpoint.distance < n.hitpoint.distance) {
                nearest = Some(Intersection {
                    hitpoint,
                    object_id,
                });
            }
        }
    });

    nearest
}

/// Estimate the radiance arriving along `ray`.
///
/// Convenience wrapper around [`Tracer::path_trace`] with default constants.
pub fn path_trace(
    ray: &Ray,
    objects: &[Object],
    bvh: &Bvh,
    environment: &dyn Environment,
    rng: &mut dyn RngCore,
    depth: u32,
) -> Color {
    Tracer::new(objects, bvh, environment).path_trace(ray, rng, depth)
}

/// Read-only view of a scene for tracing rays.
#[derive(Clone, Copy)]
pub struct Tracer<'a> {
    objects: &'a [Object],
    bvh: &'a Bvh,
    environment: &'a dyn Environment,
    config: TraceConfig,
}

impl<'a> Tracer<'a> {
    pub fn new(objects: &'a [Object], bvh: &'a Bvh, environment: &'a dyn Environment) -> Self {
        Self {
            objects,
            bvh,
            environment,
            config: TraceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TraceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    #[inline]
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        intersect_objects(ray, self.objects, self.bvh)
    }

    /// Monte Carlo path tracing with Russian-roulette termination.
    ///
    /// `depth` is the number of bounces already taken; camera rays start at 0.
    pub fn path_trace(&self, ray: &Ray, rng: &mut dyn RngCore, depth: u32) -> Color {
        let Some(Intersection {
            hitpoint,
            object_id,
        }) = self.intersect(ray)
        else {
            return self.environment.radiance(ray.direction());
        };

        let material = self.objects[object_id].material();
        let emission = material.emission();

        if depth >= self.config.max_depth {
            log::trace!("Path reached depth ceiling {}", self.config.max_depth);
            return emission;
        }

        let direction = ray.direction().normalize();
        let normal = hitpoint.orienting_normal(direction);
        let albedo = material.albedo_at(&hitpoint);

        let mut survival = albedo.max_element();
        if depth > self.config.depth_limit {
            survival *= 0.5_f64.powi((depth - self.config.depth_limit) as i32);
        }

        if depth > self.config.guaranteed_depth {
            let r = rng.gen::<f64>();
            if r > survival || survival <= 0.0 {
                return emission;
            }
        } else {
            survival = 1.0;
        }

        let position = hitpoint.position;
        let next = depth + 1;
        let reflected = Ray::new(position, reflect(direction, hitpoint.normal));

        let (weight, incoming) = match material.reflection() {
            ReflectionType::Diffuse => {
                let (u, v) = orthonormal_basis(normal);
                let sampled = sample_hemisphere(u, v, normal, 1.0, rng);
                let incoming = self.path_trace(&Ray::new(position, sampled), rng, next);
                (albedo / survival, incoming)
            }

            ReflectionType::Specular => {
                let incoming = self.path_trace(&reflected, rng, next);
                (albedo / survival, incoming)
            }

            ReflectionType::Refractive => {
                match refract(direction, hitpoint.normal, normal, self.config.ior) {
                    Refraction::TotalInternalReflection => {
                        let incoming = self.path_trace(&reflected, rng, next);
                        (albedo / survival, incoming)
                    }
                    Refraction::Split {
                        direction: refracted,
                        reflectance,
                        transmittance,
                    } => {
                        let refracted = Ray::new(position, refracted);

                        if depth > self.config.fresnel_split_depth {
                            // Pick one branch, biased towards but not equal to Fresnel
                            let probability = 0.25 + 0.5 * reflectance;
                            if rng.gen::<f64>() < probability {
                                let incoming = self.path_trace(&reflected, rng, next) * reflectance;
                                (albedo / (probability * survival), incoming)
                            } else {
                                let incoming =
                                    self.path_trace(&refracted, rng, next) * transmittance;
                                (albedo / ((1.0 - probability) * survival), incoming)
                            }
                        } else {
                            let incoming = self.path_trace(&reflected, rng, next) * reflectance
                                + self.path_trace(&refracted, rng, next) * transmittance;
                            (albedo / survival, incoming)
                        }
                    }
                }
            }
        };

        emission + weight * incoming
    }

    /// Surface reflectance at the nearest hit, or the background.
    pub fn trace_albedo(&self, ray: &Ray) -> Color {
        match self.intersect(ray) {
            Some(Intersection {
                hitpoint,
                object_id,
            }) => self.objects[object_id].material().albedo_at(&hitpoint),
            None => self.environment.radiance(ray.direction()),
        }
    }

    /// Direct-lighting preview: one shadow ray per light, plus an ambient term.
    ///
    /// `lights` are object ids; each light is treated as a point at its center.
    pub fn ray_trace(&self, ray: &Ray, lights: &[usize]) -> Color {
        let Some(Intersection {
            hitpoint,
            object_id,
        }) = self.intersect(ray)
        else {
            return self.environment.radiance(ray.direction());
        };

        let material = self.objects[object_id].material();
        let normal = hitpoint.orienting_normal(ray.direction());
        let albedo = material.albedo_at(&hitpoint);

        let mut color = material.emission();

        for &light_id in lights {
            let light = &self.objects[light_id];
            let to_light = light.center() - hitpoint.position;
            let light_distance = to_light.length() - EPS;
            let shadow_ray = Ray::new(hitpoint.position + to_light * EPS, to_light.normalize());

            let mut occluded = false;
            self.bvh.for_each_candidate(&shadow_ray, |id| {
                occluded = occluded
                    || (id != light_id
                        && self.objects[id]
                            .hit(&shadow_ray)
                            .is_some_and(|hp| hp.distance < light_distance));
            });

            if !occluded {
                let cos = shadow_ray.direction().dot(normal).max(0.0);
                color += light.emission() * albedo * cos / PREVIEW_LIGHT_SCALE;
            }
        }

        color + albedo * self.config.ambient
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstantEnvironment, Material, Plane, SkyGradient, Sphere};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn build(objects: &[Object]) -> Bvh {
        let items: Vec<_> = objects
            .iter()
            .enumerate()
            .map(|(i, o)| (i, o.bounding_box()))
            .collect();
        let mut bvh = Bvh::new();
        bvh.construct(&items);
        bvh
    }

    /// Mirror floor at y = 0 with a light sphere above it.
    fn mirror_scene(mirror_albedo: f64) -> Vec<Object> {
        vec![
            Object::new(
                Plane::new(DVec3::ZERO, DVec3::Y),
                Arc::new(Material::specular(Color::splat(mirror_albedo))),
            ),
            Object::new(
                Sphere::new(DVec3::new(0.0, 5.0, 0.0), 1.0),
                Arc::new(Material::light(Color::splat(10.0))),
            ),
        ]
    }

    #[test]
    fn test_intersect_objects_nearest() {
        let gray = Arc::new(Material::diffuse(Color::splat(0.5)));
        let objects = vec![
            Object::new(Sphere::new(DVec3::new(0.0, 0.0, -10.0), 1.0), gray.clone()),
            Object::new(Sphere::new(DVec3::new(0.0, 0.0, -5.0), 1.0), gray.clone()),
            Object::new(Sphere::new(DVec3::new(5.0, 0.0, -5.0), 1.0), gray),
        ];
        let bvh = build(&objects);

        let hit = intersect_objects(&Ray::new(DVec3::ZERO, -DVec3::Z), &objects, &bvh)
            .expect("should hit");
        assert_eq!(hit.object_id, 1);
        assert!((hit.hitpoint.distance - 4.0).abs() < 1e-9);

        assert!(intersect_objects(&Ray::new(DVec3::ZERO, DVec3::Z), &objects, &bvh).is_none());
    }

    #[test]
    fn test_miss_returns_environment() {
        let objects: Vec<Object> = Vec::new();
        let bvh = Bvh::new();
        let env = ConstantEnvironment(Color::new(0.2, 0.3, 0.4));
        let mut rng = StdRng::seed_from_u64(0);

        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        let color = path_trace(&ray, &objects, &bvh, &env, &mut rng, 0);
        assert_eq!(color, Color::new(0.2, 0.3, 0.4));
    }

    #[test]
    fn test_black_emitter_returns_emission() {
        let objects = vec![Object::new(
            Sphere::new(DVec3::new(0.0, 0.0, -5.0), 1.0),
            Arc::new(Material::light(Color::new(3.0, 2.0, 1.0))),
        )];
        let bvh = build(&objects);
        let env = ConstantEnvironment(Color::splat(0.7));
        let ray = Ray::new(DVec3::ZERO, -DVec3::Z);

        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let color = path_trace(&ray, &objects, &bvh, &env, &mut rng, 0);
            assert_eq!(color, Color::new(3.0, 2.0, 1.0));
        }
    }

    #[test]
    fn test_depth_ceiling_returns_emission() {
        let material = Material::new(
            Arc::new(crate::ConstantTexture::new(Color::splat(0.9))),
            Color::splat(2.0),
            ReflectionType::Diffuse,
        );
        let objects = vec![Object::new(
            Sphere::new(DVec3::new(0.0, 0.0, -5.0), 1.0),
            Arc::new(material),
        )];
        let bvh = build(&objects);
        let env = ConstantEnvironment(Color::ONE);
        let config = TraceConfig {
            max_depth: 8,
            ..TraceConfig::default()
        };
        let tracer = Tracer::new(&objects, &bvh, &env).with_config(config);
        let mut rng = StdRng::seed_from_u64(5);

        let ray = Ray::new(DVec3::ZERO, -DVec3::Z);
        assert_eq!(tracer.path_trace(&ray, &mut rng, 8), Color::splat(2.0));
        assert_eq!(tracer.path_trace(&ray, &mut rng, 100), Color::splat(2.0));
    }

    #[test]
    fn test_mirror_reflects_light() {
        let objects = mirror_scene(0.8);
        let bvh = build(&objects);
        let env = ConstantEnvironment(Color::ZERO);
        let mut rng = StdRng::seed_from_u64(1);

        // Straight down onto the mirror, straight back up into the light
        let ray = Ray::new(DVec3::new(0.0, 3.0, 0.0), -DVec3::Y);
        let color = path_trace(&ray, &objects, &bvh, &env, &mut rng, 0);
        assert!((color - Color::splat(8.0)).length() < 1e-12, "got {color:?}");
    }

    #[test]
    fn test_russian_roulette_is_unbiased() {
        let objects = mirror_scene(0.5);
        let bvh = build(&objects);
        let env = ConstantEnvironment(Color::ZERO);
        let tracer = Tracer::new(&objects, &bvh, &env);
        let mut rng = StdRng::seed_from_u64(42);

        // Past the guaranteed depth the mirror survives half the time with weight 1
        let ray = Ray::new(DVec3::new(0.0, 3.0, 0.0), -DVec3::Y);
        let n = 20_000;
        let mut sum = Color::ZERO;
        for _ in 0..n {
            sum += tracer.path_trace(&ray, &mut rng, 5);
        }
        let mean = sum / n as f64;
        assert!((mean.x - 5.0).abs() < 0.3, "mean {mean:?}");
    }

    #[test]
    fn test_diffuse_sphere_in_uniform_light() {
        let objects = vec![Object::new(
            Sphere::new(DVec3::new(0.0, 0.0, -4.0), 1.0),
            Arc::new(Material::diffuse(Color::splat(0.5))),
        )];
        let bvh = build(&objects);
        let env = ConstantEnvironment(Color::splat(2.0));

        // Every bounce off a convex sphere escapes to the environment
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let ray = Ray::new(DVec3::ZERO, DVec3::new(0.1, 0.2, -1.0).normalize());
            let color = path_trace(&ray, &objects, &bvh, &env, &mut rng, 0);
            assert!((color - Color::splat(1.0)).length() < 1e-12, "got {color:?}");
        }
    }

    #[test]
    fn test_hemisphere_samples() {
        let mut rng = StdRng::seed_from_u64(9);
        for w in [DVec3::X, -DVec3::Y, DVec3::new(1.0, 2.0, 3.0).normalize()] {
            let (u, v) = orthonormal_basis(w);
            for _ in 0..500 {
                let d = sample_hemisphere(u, v, w, 1.0, &mut rng);
                assert!((d.length() - 1.0).abs() < 1e-9);
                assert!(d.dot(w) >= 0.0);
            }
        }
    }

    #[test]
    fn test_refract_normal_incidence() {
        let Refraction::Split {
            direction,
            reflectance,
            transmittance,
        } = refract(-DVec3::Y, DVec3::Y, DVec3::Y, 1.5)
        else {
            panic!("normal incidence cannot totally reflect");
        };

        assert!((direction + DVec3::Y).length() < 1e-12);
        assert!((reflectance - 0.04).abs() < 1e-12);
        assert!((transmittance - 0.96 / 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_refract_total_internal_reflection() {
        // Leaving glass 60 degrees off the normal is past the critical angle
        let direction = DVec3::new(60f64.to_radians().sin(), 60f64.to_radians().cos(), 0.0);
        assert_eq!(
            refract(direction, DVec3::Y, -DVec3::Y, 1.5),
            Refraction::TotalInternalReflection
        );

        // 20 degrees is below it
        let direction = DVec3::new(20f64.to_radians().sin(), 20f64.to_radians().cos(), 0.0);
        let Refraction::Split { direction: out, .. } = refract(direction, DVec3::Y, -DVec3::Y, 1.5)
        else {
            panic!("20 degrees should refract");
        };
        // Bent away from the normal
        assert!(out.y > 0.0 && out.x > direction.x);
    }

    /// Glass floor at y = 0 under a sky that is black below and bright above.
    fn glass_floor() -> (Vec<Object>, SkyGradient) {
        let objects = vec![Object::new(
            Plane::new(DVec3::ZERO, DVec3::Y),
            Arc::new(Material::refractive(Color::ONE)),
        )];
        let sky = SkyGradient {
            horizon: Color::ZERO,
            zenith: Color::splat(4.0),
        };
        (objects, sky)
    }

    /// Fresnel-weighted sky radiance for `direction` entering the glass floor.
    fn glass_floor_radiance(direction: DVec3, sky: &SkyGradient) -> Color {
        let Refraction::Split {
            direction: refracted,
            reflectance,
            transmittance,
        } = refract(direction, DVec3::Y, DVec3::Y, 1.5)
        else {
            panic!("entering glass always refracts");
        };
        sky.radiance(reflect(direction, DVec3::Y)) * reflectance
            + sky.radiance(refracted) * transmittance
    }

    #[test]
    fn test_refractive_split_traces_both_branches() {
        let (objects, sky) = glass_floor();
        let bvh = build(&objects);
        let tracer = Tracer::new(&objects, &bvh, &sky);

        let direction = DVec3::new(1.0, -1.0, 0.0).normalize();
        let ray = Ray::new(DVec3::new(-3.0, 3.0, 0.0), direction);
        let expected = glass_floor_radiance(direction, &sky);
        assert!(expected.x > 0.2 && expected.x < 0.3, "expected {expected:?}");

        // Shallow paths are deterministic whatever the seed
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let color = tracer.path_trace(&ray, &mut rng, 0);
            assert!((color - expected).length() < 1e-12, "got {color:?}");
        }
    }

    #[test]
    fn test_refractive_pick_matches_split() {
        let (objects, sky) = glass_floor();
        let bvh = build(&objects);
        let config = TraceConfig {
            fresnel_split_depth: 0,
            ..TraceConfig::default()
        };
        let tracer = Tracer::new(&objects, &bvh, &sky).with_config(config);
        let mut rng = StdRng::seed_from_u64(3);

        let direction = DVec3::new(1.0, -1.0, 0.0).normalize();
        let ray = Ray::new(DVec3::new(-3.0, 3.0, 0.0), direction);
        let expected = glass_floor_radiance(direction, &sky);

        // Depth 1 picks one branch at random but stays short of roulette
        let n = 20_000;
        let mut sum = Color::ZERO;
        let mut distinct = std::collections::HashSet::new();
        for _ in 0..n {
            let color = tracer.path_trace(&ray, &mut rng, 1);
            distinct.insert(color.x.to_bits());
            sum += color;
        }
        let mean = sum / n as f64;
        assert_eq!(distinct.len(), 2);
        assert!((mean.x - expected.x).abs() < 0.01, "mean {mean:?}, expected {expected:?}");
    }

    #[test]
    fn test_total_internal_reflection_traces_mirror_ray() {
        let (objects, sky) = glass_floor();
        let bvh = build(&objects);
        let tracer = Tracer::new(&objects, &bvh, &sky);

        // From inside the glass, 60 degrees off the normal
        let direction = DVec3::new(60f64.to_radians().sin(), 60f64.to_radians().cos(), 0.0);
        let ray = Ray::new(DVec3::new(-3.0, -3.0 / 3f64.sqrt(), 0.0), direction);
        let mirrored = sky.radiance(reflect(direction, DVec3::Y));
        assert!((mirrored.x - 1.0).abs() < 1e-12);

        for depth in [0, 3] {
            let mut rng = StdRng::seed_from_u64(depth as u64);
            let color = tracer.path_trace(&ray, &mut rng, depth);
            assert!((color - mirrored).length() < 1e-12, "depth {depth}: {color:?}");
        }
    }

    #[test]
    fn test_trace_albedo() {
        let objects = vec![Object::new(
            Sphere::new(DVec3::new(0.0, 0.0, -3.0), 1.0),
            Arc::new(Material::diffuse(Color::new(0.1, 0.2, 0.3))),
        )];
        let bvh = build(&objects);
        let env = ConstantEnvironment(Color::splat(0.5));
        let tracer = Tracer::new(&objects, &bvh, &env);

        assert_eq!(
            tracer.trace_albedo(&Ray::new(DVec3::ZERO, -DVec3::Z)),
            Color::new(0.1, 0.2, 0.3)
        );
        assert_eq!(
            tracer.trace_albedo(&Ray::new(DVec3::ZERO, DVec3::Z)),
            Color::splat(0.5)
        );
    }

    #[test]
    fn test_ray_trace_shadows() {
        let floor = Object::new(
            Plane::new(DVec3::ZERO, DVec3::Y),
            Arc::new(Material::diffuse(Color::ONE)),
        );
        let light = Object::new(
            Sphere::new(DVec3::new(0.0, 5.0, 0.0), 0.5),
            Arc::new(Material::light(Color::splat(36.0))),
        );
        let env = ConstantEnvironment(Color::ZERO);
        let ray = Ray::new(DVec3::new(1.0, 1.0, 0.0), -DVec3::Y);
        let cos = 5.0 / 26f64.sqrt();

        let lit = vec![floor, light];
        let bvh = build(&lit);
        let color = Tracer::new(&lit, &bvh, &env).ray_trace(&ray, &[1]);
        // Emission 36 over the preview scale of 360
        assert!((color.x - (0.1 * cos + 0.05)).abs() < 1e-9, "got {color:?}");

        // Occluder halfway between the hit point and the light
        let mut shadowed = lit;
        shadowed.push(Object::new(
            Sphere::new(DVec3::new(0.5, 2.5, 0.0), 0.3),
            Arc::new(Material::diffuse(Color::ONE)),
        ));
        let bvh = build(&shadowed);
        let color = Tracer::new(&shadowed, &bvh, &env).ray_trace(&ray, &[1]);
        assert!((color.x - 0.05).abs() < 1e-9, "got {color:?}");
    }
}
