//! Built-in demo scenes.
//!
//! Every builder takes the [`MaterialRegistry`] to draw named materials from
//! and returns a scene whose BVH is already constructed.

use std::f64::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{
    Color, ConstantEnvironment, Cuboid, ImageTexture, Material, MaterialRegistry, Object,
    PinholeCamera, Plane, Scene, SceneError, SceneResult, Shading, SkyGradient, SphericalMap,
    Sphere, TextureEnvironment, TriangleMesh,
};
use lumen_math::DVec3;

/// Optional files a scene can pull in.
#[derive(Debug, Clone, Default)]
pub struct SceneAssets {
    /// OBJ model for the mesh scenes; a procedural torus stands in when absent
    pub mesh: Option<PathBuf>,
    /// Lat-long environment image (`.hdr` or LDR) for [`mirror_and_glass`]
    pub environment: Option<PathBuf>,
}

/// Number of built-in scenes accepted by [`build`].
pub const SCENE_COUNT: u32 = 4;

/// Build scene `number` (1-based).
pub fn build(number: u32, registry: &MaterialRegistry, assets: &SceneAssets) -> SceneResult<Scene> {
    match number {
        1 => cornell_box(registry),
        2 => sphere_on_plane(registry),
        3 => mesh_showcase(registry, assets.mesh.as_deref()),
        4 => mirror_and_glass(registry, assets),
        other => Err(SceneError::UnknownScene(other)),
    }
}

/// Classic Cornell box made of huge spheres, with a mirror ball, a glass
/// ball and a spherical light under the ceiling.
pub fn cornell_box(registry: &MaterialRegistry) -> SceneResult<Scene> {
    let camera = PinholeCamera::new(
        DVec3::new(50.0, 50.0, 220.0),
        DVec3::new(50.0, 30.0, -1.0),
        1.0,
    );
    let mut scene = Scene::new(camera);

    let spheres = [
        (1e5, DVec3::new(1e5 + 1.0, 40.8, 81.6), "red"),
        (1e5, DVec3::new(-1e5 + 99.0, 40.8, 81.6), "blue"),
        (1e5, DVec3::new(50.0, 40.8, 1e5), "gray"),
        (1e5, DVec3::new(50.0, 40.8, -1e5 + 250.0), "black"),
        (1e5, DVec3::new(50.0, 1e5, 81.6), "gray"),
        (1e5, DVec3::new(50.0, -1e5 + 81.6, 81.6), "gray"),
        (20.0, DVec3::new(65.0, 20.0, 20.0), "cyan"),
        (16.5, DVec3::new(27.0, 16.5, 47.0), "specular"),
        (16.5, DVec3::new(77.0, 16.5, 78.0), "refraction"),
        (15.0, DVec3::new(50.0, 80.0, 81.6), "light"),
    ];

    for (radius, center, material) in spheres {
        scene.add_object(Object::new(
            Sphere::new(center, radius),
            registry.get(material)?,
        ));
    }

    scene.construct();
    Ok(scene)
}

/// A red ball resting on a green box on an infinite checkered floor.
pub fn sphere_on_plane(registry: &MaterialRegistry) -> SceneResult<Scene> {
    let camera = PinholeCamera::new(DVec3::new(10.0, 5.0, 9.0), DVec3::new(0.0, 2.0, 0.0), 1.0);
    let mut scene = Scene::new(camera).with_environment(ConstantEnvironment(Color::ZERO));

    scene.add_object(Object::new(
        Plane::new(DVec3::ZERO, DVec3::Y),
        registry.get("checker")?,
    ));
    scene.add_object(Object::new(
        Cuboid::new(DVec3::new(-1.0, 2.0, -1.0), DVec3::new(1.0, 0.0, 1.0)),
        registry.get("green")?,
    ));
    scene.add_object(Object::new(
        Sphere::new(DVec3::new(0.0, 3.0, 0.0), 1.0),
        registry.get("red")?,
    ));
    scene.add_object(Object::new(
        Sphere::new(DVec3::new(5.0, 5.0, 0.0), 1.0),
        registry.get("weak_light_1")?,
    ));

    scene.construct();
    Ok(scene)
}

/// A smooth-shaded mesh on a floor under two lights and a cloud of tiny
/// colored emitters.
pub fn mesh_showcase(registry: &MaterialRegistry, mesh: Option<&Path>) -> SceneResult<Scene> {
    let camera = PinholeCamera::new(DVec3::new(0.0, 2.0, 5.0), DVec3::new(0.0, 1.0, 0.0), 1.0);
    let mut scene = Scene::new(camera).with_environment(ConstantEnvironment(Color::ZERO));

    scene.add_object(Object::new(
        Plane::new(DVec3::ZERO, DVec3::Y),
        registry.get("green")?,
    ));
    scene.add_object(Object::new(load_mesh(mesh, 2.0)?, registry.get("gray")?));

    scene.add_object(Object::new(
        Sphere::new(DVec3::new(-5.2, 5.0, 2.0), 1.0),
        registry.get("weak_light_1")?,
    ));
    scene.add_object(Object::new(
        Sphere::new(DVec3::new(5.0, 5.0, 5.0), 1.0),
        registry.get("weak_light_2")?,
    ));

    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..100 {
        let emission = Color::new(
            6.0 * rng.gen::<f64>(),
            6.0 * rng.gen::<f64>(),
            6.0 * rng.gen::<f64>(),
        );
        let center = DVec3::new(
            10.0 * rng.gen::<f64>() - 5.0,
            10.0 * rng.gen::<f64>(),
            10.0 * rng.gen::<f64>() - 5.0,
        );
        scene.add_object(Object::new(
            Sphere::new(center, 0.1),
            Arc::new(Material::light(emission)),
        ));
    }

    scene.construct();
    Ok(scene)
}

/// A mirror mesh and a glass ball on a checkered slab, lit by an
/// environment image when one is given and by a sky gradient otherwise.
pub fn mirror_and_glass(registry: &MaterialRegistry, assets: &SceneAssets) -> SceneResult<Scene> {
    let camera = PinholeCamera::new(DVec3::new(-1.8, 1.2, 1.8), DVec3::new(0.0, 0.8, 0.0), 1.0);
    let scene = Scene::new(camera);
    let mut scene = match &assets.environment {
        Some(path) => {
            let image = ImageTexture::open(path)?.with_mapping(SphericalMap::new(45));
            scene.with_environment(TextureEnvironment::new(Arc::new(image)))
        }
        None => scene.with_environment(SkyGradient::default()),
    };

    scene.add_object(Object::new(
        Cuboid::new(DVec3::new(-3.0, -0.1, -3.0), DVec3::new(3.0, 0.0, 3.0)),
        registry.get("checker")?,
    ));

    let mut mesh = load_mesh(assets.mesh.as_deref(), 1.4)?;
    mesh.translate(DVec3::new(0.0, 0.0, -0.4));
    scene.add_object(Object::new(mesh, registry.get("specular")?));

    scene.add_object(Object::new(
        Sphere::new(DVec3::new(0.6, 0.4, 0.7), 0.4),
        registry.get("refraction")?,
    ));

    scene.construct();
    Ok(scene)
}

/// First model of an OBJ file, or a torus, fitted to `width` on the floor.
fn load_mesh(path: Option<&Path>, width: f64) -> SceneResult<TriangleMesh> {
    let mut mesh = match path {
        Some(path) => TriangleMesh::from_obj(path, Shading::Smooth)?
            .into_iter()
            .next()
            .ok_or(SceneError::EmptyMesh)?,
        None => torus(1.0, 0.4, 48, 24)?,
    };
    mesh.fit_to_width(width);
    Ok(mesh)
}

/// Smooth-shaded torus around the y axis.
pub fn torus(
    major_radius: f64,
    minor_radius: f64,
    rings: usize,
    sides: usize,
) -> SceneResult<TriangleMesh> {
    let rings = rings.max(3);
    let sides = sides.max(3);

    let mut vertices = Vec::with_capacity(rings * sides);
    for ring in 0..rings {
        let theta = TAU * ring as f64 / rings as f64;
        let (sin_t, cos_t) = theta.sin_cos();
        for side in 0..sides {
            let phi = TAU * side as f64 / sides as f64;
            let (sin_p, cos_p) = phi.sin_cos();
            let r = major_radius + minor_radius * cos_p;
            vertices.push(DVec3::new(r * cos_t, minor_radius * sin_p, r * sin_t));
        }
    }

    let index = |ring: usize, side: usize| (ring % rings) * sides + side % sides;
    let mut triangles = Vec::with_capacity(2 * rings * sides);
    for ring in 0..rings {
        for side in 0..sides {
            let a = index(ring, side);
            let b = index(ring + 1, side);
            let c = index(ring + 1, side + 1);
            let d = index(ring, side + 1);
            triangles.push([a, c, b]);
            triangles.push([a, d, c]);
        }
    }

    TriangleMesh::new(vertices, triangles, Shading::Smooth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hittable, Ray};

    #[test]
    fn test_cornell_box() {
        let registry = MaterialRegistry::with_defaults();
        let scene = cornell_box(&registry).expect("cornell box");

        assert_eq!(scene.objects().len(), 10);
        assert_eq!(scene.lights(), vec![9]);
        assert!(scene.is_constructed());

        // The camera looks into the box and hits something
        let tracer = scene.tracer().expect("constructed");
        let ray = scene.camera().ray(lumen_math::DVec2::ZERO);
        assert!(tracer.intersect(&ray).is_some());
    }

    #[test]
    fn test_build_by_number() {
        let registry = MaterialRegistry::with_defaults();
        let assets = SceneAssets::default();

        for number in 1..=SCENE_COUNT {
            let scene = build(number, &registry, &assets).expect("built-in scene");
            assert!(!scene.lights().is_empty() || number == 4);
        }
        assert!(matches!(
            build(0, &registry, &assets),
            Err(SceneError::UnknownScene(0))
        ));
    }

    #[test]
    fn test_missing_material_is_reported() {
        let registry = MaterialRegistry::new();
        assert!(matches!(
            cornell_box(&registry),
            Err(SceneError::UnknownMaterial(_))
        ));
    }

    #[test]
    fn test_mesh_showcase_lights() {
        let registry = MaterialRegistry::with_defaults();
        let scene = mesh_showcase(&registry, None).expect("showcase");
        // floor + mesh + two lights + 100 small emitters
        assert_eq!(scene.objects().len(), 104);
        assert_eq!(scene.lights().len(), 102);
    }

    #[test]
    fn test_torus() {
        let mesh = torus(1.0, 0.25, 16, 8).expect("torus");
        assert_eq!(mesh.vertex_count(), 16 * 8);
        assert_eq!(mesh.triangle_count(), 2 * 16 * 8);

        // Straight down through the tube
        let ray = Ray::new(DVec3::new(1.0, 5.0, 0.1), -DVec3::Y);
        let hp = mesh.hit(&ray).expect("hits the tube");
        assert!((hp.position.y - 0.25).abs() < 0.02);
        assert!(hp.normal.y > 0.9);

        // Straight down through the hole
        let ray = Ray::new(DVec3::new(0.0, 5.0, 0.0), -DVec3::Y);
        assert!(mesh.hit(&ray).is_none());
    }

    #[test]
    fn test_missing_environment_file() {
        let registry = MaterialRegistry::with_defaults();
        let assets = SceneAssets {
            mesh: None,
            environment: Some(PathBuf::from("/nonexistent/sky.hdr")),
        };
        assert!(matches!(
            mirror_and_glass(&registry, &assets),
            Err(SceneError::Texture(_))
        ));
    }
}
