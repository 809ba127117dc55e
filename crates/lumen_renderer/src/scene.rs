//! Scene container: camera, objects, their BVH and the background.

use thiserror::Error;

use crate::{
    Bvh, BvhConfig, ConstantEnvironment, Environment, Hittable, Object, PinholeCamera,
    TextureError, TraceConfig, Tracer,
};

/// Errors that can occur while assembling, rendering or saving a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Unknown scene number: {0}")]
    UnknownScene(u32),

    #[error("Mesh has no triangles")]
    EmptyMesh,

    #[error("Vertex index {index} out of range for {vertex_count} vertices")]
    InvalidIndex { index: usize, vertex_count: usize },

    #[error("Scene must be constructed before rendering")]
    NotConstructed,
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Everything a render needs.
///
/// Objects are added first, then [`Scene::construct`] builds the BVH once.
/// Adding an object afterwards invalidates the tree until the next construct.
pub struct Scene {
    camera: PinholeCamera,
    objects: Vec<Object>,
    bvh: Bvh,
    environment: Box<dyn Environment>,
    trace_config: TraceConfig,
    constructed: bool,
}

impl Scene {
    /// Empty scene against a black background.
    pub fn new(camera: PinholeCamera) -> Self {
        Self {
            camera,
            objects: Vec::new(),
            bvh: Bvh::new(),
            environment: Box::new(ConstantEnvironment(crate::Color::ZERO)),
            trace_config: TraceConfig::default(),
            constructed: false,
        }
    }

    pub fn with_environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Box::new(environment);
        self
    }

    pub fn with_bvh_config(mut self, config: BvhConfig) -> Self {
        self.bvh = Bvh::with_config(config);
        self.constructed = false;
        self
    }

    pub fn with_trace_config(mut self, config: TraceConfig) -> Self {
        self.trace_config = config;
        self
    }

    pub fn set_trace_config(&mut self, config: TraceConfig) {
        self.trace_config = config;
    }

    /// Add an object and return its id.
    pub fn add_object(&mut self, object: Object) -> usize {
        self.objects.push(object);
        self.constructed = false;
        self.objects.len() - 1
    }

    pub fn camera(&self) -> &PinholeCamera {
        &self.camera
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn environment(&self) -> &dyn Environment {
        self.environment.as_ref()
    }

    pub fn trace_config(&self) -> &TraceConfig {
        &self.trace_config
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Ids of objects that emit light.
    pub fn lights(&self) -> Vec<usize> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, object)| object.material().is_emissive())
            .map(|(id, _)| id)
            .collect()
    }

    /// Build the scene BVH from the current object list.
    pub fn construct(&mut self) {
        let items: Vec<_> = self
            .objects
            .iter()
            .enumerate()
            .map(|(id, object)| (id, object.bounding_box()))
            .collect();

        self.bvh.construct(&items);
        self.constructed = true;

        log::info!(
            "Scene constructed: {} objects, {} lights",
            self.objects.len(),
            self.lights().len()
        );
    }

    /// Tracer over this scene. Fails if the BVH is missing or stale.
    pub fn tracer(&self) -> SceneResult<Tracer<'_>> {
        if !self.constructed {
            return Err(SceneError::NotConstructed);
        }
        Ok(
            Tracer::new(&self.objects, &self.bvh, self.environment.as_ref())
                .with_config(self.trace_config),
        )
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("camera", &self.camera)
            .field("objects", &self.objects.len())
            .field("bvh_nodes", &self.bvh.node_count())
            .field("constructed", &self.constructed)
            .finish()
    }
}
