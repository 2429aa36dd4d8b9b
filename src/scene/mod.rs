//! The scene: process-wide caches of shared assets, the transform hierarchy
//! of nodes, and everything the renderer needs to trace it.

mod node;

pub use node::Node;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::film::{Camera, RenderTarget};
use crate::geometry::{Geometry, TriMesh};
use crate::light::Light;
use crate::material::Material;
use crate::renderer::Renderer;
use crate::sampler::Sampler;
use crate::texture::Texture;
use crate::volume::{Volume, VolumeNode};

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Scene-construction failures. These are fatal before rendering starts;
/// anything recoverable per-ray is expressed as zero color or zero pdf
/// inside the integrators instead.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no {kind} named `{name}` in the scene caches")]
    MissingCacheEntry { kind: &'static str, name: String },
    #[error("failed to load mesh {path}: {source}")]
    MeshLoad {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to load volume grid {path}: {reason}")]
    VolumeLoad { path: PathBuf, reason: String },
}

// ─── Asset cache ────────────────────────────────────────────────────────────

/// A name → shared-object map. Scene-wide assets (geometry, materials,
/// textures, lights, volumes) are interned here once at load time and shared
/// immutably by the nodes that reference them.
pub struct Cache<T: ?Sized> {
    entries: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Cache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn add(&mut self, name: impl Into<String>, value: Arc<T>) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<T>> {
        self.entries.get(name)
    }

    /// Cache lookup that promotes a miss to a construction error.
    pub fn require(&self, kind: &'static str, name: &str) -> Result<Arc<T>, SceneError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| SceneError::MissingCacheEntry {
                kind,
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<T>)> {
        self.entries.iter()
    }
}

impl<T: ?Sized> Default for Cache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads a binary-cached mesh into a shareable geometry handle, promoting
/// I/O failures to scene-construction errors.
pub fn load_mesh(path: &Path) -> Result<Arc<TriMesh>, SceneError> {
    crate::geometry::load_bobj(path)
        .map(Arc::new)
        .map_err(|source| SceneError::MeshLoad {
            path: path.to_path_buf(),
            source,
        })
}

// ─── Scene ──────────────────────────────────────────────────────────────────

/// The process-wide asset caches: every shared object a node references
/// lives here under a unique name, and nodes hold non-owning-style `Arc`
/// handles into them.
#[derive(Default)]
pub struct SceneCaches {
    pub geometry: Cache<dyn Geometry>,
    pub materials: Cache<dyn Material>,
    pub textures: Cache<dyn Texture>,
    pub lights: Cache<dyn Light>,
    pub volumes: Cache<dyn Volume>,
}

/// Everything the driver renders: camera, film, the sampling strategy, the
/// renderer (surface + volume integrators), the node hierarchy, the light
/// list, the asset caches, and optional participating media and environment.
///
/// Built once before rendering, then shared immutably across the worker
/// threads.
pub struct Scene {
    pub camera: Camera,
    pub render_target: RenderTarget,
    sampler: Box<dyn Sampler>,
    pub renderer: Renderer,
    root: Node,
    caches: SceneCaches,
    lights: Vec<Arc<dyn Light>>,
    volume_root: Option<VolumeNode>,
    environment: Option<Arc<dyn Texture>>,
}

impl Scene {
    pub fn new(
        camera: Camera,
        render_target: RenderTarget,
        sampler: Box<dyn Sampler>,
        renderer: Renderer,
        root: Node,
    ) -> Self {
        Self {
            camera,
            render_target,
            sampler,
            renderer,
            root,
            caches: SceneCaches::default(),
            lights: Vec::new(),
            volume_root: None,
            environment: None,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn caches(&self) -> &SceneCaches {
        &self.caches
    }

    pub fn caches_mut(&mut self) -> &mut SceneCaches {
        &mut self.caches
    }

    pub fn sampler(&self) -> &dyn Sampler {
        self.sampler.as_ref()
    }

    pub fn add_light(&mut self, light: Arc<dyn Light>) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Arc<dyn Light>] {
        &self.lights
    }

    pub fn set_volume_root(&mut self, volume: VolumeNode) {
        self.volume_root = Some(volume);
    }

    pub fn volume_root(&self) -> Option<&VolumeNode> {
        self.volume_root.as_ref()
    }

    pub fn set_environment(&mut self, environment: Arc<dyn Texture>) {
        self.environment = Some(environment);
    }

    pub fn environment(&self) -> Option<&Arc<dyn Texture>> {
        self.environment.as_ref()
    }
}
