//! Built-in scene presets. Scene-description files are a separate concern;
//! these constructions exercise the same cache-and-node plumbing a loader
//! would drive.

use std::sync::Arc;

use crate::film::{Camera, Color, Filter, RenderTarget};
use crate::geometry::{BBox, Geometry, Plane, Sphere};
use crate::integrator::{
    BidirPathIntegrator, EmissionIntegrator, PathIntegrator, SingleScatteringIntegrator,
    SurfaceIntegrator, VolumeIntegrator, WhittedIntegrator,
};
use crate::light::{AreaLight, PointLight};
use crate::linalg::{Point, Transform, Vector};
use crate::material::{Glass, Material, Matte, Metal, SpecularMetal};
use crate::renderer::Renderer;
use crate::sampler::{
    AdaptiveSampler, LowDiscrepancySampler, Sampler, StratifiedSampler, UniformSampler,
};
use crate::scene::{Cache, Node, Scene, SceneError};
use crate::texture::{CheckerboardTexture, ConstantTexture, Texture};
use crate::volume::{HomogeneousVolume, VolumeNode};

// ─── Render configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum SamplerKind {
    /// One centered sample per pixel
    Uniform,
    /// Jittered n×n stratification
    Stratified,
    /// Scrambled (0,2)-sequence sampling
    Ld,
    /// Contrast-driven sampling between min and 8× min rates
    Adaptive,
}

#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum IntegratorKind {
    /// Classical recursive ray tracing
    Whitted,
    /// Unidirectional path tracing with next-event estimation
    Path,
    /// Bidirectional path tracing
    Bidir,
}

/// Settings shared by every preset, normally filled from the CLI.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: usize,
    pub height: usize,
    pub spp: usize,
    pub sampler: SamplerKind,
    pub integrator: IntegratorKind,
    pub max_depth: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            spp: 8,
            sampler: SamplerKind::Ld,
            integrator: IntegratorKind::Path,
            max_depth: 8,
        }
    }
}

/// Available built-in scenes.
#[derive(Debug, Clone, Copy, PartialEq, clap::ValueEnum)]
pub enum ScenePreset {
    /// Glass, mirror, and matte spheres over a checkerboard ground
    Showcase,
    /// A Cornell-style box with a spherical area light
    Cornell,
    /// A fog volume with single scattering around a matte sphere
    Fog,
}

impl ScenePreset {
    pub fn name(self) -> &'static str {
        match self {
            ScenePreset::Showcase => "Showcase",
            ScenePreset::Cornell => "Cornell Box",
            ScenePreset::Fog => "Fog",
        }
    }

    pub fn build(self, opts: &RenderOptions) -> Result<Scene, SceneError> {
        match self {
            ScenePreset::Showcase => build_showcase(opts),
            ScenePreset::Cornell => build_cornell(opts),
            ScenePreset::Fog => build_fog(opts),
        }
    }
}

fn make_sampler(opts: &RenderOptions) -> Box<dyn Sampler> {
    let (w, h) = (opts.width, opts.height);
    match opts.sampler {
        SamplerKind::Uniform => Box::new(UniformSampler::new(0, w, 0, h)),
        SamplerKind::Stratified => Box::new(StratifiedSampler::new(
            0,
            w,
            0,
            h,
            (opts.spp as f32).sqrt().ceil() as usize,
        )),
        SamplerKind::Ld => Box::new(LowDiscrepancySampler::new(0, w, 0, h, opts.spp)),
        SamplerKind::Adaptive => Box::new(AdaptiveSampler::new(0, w, 0, h, opts.spp, opts.spp * 8)),
    }
}

fn make_surface_integrator(opts: &RenderOptions) -> Box<dyn SurfaceIntegrator> {
    let min_depth = 3.min(opts.max_depth);
    match opts.integrator {
        IntegratorKind::Whitted => Box::new(WhittedIntegrator::new(opts.max_depth)),
        IntegratorKind::Path => Box::new(PathIntegrator::new(min_depth, opts.max_depth)),
        IntegratorKind::Bidir => Box::new(BidirPathIntegrator::new(min_depth, opts.max_depth)),
    }
}

fn make_renderer(opts: &RenderOptions, volume: Option<Box<dyn VolumeIntegrator>>) -> Renderer {
    Renderer::new(make_surface_integrator(opts), volume)
}

// ─── Presets ────────────────────────────────────────────────────────────────

fn build_showcase(opts: &RenderOptions) -> Result<Scene, SceneError> {
    let mut geometry: Cache<dyn Geometry> = Cache::new();
    geometry.add("unit_sphere", Arc::new(Sphere::new(1.0)));
    geometry.add("unit_plane", Arc::new(Plane::new()));

    let mut textures: Cache<dyn Texture> = Cache::new();
    textures.add(
        "checker",
        Arc::new(CheckerboardTexture::new(
            Color::new(0.05, 0.05, 0.05),
            Color::new(0.9, 0.9, 0.9),
            20.0,
        )),
    );
    textures.add(
        "red",
        Arc::new(ConstantTexture::new(Color::new(0.7, 0.15, 0.15))),
    );

    let mut materials: Cache<dyn Material> = Cache::new();
    materials.add(
        "ground",
        Arc::new(Matte::new(textures.require("texture", "checker")?, 0.0)),
    );
    materials.add(
        "red_matte",
        Arc::new(Matte::new(textures.require("texture", "red")?, 15.0)),
    );
    materials.add(
        "glass",
        Arc::new(Glass::new(Color::broadcast(1.0), Color::broadcast(1.0), 1.5)),
    );
    materials.add("mirror", Arc::new(SpecularMetal::mirror()));
    materials.add(
        "copper",
        Arc::new(Metal::new(
            Color::new(0.2, 0.92, 1.1),
            Color::new(3.9, 2.45, 2.14),
            0.02,
        )),
    );

    let mut root = Node::new(None, None, Transform::IDENTITY, "root");
    root.add_child(Node::new(
        Some(geometry.require("geometry", "unit_plane")?),
        Some(materials.require("material", "ground")?),
        Transform::rotate_x(-90.0) * Transform::scale(20.0, 20.0, 1.0),
        "ground",
    ));
    root.add_child(Node::new(
        Some(geometry.require("geometry", "unit_sphere")?),
        Some(materials.require("material", "glass")?),
        Transform::translate(Vector::new(0.0, 1.0, 0.0)),
        "glass_ball",
    ));
    root.add_child(Node::new(
        Some(geometry.require("geometry", "unit_sphere")?),
        Some(materials.require("material", "mirror")?),
        Transform::translate(Vector::new(-2.2, 1.0, 0.3)),
        "mirror_ball",
    ));
    root.add_child(Node::new(
        Some(geometry.require("geometry", "unit_sphere")?),
        Some(materials.require("material", "red_matte")?),
        Transform::translate(Vector::new(2.2, 1.0, 0.3)),
        "matte_ball",
    ));
    root.add_child(Node::new(
        Some(geometry.require("geometry", "unit_sphere")?),
        Some(materials.require("material", "copper")?),
        Transform::translate(Vector::new(0.9, 0.35, 1.8)) * Transform::scale(0.35, 0.35, 0.35),
        "copper_ball",
    ));

    let camera = Camera::new(
        Transform::look_at(
            Point::new(0.0, 2.4, 6.5),
            Point::new(0.0, 0.9, 0.0),
            Vector::new(0.0, 1.0, 0.0),
        ),
        35.0,
        0.0,
        6.5,
        opts.width,
        opts.height,
    );
    let target = RenderTarget::new(
        opts.width,
        opts.height,
        Filter::Mitchell {
            w: 2.0,
            h: 2.0,
            b: 1.0 / 3.0,
            c: 1.0 / 3.0,
        },
    );
    let mut scene = Scene::new(
        camera,
        target,
        make_sampler(opts),
        make_renderer(opts, None),
        root,
    );
    let key_light = Arc::new(PointLight::at(
        Point::new(6.0, 9.0, 6.0),
        Color::broadcast(900.0),
    ));
    let fill_light = Arc::new(PointLight::at(
        Point::new(-7.0, 6.0, 3.0),
        Color::new(220.0, 240.0, 320.0),
    ));
    scene.add_light(key_light.clone());
    scene.add_light(fill_light.clone());
    // Dim sky so escaping rays and mirror edges pick up a little blue
    scene.set_environment(Arc::new(ConstantTexture::new(Color::new(0.04, 0.06, 0.11))));
    let caches = scene.caches_mut();
    caches.geometry = geometry;
    caches.textures = textures;
    caches.materials = materials;
    caches.lights.add("key", key_light);
    caches.lights.add("fill", fill_light);
    Ok(scene)
}

fn build_cornell(opts: &RenderOptions) -> Result<Scene, SceneError> {
    let mut geometry: Cache<dyn Geometry> = Cache::new();
    geometry.add("unit_plane", Arc::new(Plane::new()));
    geometry.add("unit_sphere", Arc::new(Sphere::new(1.0)));
    geometry.add("lamp_sphere", Arc::new(Sphere::new(0.35)));
    let plane = geometry.require("geometry", "unit_plane")?;
    let sphere = geometry.require("geometry", "unit_sphere")?;

    let mut materials: Cache<dyn Material> = Cache::new();
    let white = Arc::new(ConstantTexture::new(Color::broadcast(0.73)));
    let red = Arc::new(ConstantTexture::new(Color::new(0.65, 0.05, 0.05)));
    let green = Arc::new(ConstantTexture::new(Color::new(0.12, 0.45, 0.15)));
    materials.add("white", Arc::new(Matte::new(white, 0.0)));
    materials.add("red", Arc::new(Matte::new(red, 0.0)));
    materials.add("green", Arc::new(Matte::new(green, 0.0)));
    materials.add(
        "glass",
        Arc::new(Glass::new(Color::broadcast(1.0), Color::broadcast(1.0), 1.5)),
    );
    materials.add("mirror", Arc::new(SpecularMetal::mirror()));

    let wall = |name: &str, mat: &str, t: Transform| -> Result<Node, SceneError> {
        Ok(Node::new(
            Some(Arc::clone(&plane)),
            Some(materials.require("material", mat)?),
            t * Transform::scale(2.0, 2.0, 1.0),
            name,
        ))
    };

    let mut root = Node::new(None, None, Transform::IDENTITY, "root");
    root.add_child(wall("floor", "white", Transform::rotate_x(-90.0))?);
    root.add_child(wall(
        "ceiling",
        "white",
        Transform::translate(Vector::new(0.0, 4.0, 0.0)) * Transform::rotate_x(90.0),
    )?);
    root.add_child(wall(
        "back",
        "white",
        Transform::translate(Vector::new(0.0, 2.0, -2.0)),
    )?);
    root.add_child(wall(
        "left",
        "red",
        Transform::translate(Vector::new(-2.0, 2.0, 0.0)) * Transform::rotate_y(90.0),
    )?);
    root.add_child(wall(
        "right",
        "green",
        Transform::translate(Vector::new(2.0, 2.0, 0.0)) * Transform::rotate_y(-90.0),
    )?);
    root.add_child(Node::new(
        Some(Arc::clone(&sphere)),
        Some(materials.require("material", "mirror")?),
        Transform::translate(Vector::new(-0.9, 0.8, -0.7)) * Transform::scale(0.8, 0.8, 0.8),
        "mirror_ball",
    ));
    root.add_child(Node::new(
        Some(Arc::clone(&sphere)),
        Some(materials.require("material", "glass")?),
        Transform::translate(Vector::new(0.9, 0.6, 0.3)) * Transform::scale(0.6, 0.6, 0.6),
        "glass_ball",
    ));

    // The emitter: the same area-light handle goes on the node and into the
    // scene's light list so hits along BSDF samples identify it
    let light_transform = Transform::translate(Vector::new(0.0, 3.4, 0.0));
    let area_light = Arc::new(AreaLight::new(light_transform, Color::broadcast(14.0), 0.35));
    let mut light_node = Node::new(
        Some(geometry.require("geometry", "lamp_sphere")?),
        None,
        light_transform,
        "lamp",
    );
    light_node.set_area_light(Arc::clone(&area_light));
    root.add_child(light_node);

    let camera = Camera::new(
        Transform::look_at(
            Point::new(0.0, 2.0, 6.0),
            Point::new(0.0, 1.9, 0.0),
            Vector::new(0.0, 1.0, 0.0),
        ),
        40.0,
        0.0,
        6.0,
        opts.width,
        opts.height,
    );
    let target = RenderTarget::new(opts.width, opts.height, Filter::Box { w: 0.5, h: 0.5 });
    let mut scene = Scene::new(
        camera,
        target,
        make_sampler(opts),
        make_renderer(opts, None),
        root,
    );
    scene.add_light(area_light.clone());
    let caches = scene.caches_mut();
    caches.geometry = geometry;
    caches.materials = materials;
    caches.lights.add("lamp", area_light);
    Ok(scene)
}

fn build_fog(opts: &RenderOptions) -> Result<Scene, SceneError> {
    let mut geometry: Cache<dyn Geometry> = Cache::new();
    geometry.add("unit_sphere", Arc::new(Sphere::new(1.0)));
    geometry.add("unit_plane", Arc::new(Plane::new()));

    let mut materials: Cache<dyn Material> = Cache::new();
    materials.add(
        "gray",
        Arc::new(Matte::new(
            Arc::new(ConstantTexture::new(Color::broadcast(0.6))),
            0.0,
        )),
    );

    let mut root = Node::new(None, None, Transform::IDENTITY, "root");
    root.add_child(Node::new(
        Some(geometry.require("geometry", "unit_plane")?),
        Some(materials.require("material", "gray")?),
        Transform::rotate_x(-90.0) * Transform::scale(12.0, 12.0, 1.0),
        "ground",
    ));
    root.add_child(Node::new(
        Some(geometry.require("geometry", "unit_sphere")?),
        Some(materials.require("material", "gray")?),
        Transform::translate(Vector::new(0.0, 1.0, 0.0)),
        "ball",
    ));

    let camera = Camera::new(
        Transform::look_at(
            Point::new(0.0, 1.6, 6.0),
            Point::new(0.0, 1.0, 0.0),
            Vector::new(0.0, 1.0, 0.0),
        ),
        40.0,
        0.0,
        6.0,
        opts.width,
        opts.height,
    );
    let target = RenderTarget::new(opts.width, opts.height, Filter::Box { w: 0.5, h: 0.5 });

    let fog = Arc::new(HomogeneousVolume::new(
        Color::broadcast(0.02),
        Color::broadcast(0.12),
        Color::broadcast(0.0),
        0.2,
        BBox::new(Point::new(-4.0, 0.0, -4.0), Point::new(4.0, 3.0, 4.0)),
    ));
    let volume_integrator: Box<dyn VolumeIntegrator> =
        if opts.integrator == IntegratorKind::Whitted {
            // Keep the classic integrator cheap with emission-only marching
            Box::new(EmissionIntegrator::new(0.1))
        } else {
            Box::new(SingleScatteringIntegrator::new(0.1))
        };
    let mut scene = Scene::new(
        camera,
        target,
        make_sampler(opts),
        make_renderer(opts, Some(volume_integrator)),
        root,
    );
    scene.set_volume_root(VolumeNode::new(
        Some(fog.clone()),
        Transform::IDENTITY,
        "fog",
    ));
    let sun = Arc::new(PointLight::at(
        Point::new(3.0, 5.0, 3.0),
        Color::broadcast(350.0),
    ));
    scene.add_light(sun.clone());
    let caches = scene.caches_mut();
    caches.geometry = geometry;
    caches.materials = materials;
    caches.lights.add("sun", sun);
    caches.volumes.add("fog", fog);
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::Light;

    #[test]
    fn every_preset_builds() {
        let opts = RenderOptions {
            width: 16,
            height: 16,
            spp: 1,
            ..Default::default()
        };
        for preset in [ScenePreset::Showcase, ScenePreset::Cornell, ScenePreset::Fog] {
            let scene = preset.build(&opts).unwrap();
            assert!(!scene.lights().is_empty(), "{preset:?} has no lights");
            assert!(!scene.caches().geometry.is_empty(), "{preset:?} cached no geometry");
            assert!(!scene.caches().lights.is_empty(), "{preset:?} cached no lights");
        }
    }

    #[test]
    fn cornell_light_is_shared_between_node_and_list() {
        let opts = RenderOptions {
            width: 8,
            height: 8,
            spp: 1,
            ..Default::default()
        };
        let scene = ScenePreset::Cornell.build(&opts).unwrap();
        let lamp = scene
            .root()
            .children()
            .iter()
            .find(|n| n.name() == "lamp")
            .unwrap();
        let node_light = lamp.area_light().unwrap();
        let listed = scene.lights()[0].as_area_light().unwrap();
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(node_light),
            listed as *const AreaLight
        ));
    }
}
