use bumpalo::Bump;

use super::{spec_reflect, spec_transmit, SurfaceIntegrator};
use crate::film::{Color, BLACK};
use crate::geometry::DifferentialGeometry;
use crate::linalg::RayDifferential;
use crate::material::BxdfType;
use crate::renderer::Renderer;
use crate::sampler::Sampler;
use crate::scene::Scene;

// ─── Whitted integrator ─────────────────────────────────────────────────────

/// Classical recursive ray tracing: direct lighting from every light with a
/// single shadow ray each, plus recursion through perfect specular
/// reflection and transmission up to `max_depth`. No diffuse interreflection.
pub struct WhittedIntegrator {
    max_depth: u32,
}

impl WhittedIntegrator {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }
}

impl SurfaceIntegrator for WhittedIntegrator {
    fn illumination<'a>(
        &self,
        scene: &'a Scene,
        renderer: &Renderer,
        ray: &RayDifferential,
        dg: &mut DifferentialGeometry<'a>,
        sampler: &mut dyn Sampler,
        arena: &'a Bump,
    ) -> Color {
        let node = match dg.node {
            Some(n) => n,
            None => return BLACK,
        };
        // Directly visible emitters still show up without a material
        let mut illum = BLACK;
        if let Some(area) = node.area_light() {
            illum += area.radiance(dg.point, dg.normal, -ray.d);
        }
        let Some(material) = node.material() else {
            return illum;
        };
        let bsdf = material.bsdf(dg, arena);
        let w_o = -ray.d;

        for light in scene.lights() {
            let mut u = [[0.0f32; 2]; 1];
            sampler.get_2d(&mut u);
            let ls = light.sample_at(bsdf.dg.point, u[0]);
            if ls.radiance.luminance() == 0.0 || ls.pdf == 0.0 {
                continue;
            }
            let f = bsdf.f(w_o, ls.w_i, BxdfType::ALL);
            if f.luminance() != 0.0 && !ls.occlusion.occluded(scene) {
                illum +=
                    f * ls.radiance * ls.w_i.dot_normal(bsdf.dg.normal).abs() / ls.pdf;
            }
        }
        if ray.depth < self.max_depth {
            illum += spec_reflect(ray, bsdf, renderer, scene, sampler, arena);
            illum += spec_transmit(ray, bsdf, renderer, scene, sampler, arena);
        }
        illum
    }
}
