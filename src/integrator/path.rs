use bumpalo::Bump;

use super::{uniform_sample_one_light, SurfaceIntegrator};
use crate::film::{Color, BLACK, WHITE};
use crate::geometry::DifferentialGeometry;
use crate::linalg::RayDifferential;
use crate::material::BxdfType;
use crate::renderer::Renderer;
use crate::sampler::Sampler;
use crate::scene::Scene;

// ─── Path integrator ────────────────────────────────────────────────────────

/// Unidirectional path tracing with next-event estimation: at each vertex
/// the integrator samples one light directly and extends the path by
/// sampling the BSDF, so emitted light is otherwise only added for directly
/// visible emitters and after specular bounces, where next-event estimation
/// cannot see it.
///
/// Paths shorter than `min_depth` always continue; past it, Russian roulette
/// terminates them with survival probability `min(0.5, throughput
/// luminance)`, and `max_depth` is a hard stop.
pub struct PathIntegrator {
    min_depth: u32,
    max_depth: u32,
}

impl PathIntegrator {
    pub fn new(min_depth: u32, max_depth: u32) -> Self {
        Self {
            min_depth,
            max_depth,
        }
    }
}

impl SurfaceIntegrator for PathIntegrator {
    fn illumination<'a>(
        &self,
        scene: &'a Scene,
        renderer: &Renderer,
        r: &RayDifferential,
        dg: &mut DifferentialGeometry<'a>,
        sampler: &mut dyn Sampler,
        arena: &'a Bump,
    ) -> Color {
        // One set of sample values per bounce, drawn up front from the arena
        let n = self.max_depth as usize + 1;
        let l_samples_u = arena.alloc_slice_fill_copy(n, [0.0f32; 2]);
        let l_samples_comp = arena.alloc_slice_fill_copy(n, 0.0f32);
        let bsdf_samples_u = arena.alloc_slice_fill_copy(n, [0.0f32; 2]);
        let bsdf_samples_comp = arena.alloc_slice_fill_copy(n, 0.0f32);
        let path_samples_u = arena.alloc_slice_fill_copy(n, [0.0f32; 2]);
        let path_samples_comp = arena.alloc_slice_fill_copy(n, 0.0f32);
        sampler.get_2d(l_samples_u);
        sampler.get_1d(l_samples_comp);
        sampler.get_2d(bsdf_samples_u);
        sampler.get_1d(bsdf_samples_comp);
        sampler.get_2d(path_samples_u);
        sampler.get_1d(path_samples_comp);

        let mut throughput = WHITE;
        let mut illum = BLACK;
        let mut ray = *r;
        let mut specular_bounce = false;
        let mut dg_current = *dg;

        for bounce in 0..=self.max_depth as usize {
            // Emission is counted here only where next-event estimation
            // could not have: the camera-visible vertex and post-specular
            // vertices
            if bounce == 0 || specular_bounce {
                if let Some(area) = dg_current.node.and_then(|n| n.area_light()) {
                    illum += throughput
                        * area.radiance(dg_current.point, dg_current.normal, -ray.d);
                }
            }
            let Some(material) = dg_current.node.and_then(|n| n.material()) else {
                return illum;
            };
            dg_current.compute_differentials(&ray);
            let bsdf = material.bsdf(&dg_current, arena);
            let p = bsdf.dg.point;
            let normal = bsdf.dg.normal;
            let w_o = -ray.d;

            illum += throughput
                * uniform_sample_one_light(
                    scene,
                    renderer,
                    p,
                    normal,
                    w_o,
                    bsdf,
                    (l_samples_u[bounce], l_samples_comp[bounce]),
                    (bsdf_samples_u[bounce], bsdf_samples_comp[bounce]),
                );

            // Extend the path by sampling the BSDF
            let (f, w_i, pdf, sampled_type) = bsdf.sample(
                w_o,
                path_samples_u[bounce],
                path_samples_comp[bounce],
                BxdfType::ALL,
            );
            if f.is_black() || pdf == 0.0 {
                break;
            }
            specular_bounce = sampled_type.contains(BxdfType::SPECULAR);
            throughput *= f * w_i.dot_normal(normal).abs() / pdf;
            ray = RayDifferential::child(p, w_i, &ray.ray, 0.001);

            if bounce as u32 > self.min_depth {
                let cont_prob = throughput.luminance().min(0.5);
                if sampler.random_float() > cont_prob {
                    break;
                }
                throughput /= cont_prob;
            }
            if bounce as u32 == self.max_depth {
                break;
            }

            let mut next = DifferentialGeometry::default();
            if !scene.root().intersect(&mut ray.ray, &mut next) {
                break;
            }
            dg_current = next;
        }
        illum
    }
}
