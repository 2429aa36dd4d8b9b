use bumpalo::Bump;

use super::VolumeIntegrator;
use crate::film::{Color, BLACK, WHITE};
use crate::linalg::{Ray, RayDifferential};
use crate::renderer::Renderer;
use crate::sampler::Sampler;
use crate::scene::Scene;

// ─── Emission-only volume integrator ────────────────────────────────────────

/// Ray-marches `L = ∫ T(0→t) · L_e(t) dt` through the scene's volumes,
/// ignoring in-scattering. The march uses fixed steps with a jittered first
/// sample, and Russian roulette cuts rays whose transmittance has collapsed.
pub struct EmissionIntegrator {
    step_size: f32,
}

impl EmissionIntegrator {
    pub fn new(step_size: f32) -> Self {
        Self { step_size }
    }

    /// The marching loop shared with the single-scattering integrator: walks
    /// the segment, updating transmittance per step and handing each sample
    /// point to `accumulate` along with the current transmittance.
    pub(super) fn march(
        &self,
        scene: &Scene,
        ray: &RayDifferential,
        sampler: &mut dyn Sampler,
        mut accumulate: impl FnMut(crate::linalg::Point, Color, &mut dyn Sampler) -> Color,
    ) -> (Color, Color) {
        let Some(vol) = scene.volume_root() else {
            return (BLACK, WHITE);
        };
        let Some((t_start, t_end)) = vol.intersect(ray) else {
            return (BLACK, WHITE);
        };
        if t_start == t_end {
            return (BLACK, WHITE);
        }
        let n_samples = ((t_end - t_start) / self.step_size).ceil().max(1.0) as usize;
        let step = (t_end - t_start) / n_samples as f32;
        let mut transmit = WHITE;
        let mut radiance = BLACK;
        let mut p_prev = ray.at(t_start);
        let mut t = t_start + sampler.random_float() * step;
        for _ in 0..n_samples {
            let p = ray.at(t);
            let step_ray = Ray::segment(p_prev, p - p_prev, 0.0, 1.0);
            let tau = vol.optical_thickness(&step_ray, 0.5 * self.step_size, sampler.random_float());
            transmit *= (-tau).exp();

            // Once the beam is nearly extinct, roulette the remainder
            if transmit.luminance() < 1e-3 {
                const CONTINUE_PROB: f32 = 0.5;
                if sampler.random_float() > CONTINUE_PROB {
                    transmit = BLACK;
                    break;
                }
                transmit /= CONTINUE_PROB;
            }
            radiance += accumulate(p, transmit, &mut *sampler);
            t += step;
            p_prev = p;
        }
        (radiance * step, transmit)
    }
}

impl VolumeIntegrator for EmissionIntegrator {
    fn radiance(
        &self,
        scene: &Scene,
        _renderer: &Renderer,
        ray: &RayDifferential,
        sampler: &mut dyn Sampler,
        _arena: &Bump,
    ) -> (Color, Color) {
        let w_o = -ray.d;
        self.march(scene, ray, sampler, |p, transmit, _| {
            transmit * scene.volume_root().unwrap().emission(p, w_o)
        })
    }

    fn transmittance(
        &self,
        scene: &Scene,
        _renderer: &Renderer,
        ray: &RayDifferential,
        sampler: &mut dyn Sampler,
        _arena: &Bump,
    ) -> Color {
        let Some(vol) = scene.volume_root() else {
            return WHITE;
        };
        let tau = vol.optical_thickness(&ray.ray, self.step_size, sampler.random_float());
        (-tau).exp()
    }
}
