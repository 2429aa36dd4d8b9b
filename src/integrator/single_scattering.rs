use bumpalo::Bump;

use super::{EmissionIntegrator, VolumeIntegrator};
use crate::film::{Color, WHITE};
use crate::linalg::RayDifferential;
use crate::renderer::Renderer;
use crate::sampler::Sampler;
use crate::scene::Scene;

// ─── Single-scattering volume integrator ────────────────────────────────────

/// Extends the emission march with direct in-scattering: at every step one
/// light is sampled uniformly and its radiance — attenuated by the medium on
/// the way in — is scattered toward the eye through the phase function.
pub struct SingleScatteringIntegrator {
    emission: EmissionIntegrator,
}

impl SingleScatteringIntegrator {
    pub fn new(step_size: f32) -> Self {
        Self {
            emission: EmissionIntegrator::new(step_size),
        }
    }
}

impl VolumeIntegrator for SingleScatteringIntegrator {
    fn radiance(
        &self,
        scene: &Scene,
        renderer: &Renderer,
        ray: &RayDifferential,
        sampler: &mut dyn Sampler,
        arena: &Bump,
    ) -> (Color, Color) {
        let w_o = -ray.d;
        let n_lights = scene.lights().len();
        self.emission.march(scene, ray, sampler, |p, transmit, sampler| {
            let vol = scene.volume_root().unwrap();
            let mut radiance = transmit * vol.emission(p, w_o);

            let scatter = vol.scattering(p, w_o);
            if !scatter.is_black() && n_lights > 0 {
                let mut u = [[0.0f32; 2]; 1];
                let mut comp = [0.0f32; 2];
                sampler.get_2d(&mut u);
                sampler.get_1d(&mut comp);
                let light_num = ((comp[0] * n_lights as f32) as usize).min(n_lights - 1);
                let light = &scene.lights()[light_num];
                let ls = light.sample_at(p, u[0]);
                if !ls.radiance.is_black() && ls.pdf > 0.0 && !ls.occlusion.occluded(scene) {
                    // Attenuate the light through the medium as well
                    let light_direct =
                        ls.radiance * ls.occlusion.transmittance(scene, renderer, sampler, arena);
                    radiance += transmit
                        * scatter
                        * vol.phase(p, w_o, -ls.w_i)
                        * light_direct
                        * (n_lights as f32 / ls.pdf);
                }
            }
            radiance
        })
    }

    fn transmittance(
        &self,
        scene: &Scene,
        renderer: &Renderer,
        ray: &RayDifferential,
        sampler: &mut dyn Sampler,
        arena: &Bump,
    ) -> Color {
        if scene.volume_root().is_none() {
            return WHITE;
        }
        self.emission.transmittance(scene, renderer, ray, sampler, arena)
    }
}
