//! The renderer facade: ties a surface integrator and an optional volume
//! integrator together behind the two queries the rest of the system makes —
//! incident radiance along a ray, and beam transmittance.

use bumpalo::Bump;

use crate::film::{Color, BLACK, WHITE};
use crate::geometry::DifferentialGeometry;
use crate::integrator::{SurfaceIntegrator, VolumeIntegrator};
use crate::linalg::{Point, RayDifferential, PI, TAU};
use crate::sampler::Sampler;
use crate::scene::Scene;

pub struct Renderer {
    surface: Box<dyn SurfaceIntegrator>,
    volume: Option<Box<dyn VolumeIntegrator>>,
}

impl Renderer {
    pub fn new(
        surface: Box<dyn SurfaceIntegrator>,
        volume: Option<Box<dyn VolumeIntegrator>>,
    ) -> Self {
        Self { surface, volume }
    }

    /// Incident radiance along the ray: the surface integrator's estimate at
    /// the first hit, attenuated by and added to the medium's contribution.
    /// Rays that escape the scene sample the environment map if present.
    pub fn illumination(
        &self,
        ray: &mut RayDifferential,
        scene: &Scene,
        sampler: &mut dyn Sampler,
        arena: &Bump,
    ) -> Color {
        let mut dg = DifferentialGeometry::default();
        let surface = if scene.root().intersect(&mut ray.ray, &mut dg) {
            dg.compute_differentials(ray);
            self.surface
                .illumination(scene, self, ray, &mut dg, sampler, arena)
        } else if let Some(env) = scene.environment() {
            // Latitude-longitude environment lookup by escape direction
            let d = ray.d.normalized();
            let env_dg = DifferentialGeometry {
                point: Point::new(d.x, d.y, d.z),
                u: 0.5 + d.x.atan2(d.z) / TAU,
                v: 0.5 - d.y.asin() / PI,
                ..Default::default()
            };
            env.sample(&env_dg)
        } else {
            BLACK
        };
        // The medium attenuates whatever lies behind the segment and adds
        // its own emission and in-scattering, whether or not anything was hit
        let (volume_radiance, transmit) = match &self.volume {
            Some(vol) => vol.radiance(scene, self, ray, sampler, arena),
            None => (BLACK, WHITE),
        };
        transmit * surface + volume_radiance
    }

    /// Beam transmittance along the ray segment through participating media;
    /// white when no volume integrator is configured (clear air).
    pub fn transmittance(
        &self,
        scene: &Scene,
        ray: &RayDifferential,
        sampler: &mut dyn Sampler,
        arena: &Bump,
    ) -> Color {
        match &self.volume {
            Some(vol) => vol.transmittance(scene, self, ray, sampler, arena),
            None => WHITE,
        }
    }
}
