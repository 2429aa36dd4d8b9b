//! Participating media: the volume interface, common phase functions, and
//! the volume node that places volumes in the scene.

mod exponential;
mod grid;
mod homogeneous;
mod node;

pub use exponential::ExponentialVolume;
pub use grid::GridVolume;
pub use homogeneous::HomogeneousVolume;
pub use node::VolumeNode;

use crate::film::Color;
use crate::geometry::BBox;
use crate::linalg::{Point, Ray, Vector, PI};

// ─── Phase functions ────────────────────────────────────────────────────────
//
// All take the incident direction w_i and outgoing direction w_o and
// integrate to one over the sphere.

#[inline]
pub fn phase_isotropic() -> f32 {
    1.0 / (4.0 * PI)
}

pub fn phase_rayleigh(w_i: Vector, w_o: Vector) -> f32 {
    let cos_t = w_i.dot(w_o);
    3.0 / (16.0 * PI) * (1.0 + cos_t * cos_t)
}

pub fn phase_mie_hazy(w_i: Vector, w_o: Vector) -> f32 {
    let cos_t = w_i.dot(w_o);
    (0.5 + 4.5 * (0.5 * (1.0 + cos_t)).powf(8.0)) / (4.0 * PI)
}

pub fn phase_mie_murky(w_i: Vector, w_o: Vector) -> f32 {
    let cos_t = w_i.dot(w_o);
    (0.5 + 16.5 * (0.5 * (1.0 + cos_t)).powf(32.0)) / (4.0 * PI)
}

/// The Henyey-Greenstein phase function with asymmetry `g ∈ (-1, 1)`:
/// positive g scatters forward, negative backward, zero is isotropic.
pub fn phase_henyey_greenstein(w_i: Vector, w_o: Vector, g: f32) -> f32 {
    let cos_t = w_i.dot(w_o);
    1.0 / (4.0 * PI) * (1.0 - g * g) / (1.0 + g * g - 2.0 * g * cos_t).powf(1.5)
}

/// Schlick's rational approximation to Henyey-Greenstein, cheaper to
/// evaluate inside ray-marching loops.
pub fn phase_schlick(w_i: Vector, w_o: Vector, g: f32) -> f32 {
    let alpha = 1.5;
    let k = alpha * g + (1.0 - alpha) * g.powi(3);
    let k_cos_t = k * w_i.dot(w_o);
    1.0 / (4.0 * PI) * (1.0 - k * k) / ((1.0 - k_cos_t) * (1.0 - k_cos_t))
}

// ─── Volume trait ───────────────────────────────────────────────────────────

/// A region of participating medium, described in its own object space by
/// its scattering properties at each point.
pub trait Volume: Send + Sync {
    /// Object-space bounds of the region.
    fn bound(&self) -> BBox;

    /// Parametric overlap of the ray with the region, if any.
    fn intersect(&self, ray: &Ray) -> Option<(f32, f32)>;

    /// Absorption coefficient σ_a at `p` along `v`.
    fn absorption(&self, p: Point, v: Vector) -> Color;

    /// Scattering coefficient σ_s at `p` along `v`.
    fn scattering(&self, p: Point, v: Vector) -> Color;

    /// Attenuation σ_t = σ_a + σ_s.
    fn attenuation(&self, p: Point, v: Vector) -> Color {
        self.absorption(p, v) + self.scattering(p, v)
    }

    /// Emitted radiance L_e at `p` along `v`.
    fn emission(&self, p: Point, v: Vector) -> Color;

    /// Optical thickness `τ = ∫ σ_t` along the ray's live segment.
    /// Heterogeneous media estimate the integral by marching with the given
    /// step size, offsetting the first sample by `offset ∈ [0, 1)` of a step
    /// so repeated estimates decorrelate.
    fn optical_thickness(&self, ray: &Ray, step: f32, offset: f32) -> Color;

    /// Phase function at `p` for incident `w_i` and outgoing `w_o`.
    fn phase(&self, p: Point, w_i: Vector, w_o: Vector) -> f32;
}

/// Shared ray-marching τ estimate for media with spatially varying density.
pub(crate) fn march_optical_thickness(
    vol: &dyn Volume,
    ray: &Ray,
    step: f32,
    offset: f32,
) -> Color {
    let length = ray.d.length();
    if length == 0.0 {
        return Color::broadcast(0.0);
    }
    let unit = Ray::segment(ray.o, ray.d / length, ray.t_min * length, ray.t_max * length);
    let Some((t0, t1)) = vol.intersect(&unit) else {
        return Color::broadcast(0.0);
    };
    let mut tau = Color::broadcast(0.0);
    let mut t = t0 + offset * step;
    while t < t1 {
        tau += vol.attenuation(unit.at(t), -unit.d);
        t += step;
    }
    tau * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn mc_integral(phase: impl Fn(Vector, Vector) -> f32, n: usize) -> f32 {
        // Monte Carlo integral of the phase function over the sphere with
        // uniform direction sampling
        let mut rng = SmallRng::seed_from_u64(33);
        let w_o = Vector::new(0.0, 0.0, 1.0);
        let mut sum = 0.0;
        for _ in 0..n {
            let w_i = crate::monte_carlo::uniform_sample_sphere([rng.gen(), rng.gen()]);
            sum += phase(w_i, w_o) / crate::monte_carlo::uniform_sphere_pdf();
        }
        sum / n as f32
    }

    #[test]
    fn phase_functions_are_normalized() {
        assert!((mc_integral(|a, b| phase_rayleigh(a, b), 20000) - 1.0).abs() < 0.05);
        assert!(
            (mc_integral(|a, b| phase_henyey_greenstein(a, b, 0.4), 20000) - 1.0).abs() < 0.05
        );
        assert!((phase_isotropic() * 4.0 * PI - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hg_asymmetry_controls_direction() {
        let w_o = Vector::new(0.0, 0.0, 1.0);
        let forward = phase_henyey_greenstein(w_o, w_o, 0.7);
        let backward = phase_henyey_greenstein(-w_o, w_o, 0.7);
        assert!(forward > backward);
    }
}
