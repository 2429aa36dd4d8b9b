//! Sampling primitives shared by the BxDFs, lights, camera, and integrators.

use crate::linalg::{Vector, INV_PI, INV_TAU, PI, TAU};

/// Uniform direction on the hemisphere about +z.
pub fn uniform_sample_hemisphere(u: [f32; 2]) -> Vector {
    let r = (1.0 - u[0] * u[0]).max(0.0).sqrt();
    let phi = TAU * u[1];
    Vector::new(phi.cos() * r, phi.sin() * r, u[0])
}

#[inline]
pub fn uniform_hemisphere_pdf() -> f32 {
    INV_TAU
}

/// Uniform direction on the full sphere.
pub fn uniform_sample_sphere(u: [f32; 2]) -> Vector {
    let z = 1.0 - 2.0 * u[0];
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = TAU * u[1];
    Vector::new(phi.cos() * r, phi.sin() * r, z)
}

#[inline]
pub fn uniform_sphere_pdf() -> f32 {
    1.0 / (4.0 * PI)
}

/// Uniform direction in the cone of directions around `w_z` subtending
/// `cos_theta_max`, expressed in the (w_x, w_y, w_z) frame.
pub fn uniform_sample_cone(u: [f32; 2], cos_theta_max: f32, w_x: Vector, w_y: Vector, w_z: Vector) -> Vector {
    let cos_theta = crate::linalg::lerp(u[0], cos_theta_max, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = TAU * u[1];
    w_x * (phi.cos() * sin_theta) + w_y * (phi.sin() * sin_theta) + w_z * cos_theta
}

#[inline]
pub fn uniform_cone_pdf(cos_theta_max: f32) -> f32 {
    1.0 / (TAU * (1.0 - cos_theta_max))
}

/// Shirley's concentric mapping of the unit square onto the unit disk.
/// Preserves stratification far better than polar (r, θ) mapping, which
/// matters for lens sampling where stratified inputs are common.
pub fn concentric_sample_disk(u: [f32; 2]) -> [f32; 2] {
    let sx = 2.0 * u[0] - 1.0;
    let sy = 2.0 * u[1] - 1.0;
    if sx == 0.0 && sy == 0.0 {
        return [0.0, 0.0];
    }
    let (radius, mut theta) = if sx >= -sy {
        if sx > sy {
            (sx, if sy > 0.0 { sy / sx } else { 8.0 + sy / sx })
        } else {
            (sy, 2.0 - sx / sy)
        }
    } else if sx <= sy {
        (-sx, 4.0 + sy / sx)
    } else {
        (-sy, if sy != 0.0 { 6.0 - sx / sy } else { 0.0 })
    };
    theta *= PI / 4.0;
    [radius * theta.cos(), radius * theta.sin()]
}

/// Cosine-weighted hemisphere sample via Malley's method: sample the disk
/// concentrically, then project up. The resulting pdf is `cos θ / π`, the
/// optimal importance distribution for Lambertian reflection.
pub fn cos_sample_hemisphere(u: [f32; 2]) -> Vector {
    let disk = concentric_sample_disk(u);
    let z = (1.0 - disk[0] * disk[0] - disk[1] * disk[1]).max(0.0).sqrt();
    Vector::new(disk[0], disk[1], z)
}

#[inline]
pub fn cos_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.abs() * INV_PI
}

/// The power heuristic with β = 2 for weighting a two-technique multiple
/// importance sampling combination (Veach 1997). Heavily favors whichever
/// technique has the sharper pdf at the sampled direction.
#[inline]
pub fn power_heuristic(nf: f32, f_pdf: f32, ng: f32, g_pdf: f32) -> f32 {
    let f = nf * f_pdf;
    let g = ng * g_pdf;
    f * f / (f * f + g * g)
}

// ─── Distribution1D ─────────────────────────────────────────────────────────

/// A piecewise-constant 1D distribution with its normalized CDF, for
/// discrete sampling proportional to a set of weights (e.g. light powers).
#[derive(Debug, Clone, Default)]
pub struct Distribution1D {
    function: Vec<f32>,
    cdf: Vec<f32>,
    integral: f32,
}

impl Distribution1D {
    pub fn new(function: Vec<f32>) -> Self {
        let n = function.len();
        let mut cdf = vec![0.0; n + 1];
        for i in 1..=n {
            cdf[i] = cdf[i - 1] + function[i - 1] / n as f32;
        }
        let integral = cdf[n];
        if integral > 0.0 {
            for c in cdf.iter_mut() {
                *c /= integral;
            }
        }
        Self {
            function,
            cdf,
            integral,
        }
    }

    /// Samples a bucket index proportionally to its weight, returning the
    /// index and the discrete probability of having picked it. The selected
    /// index is the last one whose CDF value does not exceed `u`.
    pub fn sample_discrete(&self, u: f32) -> (usize, f32) {
        let n = self.function.len();
        let idx = self
            .cdf
            .partition_point(|&c| c <= u)
            .saturating_sub(1)
            .min(n.saturating_sub(1));
        let pdf = if self.integral > 0.0 {
            self.function[idx] / (self.integral * n as f32)
        } else {
            0.0
        };
        (idx, pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn sphere_samples_are_unit() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            let v = uniform_sample_sphere([rng.gen(), rng.gen()]);
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn hemisphere_samples_face_up() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..100 {
            assert!(uniform_sample_hemisphere([rng.gen(), rng.gen()]).z >= 0.0);
            assert!(cos_sample_hemisphere([rng.gen(), rng.gen()]).z >= 0.0);
        }
    }

    #[test]
    fn disk_samples_stay_inside() {
        let mut rng = SmallRng::seed_from_u64(13);
        for _ in 0..200 {
            let d = concentric_sample_disk([rng.gen(), rng.gen()]);
            assert!(d[0] * d[0] + d[1] * d[1] <= 1.0 + 1e-5);
        }
        assert_eq!(concentric_sample_disk([0.5, 0.5]), [0.0, 0.0]);
    }

    #[test]
    fn power_heuristic_favors_sharper_pdf() {
        let w = power_heuristic(1.0, 10.0, 1.0, 0.1);
        assert!(w > 0.99);
        let balanced = power_heuristic(1.0, 1.0, 1.0, 1.0);
        assert!((balanced - 0.5).abs() < 1e-6);
    }

    #[test]
    fn distribution_picks_by_weight() {
        let d = Distribution1D::new(vec![0.0, 3.0, 1.0]);
        let (idx, pdf) = d.sample_discrete(0.1);
        assert_eq!(idx, 1);
        assert!(pdf > 0.0);
        let (idx, _) = d.sample_discrete(0.9);
        assert_eq!(idx, 2);
        // Weight-zero buckets are never selected
        let (idx, _) = d.sample_discrete(0.0);
        assert_ne!(idx, 0);
    }
}
