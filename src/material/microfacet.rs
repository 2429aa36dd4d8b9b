use super::{cos_theta, same_hemisphere};
use crate::linalg::{spherical_dir, Vector, TAU};

// ─── Microfacet distributions ───────────────────────────────────────────────

/// A microfacet normal distribution for Torrance-Sparrow style BRDFs.
///
/// The distribution kinds form a closed set. An anisotropic
/// Ashikhmin-Shirley distribution would slot in here as another variant;
/// it is deliberately absent until its sampling routine is worked out.
#[derive(Debug, Clone, Copy)]
pub enum MicrofacetDistribution {
    /// The Blinn (1977) distribution: half vectors distributed as
    /// `(e + 2)/(2π) · cos(θ_h)^e`.
    Blinn { exponent: f32 },
}

impl MicrofacetDistribution {
    pub fn blinn(exponent: f32) -> Self {
        MicrofacetDistribution::Blinn { exponent }
    }

    /// The differential area of microfacets oriented along `w_h`.
    pub fn d(&self, w_h: Vector) -> f32 {
        match *self {
            MicrofacetDistribution::Blinn { exponent } => {
                (exponent + 2.0) / TAU * cos_theta(w_h).abs().powf(exponent)
            }
        }
    }

    /// Samples an incident direction by drawing a half vector from the
    /// distribution and reflecting `w_o` about it. Returns `(w_i, pdf)`.
    pub fn sample(&self, w_o: Vector, u: [f32; 2]) -> (Vector, f32) {
        match *self {
            MicrofacetDistribution::Blinn { exponent } => {
                let cos_t = u[0].powf(1.0 / (exponent + 1.0));
                let sin_t = (1.0 - cos_t * cos_t).max(0.0).sqrt();
                let phi = TAU * u[1];
                let mut w_h = spherical_dir(sin_t, cos_t, phi);
                if !same_hemisphere(w_o, w_h) {
                    w_h = -w_h;
                }
                let w_i = -w_o + 2.0 * w_o.dot(w_h) * w_h;
                let pdf = if w_o.dot(w_h) <= 0.0 {
                    0.0
                } else {
                    ((exponent + 1.0) * cos_t.powf(exponent)) / (TAU * 4.0 * w_o.dot(w_h))
                };
                (w_i, pdf)
            }
        }
    }

    /// Pdf of `sample` having produced `w_i` from `w_o`.
    pub fn pdf(&self, w_o: Vector, w_i: Vector) -> f32 {
        match *self {
            MicrofacetDistribution::Blinn { exponent } => {
                let w_h = (w_o + w_i).normalized();
                let cos_t = cos_theta(w_h).abs();
                if w_o.dot(w_h) <= 0.0 {
                    0.0
                } else {
                    ((exponent + 1.0) * cos_t.powf(exponent)) / (TAU * 4.0 * w_o.dot(w_h))
                }
            }
        }
    }

    /// The Torrance-Sparrow geometric attenuation term: masking and
    /// shadowing between v-cavity microfacets.
    pub fn geom_atten(&self, w_o: Vector, w_i: Vector, w_h: Vector) -> f32 {
        let n_dot_h = cos_theta(w_h).abs();
        let n_dot_o = cos_theta(w_o).abs();
        let n_dot_i = cos_theta(w_i).abs();
        let o_dot_h = w_o.dot(w_h).abs();
        (2.0 * n_dot_h * n_dot_o / o_dot_h)
            .min(2.0 * n_dot_h * n_dot_i / o_dot_h)
            .min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn sample_and_pdf_agree() {
        let dist = MicrofacetDistribution::blinn(20.0);
        let w_o = Vector::new(0.3, -0.1, 0.9).normalized();
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..100 {
            let (w_i, pdf) = dist.sample(w_o, [rng.gen(), rng.gen()]);
            if pdf == 0.0 || !same_hemisphere(w_o, w_i) {
                continue;
            }
            let p2 = dist.pdf(w_o, w_i);
            assert!(
                (pdf - p2).abs() / pdf.max(1e-6) < 1e-2,
                "sample pdf {pdf} vs pdf() {p2}"
            );
        }
    }

    #[test]
    fn higher_exponent_concentrates_half_vectors() {
        let sharp = MicrofacetDistribution::blinn(200.0);
        let rough = MicrofacetDistribution::blinn(5.0);
        let up = Vector::new(0.0, 0.0, 1.0);
        assert!(sharp.d(up) > rough.d(up));
        let grazing = Vector::new(0.7, 0.0, 0.714).normalized();
        assert!(sharp.d(grazing) < rough.d(grazing));
    }

    #[test]
    fn geometric_attenuation_bounded() {
        let dist = MicrofacetDistribution::blinn(10.0);
        let w_o = Vector::new(0.5, 0.0, 0.866);
        let w_i = Vector::new(-0.5, 0.0, 0.866);
        let w_h = (w_o + w_i).normalized();
        let g = dist.geom_atten(w_o, w_i, w_h);
        assert!((0.0..=1.0).contains(&g));
    }
}
