use super::fresnel::Fresnel;
use super::microfacet::MicrofacetDistribution;
use super::{cos_phi, cos_theta, same_hemisphere, sin_phi, sin_theta, sin_theta_sqr, BxdfType};
use crate::film::{Color, BLACK};
use crate::linalg::{Vector, INV_PI, PI};
use crate::monte_carlo::{
    cos_hemisphere_pdf, cos_sample_hemisphere, uniform_hemisphere_pdf, uniform_sample_hemisphere,
};

// ─── BxDF ───────────────────────────────────────────────────────────────────

/// One scattering lobe of a BSDF. The set of lobes is closed, so dispatch is
/// a tagged enum; `f` and `pdf` are the hottest calls in the renderer and
/// the match compiles to a jump the optimizer can see through.
///
/// All directions are unit vectors in shading space with z along the shading
/// normal. Delta lobes (the two specular variants) return zero from `f` and
/// `pdf`; their whole contribution arrives through `sample` with pdf 1.
pub enum Bxdf<'a> {
    Lambertian(Lambertian),
    OrenNayar(OrenNayar),
    SpecularReflection(SpecularReflection),
    SpecularTransmission(SpecularTransmission),
    TorranceSparrow(TorranceSparrow),
    BtdfAdapter(BtdfAdapter<'a>),
}

impl<'a> Bxdf<'a> {
    pub fn bxdf_type(&self) -> BxdfType {
        match self {
            Bxdf::Lambertian(_) | Bxdf::OrenNayar(_) => BxdfType::REFLECTION | BxdfType::DIFFUSE,
            Bxdf::SpecularReflection(_) => BxdfType::REFLECTION | BxdfType::SPECULAR,
            Bxdf::SpecularTransmission(_) => BxdfType::TRANSMISSION | BxdfType::SPECULAR,
            Bxdf::TorranceSparrow(_) => BxdfType::REFLECTION | BxdfType::GLOSSY,
            Bxdf::BtdfAdapter(b) => {
                // Flip which side of the surface the wrapped lobe serves
                let mut t = b.inner.bxdf_type();
                t.toggle(BxdfType::REFLECTION | BxdfType::TRANSMISSION);
                t
            }
        }
    }

    #[inline]
    pub fn matches(&self, flags: BxdfType) -> bool {
        flags.contains(self.bxdf_type())
    }

    #[inline]
    pub fn is_specular(&self) -> bool {
        self.bxdf_type().contains(BxdfType::SPECULAR)
    }

    /// Evaluates the lobe for an outgoing/incident direction pair.
    pub fn f(&self, w_o: Vector, w_i: Vector) -> Color {
        match self {
            Bxdf::Lambertian(b) => b.reflectance * INV_PI,
            Bxdf::OrenNayar(b) => b.f(w_o, w_i),
            Bxdf::SpecularReflection(_) | Bxdf::SpecularTransmission(_) => BLACK,
            Bxdf::TorranceSparrow(b) => b.f(w_o, w_i),
            Bxdf::BtdfAdapter(b) => b.inner.f(w_o, flip_hemisphere(w_i)),
        }
    }

    /// Importance-samples an incident direction for `w_o`, returning
    /// `(f, w_i, pdf)`.
    pub fn sample(&self, w_o: Vector, u: [f32; 2]) -> (Color, Vector, f32) {
        match self {
            Bxdf::SpecularReflection(b) => b.sample(w_o),
            Bxdf::SpecularTransmission(b) => b.sample(w_o),
            Bxdf::TorranceSparrow(b) => {
                let (w_i, pdf) = b.distribution.sample(w_o, u);
                if !same_hemisphere(w_o, w_i) {
                    (BLACK, w_i, pdf)
                } else {
                    (b.f(w_o, w_i), w_i, pdf)
                }
            }
            Bxdf::BtdfAdapter(b) => {
                let (f, w_i, pdf) = b.inner.sample(w_o, u);
                (f, flip_hemisphere(w_i), pdf)
            }
            // Diffuse lobes: cosine-weighted hemisphere sampling, flipped to
            // w_o's side
            _ => {
                let mut w_i = cos_sample_hemisphere(u);
                if w_o.z < 0.0 {
                    w_i.z = -w_i.z;
                }
                let pdf = self.pdf(w_o, w_i);
                (self.f(w_o, w_i), w_i, pdf)
            }
        }
    }

    /// Pdf of `sample` producing `w_i` from `w_o`.
    pub fn pdf(&self, w_o: Vector, w_i: Vector) -> f32 {
        match self {
            Bxdf::SpecularReflection(_) | Bxdf::SpecularTransmission(_) => 0.0,
            Bxdf::TorranceSparrow(b) => {
                if same_hemisphere(w_o, w_i) {
                    b.distribution.pdf(w_o, w_i)
                } else {
                    0.0
                }
            }
            Bxdf::BtdfAdapter(b) => b.inner.pdf(w_o, flip_hemisphere(w_i)),
            _ => {
                if same_hemisphere(w_o, w_i) {
                    cos_hemisphere_pdf(cos_theta(w_i))
                } else {
                    0.0
                }
            }
        }
    }

    /// Hemispherical-directional reflectance: the fraction of light from
    /// `w_o` scattered anywhere in the hemisphere. Closed-form for the
    /// diffuse lobes, Monte Carlo via `sample` otherwise.
    pub fn rho_hd(&self, w_o: Vector, samples: &[[f32; 2]]) -> Color {
        match self {
            Bxdf::Lambertian(b) => b.reflectance,
            Bxdf::OrenNayar(b) => b.reflectance,
            Bxdf::BtdfAdapter(b) => b.inner.rho_hd(flip_hemisphere(w_o), samples),
            _ => {
                let mut rho = BLACK;
                for &u in samples {
                    let (f, w_i, pdf) = self.sample(w_o, u);
                    if pdf > 0.0 {
                        rho += f * cos_theta(w_i).abs() / pdf;
                    }
                }
                rho / samples.len() as f32
            }
        }
    }

    /// Hemispherical-hemispherical reflectance: the fraction of uniform
    /// incident light scattered back out, the quantity bounded by 1 for any
    /// energy-conserving lobe.
    pub fn rho_hh(&self, samples_a: &[[f32; 2]], samples_b: &[[f32; 2]]) -> Color {
        match self {
            Bxdf::Lambertian(b) => b.reflectance,
            Bxdf::OrenNayar(b) => b.reflectance,
            Bxdf::BtdfAdapter(b) => b.inner.rho_hh(samples_a, samples_b),
            _ => {
                let mut rho = BLACK;
                for (&ua, &ub) in samples_a.iter().zip(samples_b) {
                    let w_o = uniform_sample_hemisphere(ua);
                    let pdf_o = uniform_hemisphere_pdf();
                    let (f, w_i, pdf_i) = self.sample(w_o, ub);
                    if pdf_i > 0.0 {
                        rho += f * cos_theta(w_o).abs() * cos_theta(w_i).abs() / (pdf_o * pdf_i);
                    }
                }
                rho / (PI * samples_a.len() as f32)
            }
        }
    }
}

#[inline(always)]
fn flip_hemisphere(v: Vector) -> Vector {
    Vector::new(v.x, v.y, -v.z)
}

// ─── Lambertian ─────────────────────────────────────────────────────────────

/// Perfectly diffuse reflection: constant `R/π` over the hemisphere.
pub struct Lambertian {
    pub reflectance: Color,
}

impl Lambertian {
    pub fn new<'a>(reflectance: Color) -> Bxdf<'a> {
        Bxdf::Lambertian(Self { reflectance })
    }
}

// ─── Oren-Nayar ─────────────────────────────────────────────────────────────

/// The Oren-Nayar (1994) rough diffuse model: a v-cavity microfacet surface
/// of Lambertian facets with slope deviation `sigma` (degrees), which
/// brightens retroreflection relative to the flat Lambertian model.
pub struct OrenNayar {
    pub reflectance: Color,
    a: f32,
    b: f32,
}

impl OrenNayar {
    pub fn new<'a>(reflectance: Color, sigma_deg: f32) -> Bxdf<'a> {
        let sigma_sqr = sigma_deg.to_radians().powi(2);
        Bxdf::OrenNayar(Self {
            reflectance,
            a: 1.0 - sigma_sqr / (2.0 * (sigma_sqr + 0.33)),
            b: 0.45 * sigma_sqr / (sigma_sqr + 0.09),
        })
    }

    fn f(&self, w_o: Vector, w_i: Vector) -> Color {
        let alpha = cos_theta(w_i).max(cos_theta(w_o));
        let beta = cos_theta(w_i).min(cos_theta(w_o));
        let mut max_cos = 0.0;
        if sin_theta(w_i) > 1e-4 && sin_theta(w_o) > 1e-4 {
            max_cos = (cos_phi(w_i) * cos_phi(w_o) + sin_phi(w_i) * sin_phi(w_o)).max(0.0);
        }
        self.reflectance * INV_PI * (self.a + self.b * max_cos * alpha.sin() * beta.tan())
    }
}

// ─── Specular reflection ────────────────────────────────────────────────────

/// A perfect mirror: the delta distribution at the reflection of `w_o`
/// about the shading normal.
pub struct SpecularReflection {
    pub reflectance: Color,
    pub fresnel: Fresnel,
}

impl SpecularReflection {
    pub fn new<'a>(reflectance: Color, fresnel: Fresnel) -> Bxdf<'a> {
        Bxdf::SpecularReflection(Self {
            reflectance,
            fresnel,
        })
    }

    fn sample(&self, w_o: Vector) -> (Color, Vector, f32) {
        // In shading space the mirror direction just negates x and y
        let w_i = Vector::new(-w_o.x, -w_o.y, w_o.z);
        let f = self.fresnel.evaluate(cos_theta(w_o)) * self.reflectance
            / cos_theta(w_i).abs();
        (f, w_i, 1.0)
    }
}

// ─── Specular transmission ──────────────────────────────────────────────────

/// Perfect refraction through a dielectric boundary with `eta_i` outside
/// (the shading-normal side) and `eta_t` inside.
pub struct SpecularTransmission {
    pub transmission: Color,
    eta_i: f32,
    eta_t: f32,
    fresnel: Fresnel,
}

impl SpecularTransmission {
    pub fn new<'a>(transmission: Color, eta_i: f32, eta_t: f32) -> Bxdf<'a> {
        Bxdf::SpecularTransmission(Self {
            transmission,
            eta_i,
            eta_t,
            fresnel: Fresnel::dielectric(eta_t, eta_i),
        })
    }

    fn sample(&self, w_o: Vector) -> (Color, Vector, f32) {
        // Which side of the boundary is the light arriving from?
        let entering = cos_theta(w_o) > 0.0;
        let (ei, et) = if entering {
            (self.eta_i, self.eta_t)
        } else {
            (self.eta_t, self.eta_i)
        };
        let eta = ei / et;
        let sin_t_sqr = eta * eta * sin_theta_sqr(w_o);
        if sin_t_sqr >= 1.0 {
            // Total internal reflection: nothing is transmitted
            return (BLACK, Vector::zero(), 0.0);
        }
        let cos_t = (1.0 - sin_t_sqr).max(0.0).sqrt();
        let cos_t = if entering { -cos_t } else { cos_t };
        let w_i = Vector::new(eta * -w_o.x, eta * -w_o.y, cos_t);
        let f = (Color::broadcast(1.0) - self.fresnel.evaluate(cos_theta(w_o)))
            * self.transmission
            / cos_theta(w_i).abs();
        (f, w_i, 1.0)
    }
}

// ─── Torrance-Sparrow ───────────────────────────────────────────────────────

/// Glossy reflection from a microfacet surface: distribution times Fresnel
/// times geometric attenuation over the standard `4 cosθ_o cosθ_i`
/// normalization.
pub struct TorranceSparrow {
    pub reflectance: Color,
    pub fresnel: Fresnel,
    pub distribution: MicrofacetDistribution,
}

impl TorranceSparrow {
    pub fn new<'a>(
        reflectance: Color,
        fresnel: Fresnel,
        distribution: MicrofacetDistribution,
    ) -> Bxdf<'a> {
        Bxdf::TorranceSparrow(Self {
            reflectance,
            fresnel,
            distribution,
        })
    }

    fn f(&self, w_o: Vector, w_i: Vector) -> Color {
        let cos_o = cos_theta(w_o).abs();
        let cos_i = cos_theta(w_i).abs();
        if cos_o == 0.0 || cos_i == 0.0 {
            return BLACK;
        }
        let w_h = (w_i + w_o).normalized();
        let cos_h = w_i.dot(w_h);
        self.reflectance
            * self.distribution.d(w_h)
            * self.distribution.geom_atten(w_o, w_i, w_h)
            * self.fresnel.evaluate(cos_h)
            / (4.0 * cos_o * cos_i)
    }
}

// ─── BTDF adapter ───────────────────────────────────────────────────────────

/// Reuses a reflection lobe as a transmission lobe (or vice versa) by
/// flipping the z of incident directions into the opposite hemisphere.
///
/// Whether this mirror-image reuse is physically faithful for non-Lambertian
/// lobes has not been verified; the behavior is kept as-is pending review.
pub struct BtdfAdapter<'a> {
    pub inner: &'a Bxdf<'a>,
}

impl<'a> BtdfAdapter<'a> {
    pub fn new(inner: &'a Bxdf<'a>) -> Bxdf<'a> {
        Bxdf::BtdfAdapter(Self { inner })
    }
}
