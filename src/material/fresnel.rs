use crate::film::Color;

// ─── Fresnel reflectance ────────────────────────────────────────────────────

/// Exact Fresnel reflectance for unpolarized light crossing a dielectric
/// boundary, averaged over the parallel and perpendicular polarizations.
pub fn fresnel_dielectric(cos_i: f32, cos_t: f32, eta_i: f32, eta_t: f32) -> Color {
    let r_par = (eta_t * cos_i - eta_i * cos_t) / (eta_t * cos_i + eta_i * cos_t);
    let r_perp = (eta_i * cos_i - eta_t * cos_t) / (eta_i * cos_i + eta_t * cos_t);
    Color::broadcast(0.5 * (r_par * r_par + r_perp * r_perp))
}

/// Fresnel reflectance for a conductor with complex index of refraction
/// `eta + i·k`; the expressions already give squared amplitudes.
pub fn fresnel_conductor(cos_i: f32, eta: Color, k: Color) -> Color {
    let a = (eta * eta + k * k) * (cos_i * cos_i);
    let one = Color::broadcast(1.0);
    let two_eta_cos = eta * (2.0 * cos_i);
    let r_par = (a - two_eta_cos + one) / (a + two_eta_cos + one);
    let a = eta * eta + k * k;
    let cos_sqr = Color::broadcast(cos_i * cos_i);
    let r_perp = (a - two_eta_cos + cos_sqr) / (a + two_eta_cos + cos_sqr);
    (r_par + r_perp) * 0.5
}

/// The Fresnel interface kinds form a closed set.
#[derive(Debug, Clone, Copy)]
pub enum Fresnel {
    /// Dielectric boundary between media with real indices of refraction,
    /// `eta_i` on the side the shading normal faces.
    Dielectric { eta_i: f32, eta_t: f32 },
    /// Conductor with complex index `eta + i·k`.
    Conductor { eta: Color, k: Color },
    /// Reflects everything; for idealized mirrors.
    NoOp,
}

impl Fresnel {
    pub fn dielectric(eta_i: f32, eta_t: f32) -> Self {
        Fresnel::Dielectric { eta_i, eta_t }
    }

    pub fn conductor(eta: Color, k: Color) -> Self {
        Fresnel::Conductor { eta, k }
    }

    /// Reflectance for light incident at `cos_i` relative to the normal.
    /// A negative `cos_i` means the ray arrives from below the surface, which
    /// swaps the dielectric indices.
    pub fn evaluate(&self, cos_i: f32) -> Color {
        match *self {
            Fresnel::Dielectric { eta_i, eta_t } => {
                let cos_i = cos_i.clamp(-1.0, 1.0);
                let (ei, et) = if cos_i > 0.0 { (eta_i, eta_t) } else { (eta_t, eta_i) };
                let sin_t = ei / et * (1.0 - cos_i * cos_i).max(0.0).sqrt();
                if sin_t >= 1.0 {
                    // Total internal reflection
                    return Color::broadcast(1.0);
                }
                let cos_t = (1.0 - sin_t * sin_t).max(0.0).sqrt();
                fresnel_dielectric(cos_i.abs(), cos_t, ei, et)
            }
            Fresnel::Conductor { eta, k } => fresnel_conductor(cos_i.abs(), eta, k),
            Fresnel::NoOp => Color::broadcast(1.0),
        }
    }
}
