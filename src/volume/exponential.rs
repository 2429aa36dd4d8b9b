use super::{march_optical_thickness, phase_henyey_greenstein, Volume};
use crate::film::Color;
use crate::geometry::BBox;
use crate::linalg::{Point, Ray, Vector};

/// A medium whose density falls off exponentially with height:
/// `d(p) = a · e^(-b · h)` where `h` is the distance above the region floor
/// along `up`. Models ground fog and atmosphere slabs.
pub struct ExponentialVolume {
    sig_a: Color,
    sig_s: Color,
    emit: Color,
    phase_asymmetry: f32,
    region: BBox,
    a: f32,
    b: f32,
    up: Vector,
}

impl ExponentialVolume {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sig_a: Color,
        sig_s: Color,
        emit: Color,
        phase_asymmetry: f32,
        region: BBox,
        a: f32,
        b: f32,
        up: Vector,
    ) -> Self {
        Self {
            sig_a,
            sig_s,
            emit,
            phase_asymmetry,
            region,
            a,
            b,
            up,
        }
    }

    fn density(&self, p: Point) -> f32 {
        if !self.region.inside(p) {
            return 0.0;
        }
        let h = self.up.dot(p - self.region.min);
        self.a * (-self.b * h).exp()
    }
}

impl Volume for ExponentialVolume {
    fn bound(&self) -> BBox {
        self.region
    }

    fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        self.region.intersect(ray)
    }

    fn absorption(&self, p: Point, _v: Vector) -> Color {
        self.sig_a * self.density(p)
    }

    fn scattering(&self, p: Point, _v: Vector) -> Color {
        self.sig_s * self.density(p)
    }

    fn attenuation(&self, p: Point, _v: Vector) -> Color {
        (self.sig_a + self.sig_s) * self.density(p)
    }

    fn emission(&self, p: Point, _v: Vector) -> Color {
        self.emit * self.density(p)
    }

    fn optical_thickness(&self, ray: &Ray, step: f32, offset: f32) -> Color {
        march_optical_thickness(self, ray, step, offset)
    }

    fn phase(&self, _p: Point, w_i: Vector, w_o: Vector) -> f32 {
        phase_henyey_greenstein(w_i, w_o, self.phase_asymmetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::BLACK;

    #[test]
    fn density_decays_with_height() {
        let vol = ExponentialVolume::new(
            Color::broadcast(0.5),
            BLACK,
            BLACK,
            0.0,
            BBox::new(Point::new(-1.0, 0.0, -1.0), Point::new(1.0, 4.0, 1.0)),
            1.0,
            1.0,
            Vector::new(0.0, 1.0, 0.0),
        );
        let low = vol.attenuation(Point::new(0.0, 0.5, 0.0), Vector::new(1.0, 0.0, 0.0));
        let high = vol.attenuation(Point::new(0.0, 3.0, 0.0), Vector::new(1.0, 0.0, 0.0));
        assert!(low.r > high.r);
        assert!(vol
            .attenuation(Point::new(0.0, 10.0, 0.0), Vector::new(1.0, 0.0, 0.0))
            .is_black());
    }

    #[test]
    fn marched_tau_approximates_analytic() {
        // Vertical ray through the slab: τ = σ_t · a · (1 - e^(-b·H)) / b
        let vol = ExponentialVolume::new(
            Color::broadcast(1.0),
            BLACK,
            BLACK,
            0.0,
            BBox::new(Point::new(-1.0, 0.0, -1.0), Point::new(1.0, 2.0, 1.0)),
            1.0,
            1.0,
            Vector::new(0.0, 1.0, 0.0),
        );
        let ray = Ray::new(Point::new(0.0, -1.0, 0.0), Vector::new(0.0, 1.0, 0.0));
        let tau = vol.optical_thickness(&ray, 0.01, 0.5);
        let analytic = 1.0 - (-2.0f32).exp();
        assert!((tau.r - analytic).abs() < 0.05, "{} vs {analytic}", tau.r);
    }
}
