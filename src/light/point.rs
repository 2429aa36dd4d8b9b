use super::{Light, LightEmitResult, LightSampleResult, OcclusionTester};
use crate::film::Color;
use crate::linalg::{Normal, Point, Ray, Transform, Vector, PI};
use crate::monte_carlo::{uniform_sample_sphere, uniform_sphere_pdf};

// ─── Point light ────────────────────────────────────────────────────────────

/// An isotropic point emitter: a delta distribution in position, so every
/// `sample_at` returns the single direction toward it with pdf 1 and the
/// classic inverse-square falloff.
pub struct PointLight {
    position: Point,
    intensity: Color,
}

impl PointLight {
    pub fn new(to_world: Transform, intensity: Color) -> Self {
        Self {
            position: to_world.apply_point(Point::origin()),
            intensity,
        }
    }

    pub fn at(position: Point, intensity: Color) -> Self {
        Self {
            position,
            intensity,
        }
    }
}

impl Light for PointLight {
    fn sample_at(&self, p: Point, _u: [f32; 2]) -> LightSampleResult {
        LightSampleResult {
            radiance: self.intensity / self.position.distance_squared(p),
            w_i: (self.position - p).normalized(),
            pdf: 1.0,
            occlusion: OcclusionTester::between(p, self.position),
        }
    }

    fn sample_emit(&self, u_pos: [f32; 2], _u_dir: [f32; 2]) -> LightEmitResult {
        let d = uniform_sample_sphere(u_pos);
        LightEmitResult {
            radiance: self.intensity,
            ray: Ray::segment(self.position, d, 0.0, f32::INFINITY),
            normal: Normal::from(d),
            pdf: uniform_sphere_pdf(),
        }
    }

    fn power(&self) -> Color {
        self.intensity * (4.0 * PI)
    }

    fn pdf(&self, _p: Point, _w_i: Vector) -> f32 {
        0.0
    }

    fn is_delta(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_square_falloff() {
        let light = PointLight::at(Point::new(0.0, 10.0, 0.0), Color::broadcast(100.0));
        let near = light.sample_at(Point::new(0.0, 5.0, 0.0), [0.0, 0.0]);
        let far = light.sample_at(Point::new(0.0, 0.0, 0.0), [0.0, 0.0]);
        assert!((near.radiance.r / far.radiance.r - 4.0).abs() < 1e-4);
        assert_eq!(near.pdf, 1.0);
        assert!((near.w_i - Vector::new(0.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn delta_light_pdf_is_zero() {
        let light = PointLight::at(Point::origin(), Color::broadcast(1.0));
        assert!(light.is_delta());
        assert_eq!(light.pdf(Point::new(1.0, 0.0, 0.0), Vector::new(-1.0, 0.0, 0.0)), 0.0);
    }
}
