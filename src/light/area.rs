use super::{Light, LightEmitResult, LightSampleResult, OcclusionTester};
use crate::film::{Color, BLACK};
use crate::geometry::{Geometry, Sphere};
use crate::linalg::{Normal, Point, Ray, Transform, Vector, INV_TAU, PI};
use crate::monte_carlo::uniform_sample_sphere;

// ─── Area light ─────────────────────────────────────────────────────────────

/// A sphere that emits `emit` radiance uniformly from its surface. The light
/// owns its emitting geometry and samples it by the solid angle it subtends
/// from the shading point.
///
/// Emission is one-sided: a surface point radiates only into the hemisphere
/// its normal faces.
pub struct AreaLight {
    to_world: Transform,
    to_light: Transform,
    emit: Color,
    geometry: Sphere,
    surface_area: f32,
}

impl AreaLight {
    pub fn new(to_world: Transform, emit: Color, radius: f32) -> Self {
        let geometry = Sphere::new(radius);
        let surface_area = geometry.surface_area();
        Self {
            to_light: to_world.inverse(),
            to_world,
            emit,
            geometry,
            surface_area,
        }
    }

    /// Radiance leaving the surface point with normal `n` toward `w`; black
    /// from the back side.
    pub fn radiance(&self, _p: Point, n: Normal, w: Vector) -> Color {
        if n.dot_vector(w) > 0.0 {
            self.emit
        } else {
            BLACK
        }
    }
}

impl Light for AreaLight {
    fn sample_at(&self, p: Point, u: [f32; 2]) -> LightSampleResult {
        // Sample in light space, where the emitting sphere is canonical
        let p_light = self.to_light.apply_point(p);
        let (ps, normal) = self.geometry.sample_from(p_light, u);
        let w_i_light = (ps - p_light).normalized();
        let pdf = self.geometry.pdf_from(p_light, w_i_light);
        let ps_world = self.to_world.apply_point(ps);
        LightSampleResult {
            radiance: self.radiance(ps, normal, -w_i_light),
            w_i: self.to_world.apply_vector(w_i_light).normalized(),
            pdf,
            occlusion: OcclusionTester::between(p, ps_world),
        }
    }

    fn sample_emit(&self, u_pos: [f32; 2], u_dir: [f32; 2]) -> LightEmitResult {
        let (o, normal) = self.geometry.sample(u_pos);
        let mut d = uniform_sample_sphere(u_dir);
        // Emit out of the surface, not into the sphere
        if d.dot_normal(normal) < 0.0 {
            d *= -1.0;
        }
        let radiance = self.radiance(o, normal, d);
        let ray = Ray::segment(
            self.to_world.apply_point(o),
            self.to_world.apply_vector(d),
            0.001,
            f32::INFINITY,
        );
        LightEmitResult {
            radiance,
            ray,
            normal: self.to_world.apply_normal(normal).normalized(),
            pdf: self.geometry.pdf(o) * INV_TAU,
        }
    }

    fn power(&self) -> Color {
        self.emit * self.surface_area * PI
    }

    fn pdf(&self, p: Point, w_i: Vector) -> f32 {
        self.geometry
            .pdf_from(self.to_light.apply_point(p), self.to_light.apply_vector(w_i))
    }

    fn is_delta(&self) -> bool {
        false
    }

    fn as_area_light(&self) -> Option<&AreaLight> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn one_sided_emission() {
        let light = AreaLight::new(Transform::IDENTITY, Color::broadcast(5.0), 1.0);
        let n = Normal::new(0.0, 0.0, 1.0);
        assert_eq!(
            light.radiance(Point::origin(), n, Vector::new(0.0, 0.0, 1.0)),
            Color::broadcast(5.0)
        );
        assert!(light
            .radiance(Point::origin(), n, Vector::new(0.0, 0.0, -1.0))
            .is_black());
    }

    #[test]
    fn samples_face_the_shading_point() {
        let light = AreaLight::new(
            Transform::translate(Vector::new(0.0, 4.0, 0.0)),
            Color::broadcast(10.0),
            0.5,
        );
        let p = Point::origin();
        let mut rng = SmallRng::seed_from_u64(21);
        for _ in 0..50 {
            let s = light.sample_at(p, [rng.gen(), rng.gen()]);
            assert!(s.pdf > 0.0);
            // Direction heads up toward the light's center
            assert!(s.w_i.y > 0.8);
            assert!(!s.radiance.is_black());
        }
    }

    #[test]
    fn pdf_positive_toward_light() {
        let light = AreaLight::new(
            Transform::translate(Vector::new(0.0, 4.0, 0.0)),
            Color::broadcast(10.0),
            0.5,
        );
        let toward = light.pdf(Point::origin(), Vector::new(0.0, 1.0, 0.0));
        assert!(toward > 0.0);
        // A larger or nearer sphere subtends a wider cone, so its pdf drops
        let bigger = AreaLight::new(
            Transform::translate(Vector::new(0.0, 4.0, 0.0)),
            Color::broadcast(10.0),
            1.5,
        );
        assert!(bigger.pdf(Point::origin(), Vector::new(0.0, 1.0, 0.0)) < toward);
    }

    #[test]
    fn emitted_rays_leave_the_surface() {
        let light = AreaLight::new(Transform::IDENTITY, Color::broadcast(3.0), 1.0);
        let mut rng = SmallRng::seed_from_u64(8);
        for _ in 0..50 {
            let e = light.sample_emit([rng.gen(), rng.gen()], [rng.gen(), rng.gen()]);
            assert!(e.pdf > 0.0);
            assert!(!e.radiance.is_black());
            assert!(e.ray.d.dot_normal(e.normal) >= 0.0);
        }
    }
}
