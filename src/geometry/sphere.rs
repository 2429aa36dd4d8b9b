use std::sync::Arc;

use super::{classify_hit_side, weingarten_normals, BBox, DifferentialGeometry, Geometry};
use crate::linalg::{coordinate_system, solve_quadratic, Normal, Point, Ray, Vector, PI, TAU};
use crate::monte_carlo::{uniform_cone_pdf, uniform_sample_cone, uniform_sample_sphere};

// ─── Sphere ─────────────────────────────────────────────────────────────────

/// A sphere of the given radius centered at the object-space origin,
/// parameterized by (φ, θ) spherical coordinates.
pub struct Sphere {
    radius: f32,
}

impl Sphere {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    fn inside(&self, p: Point) -> bool {
        p.distance_squared(Point::origin()) - self.radius * self.radius < 1e-4
    }

    /// Cosine of the cone half-angle the sphere subtends from `p`.
    #[inline]
    fn cone_cos_theta(&self, p: Point) -> f32 {
        (1.0 - self.radius * self.radius / p.distance_squared(Point::origin()))
            .max(0.0)
            .sqrt()
    }
}

impl Geometry for Sphere {
    fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool {
        let orig = Vector::from(ray.o);
        let a = ray.d.length_squared();
        let b = 2.0 * ray.d.dot(orig);
        let c = orig.length_squared() - self.radius * self.radius;
        let Some((t0, t1)) = solve_quadratic(a, b, c) else {
            return false;
        };
        if t0 > ray.t_max || t1 < ray.t_min {
            return false;
        }
        let mut t_hit = t0;
        if t_hit < ray.t_min {
            t_hit = t1;
            if t_hit > ray.t_max {
                return false;
            }
        }
        ray.t_max = t_hit;
        dg.point = ray.at(t_hit);
        // For a sphere about the origin the normal is the hit point itself
        dg.normal = Normal::new(dg.point.x, dg.point.y, dg.point.z).normalized();
        dg.geom_normal = dg.normal;
        dg.hit_side = classify_hit_side(ray.d, dg.normal);

        let mut phi = dg.point.y.atan2(dg.point.x);
        if phi < 0.0 {
            phi += TAU;
        }
        let theta = (dg.point.z / self.radius).clamp(-1.0, 1.0).acos();
        dg.u = phi / TAU;
        dg.v = theta / PI;

        // Position derivatives, using the hit point itself to avoid extra
        // trig evaluations
        let z_radius = (dg.point.x * dg.point.x + dg.point.y * dg.point.y).sqrt();
        let (cos_phi, sin_phi) = if z_radius > 0.0 {
            (dg.point.x / z_radius, dg.point.y / z_radius)
        } else {
            (1.0, 0.0)
        };
        dg.dp_du = Vector::new(-TAU * dg.point.y, TAU * dg.point.x, 0.0);
        dg.dp_dv = Vector::new(
            dg.point.z * cos_phi,
            dg.point.z * sin_phi,
            -self.radius * theta.sin(),
        ) * PI;

        let ddp_duu = Vector::new(dg.point.x, dg.point.y, 0.0) * (-TAU * TAU);
        let ddp_duv = Vector::new(-sin_phi, cos_phi, 0.0) * (PI * TAU * dg.point.z);
        let ddp_dvv = Vector::new(dg.point.x, dg.point.y, dg.point.z) * (-PI * PI);
        (dg.dn_du, dg.dn_dv) =
            weingarten_normals(dg.dp_du, dg.dp_dv, ddp_duu, ddp_duv, ddp_dvv, dg.normal);
        true
    }

    fn object_bound(&self) -> BBox {
        BBox::new(
            Point::new(-self.radius, -self.radius, -self.radius),
            Point::new(self.radius, self.radius, self.radius),
        )
    }

    fn refine(self: Arc<Self>, prims: &mut Vec<Arc<dyn Geometry>>) {
        prims.push(self);
    }

    fn surface_area(&self) -> f32 {
        2.0 * TAU * self.radius * self.radius
    }

    fn sample(&self, u: [f32; 2]) -> (Point, Normal) {
        let p = Point::origin() + uniform_sample_sphere(u) * self.radius;
        (p, Normal::new(p.x, p.y, p.z).normalized())
    }

    /// Samples the cone of directions the sphere subtends from `p`, the
    /// solid-angle parameterization that keeps area-light estimates from
    /// wasting samples on the sphere's far side. Inside the sphere this
    /// degenerates to uniform area sampling.
    fn sample_from(&self, p: Point, u: [f32; 2]) -> (Point, Normal) {
        if self.inside(p) {
            return self.sample(u);
        }
        let w_z = Vector::from(-p).normalized();
        let (w_x, w_y) = coordinate_system(w_z);
        let cos_theta = self.cone_cos_theta(p);
        let mut ray = Ray::segment(
            p,
            uniform_sample_cone(u, cos_theta, w_x, w_y, w_z),
            0.001,
            f32::INFINITY,
        );
        let mut dg = DifferentialGeometry::default();
        if !self.intersect(&mut ray, &mut dg) {
            // Grazing cone samples can skim past; fall back to the point
            // closest to the center along the ray
            ray.t_max = ray.d.normalized().dot(Point::origin() - p);
        }
        let ps = ray.at(ray.t_max);
        (ps, Normal::new(ps.x, ps.y, ps.z).normalized())
    }

    fn pdf_from(&self, p: Point, w_i: Vector) -> f32 {
        if self.inside(p) {
            // Fall back to the generic area-to-solid-angle conversion
            let mut ray = Ray::segment(p, w_i, 0.001, f32::INFINITY);
            let mut dg = DifferentialGeometry::default();
            if !self.intersect(&mut ray, &mut dg) {
                return 0.0;
            }
            let dist_sqr = p.distance_squared(dg.point);
            let cos = dg.normal.dot_vector(-w_i).abs();
            if cos == 0.0 {
                return 0.0;
            }
            return dist_sqr / (cos * self.surface_area());
        }
        uniform_cone_pdf(self.cone_cos_theta(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersects_and_clips_t_max() {
        let s = Sphere::new(1.0);
        let mut ray = Ray::new(Point::new(0.0, 0.0, -4.0), Vector::new(0.0, 0.0, 1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(s.intersect(&mut ray, &mut dg));
        assert!((ray.t_max - 3.0).abs() < 1e-4);
        assert_eq!(dg.hit_side, super::super::HitSide::Front);
        assert!((dg.normal.dot_vector(Vector::new(0.0, 0.0, -1.0)) - 1.0).abs() < 1e-4);

        // A second intersection attempt against the now-shortened ray fails
        let mut dg2 = DifferentialGeometry::default();
        let before = ray.t_max;
        assert!(s.intersect(&mut ray, &mut dg2));
        assert!(ray.t_max <= before);
    }

    #[test]
    fn miss_leaves_ray_untouched() {
        let s = Sphere::new(1.0);
        let mut ray = Ray::new(Point::new(0.0, 5.0, -4.0), Vector::new(0.0, 0.0, 1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(!s.intersect(&mut ray, &mut dg));
        assert_eq!(ray.t_max, f32::INFINITY);
    }

    #[test]
    fn inside_hit_reports_back_side() {
        let s = Sphere::new(1.0);
        let mut ray = Ray::new(Point::origin(), Vector::new(1.0, 0.0, 0.0));
        let mut dg = DifferentialGeometry::default();
        assert!(s.intersect(&mut ray, &mut dg));
        assert_eq!(dg.hit_side, super::super::HitSide::Back);
    }

    #[test]
    fn surface_area_formula() {
        let s = Sphere::new(2.0);
        assert!((s.surface_area() - 4.0 * PI * 4.0).abs() < 1e-3);
    }

    #[test]
    fn samples_lie_on_surface() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};
        let s = Sphere::new(1.5);
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..50 {
            let (p, n) = s.sample([rng.gen(), rng.gen()]);
            assert!((Vector::from(p).length() - 1.5).abs() < 1e-4);
            assert!((n.length() - 1.0).abs() < 1e-4);
        }
        let from = Point::new(0.0, 0.0, 5.0);
        for _ in 0..50 {
            let (p, _) = s.sample_from(from, [rng.gen(), rng.gen()]);
            assert!((Vector::from(p).length() - 1.5).abs() < 1e-3);
            // Solid-angle sampling only returns points facing the querier
            assert!(s.pdf_from(from, (p - from).normalized()) > 0.0);
        }
    }

    #[test]
    fn tangents_are_orthogonal_to_normal() {
        let s = Sphere::new(1.0);
        let mut ray = Ray::new(Point::new(0.3, -0.2, -4.0), Vector::new(0.0, 0.0, 1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(s.intersect(&mut ray, &mut dg));
        assert!(dg.normal.dot_vector(dg.dp_du).abs() < 1e-3);
        assert!(dg.normal.dot_vector(dg.dp_dv).abs() < 1e-3);
    }
}
