use std::sync::Arc;

use super::{classify_hit_side, weingarten_normals, BBox, DifferentialGeometry, Geometry};
use crate::linalg::{lerp, solve_quadratic, Normal, Point, Ray, Vector, TAU};

// ─── Cylinder ───────────────────────────────────────────────────────────────

/// An open cylinder about the z axis, spanning `z ∈ [0, height]`.
pub struct Cylinder {
    radius: f32,
    height: f32,
}

impl Cylinder {
    pub fn new(radius: f32, height: f32) -> Self {
        Self { radius, height }
    }
}

impl Geometry for Cylinder {
    fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool {
        let a = ray.d.x * ray.d.x + ray.d.y * ray.d.y;
        let b = 2.0 * (ray.d.x * ray.o.x + ray.d.y * ray.o.y);
        let c = ray.o.x * ray.o.x + ray.o.y * ray.o.y - self.radius * self.radius;
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
        // The quadratic treats the cylinder as infinite; reject hits outside
        // the height extents, retrying with the far root once
        let mut point = ray.at(t_hit);
        if point.z < 0.0 || point.z > self.height {
            if t_hit == t1 {
                return false;
            }
            t_hit = t1;
            if t_hit > ray.t_max {
                return false;
            }
            point = ray.at(t_hit);
            if point.z < 0.0 || point.z > self.height {
                return false;
            }
        }
        let mut phi = point.y.atan2(point.x);
        if phi < 0.0 {
            phi += TAU;
        }
        ray.t_max = t_hit;
        dg.point = point;
        dg.u = phi / TAU;
        dg.v = point.z / self.height;
        dg.dp_du = Vector::new(-TAU * point.y, TAU * point.x, 0.0);
        dg.dp_dv = Vector::new(0.0, 0.0, self.height);
        dg.normal = Normal::new(point.x, point.y, 0.0).normalized();
        dg.geom_normal = dg.normal;
        dg.hit_side = classify_hit_side(ray.d, dg.normal);

        let ddp_duu = Vector::new(point.x, point.y, 0.0) * (-TAU * TAU);
        (dg.dn_du, dg.dn_dv) = weingarten_normals(
            dg.dp_du,
            dg.dp_dv,
            ddp_duu,
            Vector::zero(),
            Vector::zero(),
            dg.normal,
        );
        true
    }

    fn object_bound(&self) -> BBox {
        BBox::new(
            Point::new(-self.radius, -self.radius, 0.0),
            Point::new(self.radius, self.radius, self.height),
        )
    }

    fn refine(self: Arc<Self>, prims: &mut Vec<Arc<dyn Geometry>>) {
        prims.push(self);
    }

    fn surface_area(&self) -> f32 {
        self.height * TAU * self.radius
    }

    fn sample(&self, u: [f32; 2]) -> (Point, Normal) {
        let z = lerp(u[0], 0.0, self.height);
        let phi = u[1] * TAU;
        let p = Point::new(self.radius * phi.cos(), self.radius * phi.sin(), z);
        (p, Normal::new(p.x, p.y, 0.0).normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_hit() {
        let c = Cylinder::new(1.0, 2.0);
        let mut ray = Ray::new(Point::new(-5.0, 0.0, 1.0), Vector::new(1.0, 0.0, 0.0));
        let mut dg = DifferentialGeometry::default();
        assert!(c.intersect(&mut ray, &mut dg));
        assert!((ray.t_max - 4.0).abs() < 1e-4);
        assert!((dg.normal.dot_vector(Vector::new(-1.0, 0.0, 0.0)) - 1.0).abs() < 1e-4);
        assert!((dg.v - 0.5).abs() < 1e-5);
    }

    #[test]
    fn clipped_beyond_height() {
        let c = Cylinder::new(1.0, 2.0);
        let mut ray = Ray::new(Point::new(-5.0, 0.0, 3.0), Vector::new(1.0, 0.0, 0.0));
        let mut dg = DifferentialGeometry::default();
        assert!(!c.intersect(&mut ray, &mut dg));
    }

    #[test]
    fn ray_through_open_end_hits_far_wall() {
        // Entering through the open top cap: the near root lies outside the
        // z range but the far root is a valid wall hit from the inside
        let c = Cylinder::new(1.0, 2.0);
        let mut ray = Ray::new(Point::new(0.5, 0.0, 5.0), Vector::new(0.1, 0.0, -1.0).normalized());
        let mut dg = DifferentialGeometry::default();
        assert!(c.intersect(&mut ray, &mut dg));
        assert!(dg.point.z >= 0.0 && dg.point.z <= 2.0);
    }
}
