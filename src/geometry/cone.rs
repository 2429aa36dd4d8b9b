use std::sync::Arc;

use super::{classify_hit_side, weingarten_normals, BBox, DifferentialGeometry, Geometry};
use crate::linalg::{solve_quadratic, Normal, Point, Ray, Vector, PI, TAU};

// ─── Cone ───────────────────────────────────────────────────────────────────

/// A cone with its base circle of `radius` in the z = 0 plane and apex at
/// `(0, 0, height)`.
pub struct Cone {
    radius: f32,
    height: f32,
}

impl Cone {
    pub fn new(radius: f32, height: f32) -> Self {
        Self { radius, height }
    }
}

impl Geometry for Cone {
    fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool {
        let k = {
            let k = self.radius / self.height;
            k * k
        };
        let a = ray.d.x * ray.d.x + ray.d.y * ray.d.y - k * ray.d.z * ray.d.z;
        let b = 2.0
            * (ray.d.x * ray.o.x + ray.d.y * ray.o.y - k * ray.d.z * (ray.o.z - self.height));
        let c = ray.o.x * ray.o.x + ray.o.y * ray.o.y
            - k * (ray.o.z - self.height) * (ray.o.z - self.height);
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
        // The quadratic covers the double cone; reject hits outside [0, height]
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
        dg.dp_dv = Vector::new(
            -point.x / (1.0 - dg.v),
            -point.y / (1.0 - dg.v),
            self.height,
        );
        dg.normal = Normal::from(dg.dp_du.cross(dg.dp_dv).normalized());
        dg.geom_normal = dg.normal;
        dg.hit_side = classify_hit_side(ray.d, dg.normal);

        let ddp_duu = Vector::new(point.x, point.y, 0.0) * (-TAU * TAU);
        let ddp_duv = Vector::new(point.y, -point.x, 0.0) * (TAU / (1.0 - dg.v));
        (dg.dn_du, dg.dn_dv) = weingarten_normals(
            dg.dp_du,
            dg.dp_dv,
            ddp_duu,
            ddp_duv,
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
        PI * self.radius * (self.height * self.height + self.radius * self.radius).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_the_slanted_wall() {
        let c = Cone::new(1.0, 2.0);
        let mut ray = Ray::new(Point::new(-5.0, 0.0, 0.5), Vector::new(1.0, 0.0, 0.0));
        let mut dg = DifferentialGeometry::default();
        assert!(c.intersect(&mut ray, &mut dg));
        // At z = 0.5 the cone's radius is 1 - 0.5/2 = 0.75
        assert!((dg.point.x + 0.75).abs() < 1e-3);
        // The outward normal leans away from the axis
        assert!(dg.normal.x < 0.0);
    }

    #[test]
    fn misses_above_apex() {
        let c = Cone::new(1.0, 2.0);
        let mut ray = Ray::new(Point::new(-5.0, 0.0, 2.5), Vector::new(1.0, 0.0, 0.0));
        let mut dg = DifferentialGeometry::default();
        assert!(!c.intersect(&mut ray, &mut dg));
    }
}
