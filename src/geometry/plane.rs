use std::sync::Arc;

use super::{classify_hit_side, BBox, DifferentialGeometry, Geometry};
use crate::linalg::{Normal, Point, Ray, Vector, TAU};

// ─── Plane ──────────────────────────────────────────────────────────────────

/// The unit square `[-1, 1]²` in the z = 0 plane with normal +z. Scale it
/// through a node transform to make walls and floors.
pub struct Plane;

impl Plane {
    pub fn new() -> Self {
        Plane
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::new()
    }
}

impl Geometry for Plane {
    fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool {
        if ray.d.z.abs() < 1e-8 {
            return false;
        }
        let t = -ray.o.z / ray.d.z;
        if t <= ray.t_min || t >= ray.t_max {
            return false;
        }
        let hit = ray.at(t);
        if hit.x < -1.0 || hit.x > 1.0 || hit.y < -1.0 || hit.y > 1.0 {
            return false;
        }
        let mut phi = hit.y.atan2(hit.x);
        if phi < 0.0 {
            phi += TAU;
        }
        ray.t_max = t;
        dg.point = hit;
        dg.normal = Normal::new(0.0, 0.0, 1.0);
        dg.geom_normal = dg.normal;
        dg.u = (hit.x + 1.0) / 2.0;
        dg.v = (hit.y + 1.0) / 2.0;
        dg.dp_du = Vector::new(2.0, 0.0, 0.0);
        dg.dp_dv = Vector::new(0.0, 2.0, 0.0);
        dg.dn_du = Normal::default();
        dg.dn_dv = Normal::default();
        dg.hit_side = classify_hit_side(ray.d, dg.normal);
        true
    }

    fn object_bound(&self) -> BBox {
        BBox::new(Point::new(-1.0, -1.0, 0.0), Point::new(1.0, 1.0, 0.0))
    }

    fn refine(self: Arc<Self>, prims: &mut Vec<Arc<dyn Geometry>>) {
        prims.push(self);
    }

    fn surface_area(&self) -> f32 {
        4.0
    }

    fn sample(&self, u: [f32; 2]) -> (Point, Normal) {
        (
            Point::new(2.0 * u[0] - 1.0, 2.0 * u[1] - 1.0, 0.0),
            Normal::new(0.0, 0.0, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_and_uv() {
        let p = Plane::new();
        let mut ray = Ray::new(Point::new(0.5, -0.5, 2.0), Vector::new(0.0, 0.0, -1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(p.intersect(&mut ray, &mut dg));
        assert!((ray.t_max - 2.0).abs() < 1e-5);
        assert!((dg.u - 0.75).abs() < 1e-5);
        assert!((dg.v - 0.25).abs() < 1e-5);
    }

    #[test]
    fn outside_extent_misses() {
        let p = Plane::new();
        let mut ray = Ray::new(Point::new(1.5, 0.0, 2.0), Vector::new(0.0, 0.0, -1.0));
        let mut dg = DifferentialGeometry::default();
        assert!(!p.intersect(&mut ray, &mut dg));
    }
}
