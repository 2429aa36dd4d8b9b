use std::sync::Arc;

use super::{classify_hit_side, BBox, DifferentialGeometry, Geometry};
use crate::linalg::{Normal, Point, Ray, Vector, PI, TAU};
use crate::monte_carlo::concentric_sample_disk;

// ─── Disk ───────────────────────────────────────────────────────────────────

/// An annular disk in the z = 0 plane, between `inner_radius` and `radius`.
pub struct Disk {
    radius: f32,
    inner_radius: f32,
}

impl Disk {
    pub fn new(radius: f32, inner_radius: f32) -> Self {
        Self {
            radius,
            inner_radius,
        }
    }
}

impl Geometry for Disk {
    fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool {
        // Intersect the embedding plane, then test the annulus bounds
        if ray.d.z.abs() < 1e-7 {
            return false;
        }
        let t = -ray.o.z / ray.d.z;
        if t < ray.t_min || t > ray.t_max {
            return false;
        }
        let hit = ray.at(t);
        let dist_sqr = hit.x * hit.x + hit.y * hit.y;
        if dist_sqr > self.radius * self.radius
            || dist_sqr < self.inner_radius * self.inner_radius
        {
            return false;
        }
        let mut phi = hit.y.atan2(hit.x);
        if phi < 0.0 {
            phi += TAU;
        }
        ray.t_max = t;
        dg.point = hit;
        dg.u = phi / TAU;
        dg.v = 1.0 - (dist_sqr.sqrt() - self.inner_radius) / (self.radius - self.inner_radius);
        let inv_z = if 1.0 - dg.v > 0.0 { 1.0 / (1.0 - dg.v) } else { 0.0 };
        dg.dp_du = Vector::new(-TAU * hit.y, TAU * hit.x, 0.0);
        dg.dp_dv = Vector::new(-hit.x * inv_z, -hit.y * inv_z, 0.0)
            * ((self.radius - self.inner_radius) / self.radius);
        dg.normal = Normal::new(0.0, 0.0, 1.0);
        dg.geom_normal = dg.normal;
        dg.dn_du = Normal::default();
        dg.dn_dv = Normal::default();
        dg.hit_side = classify_hit_side(ray.d, dg.normal);
        true
    }

    fn object_bound(&self) -> BBox {
        BBox::new(
            Point::new(-self.radius, -self.radius, 0.0),
            Point::new(self.radius, self.radius, 0.0),
        )
    }

    fn refine(self: Arc<Self>, prims: &mut Vec<Arc<dyn Geometry>>) {
        prims.push(self);
    }

    fn surface_area(&self) -> f32 {
        PI * (self.radius * self.radius - self.inner_radius * self.inner_radius)
    }

    fn sample(&self, u: [f32; 2]) -> (Point, Normal) {
        let disk = concentric_sample_disk(u);
        (
            Point::new(disk[0] * self.radius, disk[1] * self.radius, 0.0),
            Normal::new(0.0, 0.0, 1.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_inside_annulus_only() {
        let d = Disk::new(2.0, 0.5);
        let down = Vector::new(0.0, 0.0, -1.0);
        let mut dg = DifferentialGeometry::default();

        let mut hit = Ray::new(Point::new(1.0, 0.0, 3.0), down);
        assert!(d.intersect(&mut hit, &mut dg));
        assert!((hit.t_max - 3.0).abs() < 1e-5);

        let mut hole = Ray::new(Point::new(0.1, 0.0, 3.0), down);
        assert!(!d.intersect(&mut hole, &mut dg));

        let mut outside = Ray::new(Point::new(3.0, 0.0, 3.0), down);
        assert!(!d.intersect(&mut outside, &mut dg));
    }

    #[test]
    fn parallel_ray_misses() {
        let d = Disk::new(1.0, 0.0);
        let mut ray = Ray::new(Point::new(-5.0, 0.0, 0.0), Vector::new(1.0, 0.0, 0.0));
        let mut dg = DifferentialGeometry::default();
        assert!(!d.intersect(&mut ray, &mut dg));
    }

    #[test]
    fn area_of_annulus() {
        let d = Disk::new(2.0, 1.0);
        assert!((d.surface_area() - PI * 3.0).abs() < 1e-4);
    }
}
