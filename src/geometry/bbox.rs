use std::fmt;
use std::ops::Index;

use crate::linalg::{lerp, Axis, Point, Ray, Vector};

// ─── Axis-aligned bounding box ──────────────────────────────────────────────

/// An axis-aligned bounding box.
///
/// The default box is *empty* (min = +∞, max = −∞) so that unioning starts
/// from the identity: `empty ∪ b == b` for any box or point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min: Point::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    #[inline]
    pub const fn from_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    /// Builds the box spanning two corners, in any order.
    #[inline]
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn union(&self, b: &BBox) -> Self {
        Self {
            min: Point::new(
                self.min.x.min(b.min.x),
                self.min.y.min(b.min.y),
                self.min.z.min(b.min.z),
            ),
            max: Point::new(
                self.max.x.max(b.max.x),
                self.max.y.max(b.max.y),
                self.max.z.max(b.max.z),
            ),
        }
    }

    pub fn union_point(&self, p: Point) -> Self {
        Self {
            min: Point::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Point::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn inside(&self, p: Point) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn surface_area(&self) -> f32 {
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    pub fn volume(&self) -> f32 {
        let d = self.max - self.min;
        d.x * d.y * d.z
    }

    /// The longest axis, used as the BVH split dimension.
    pub fn max_extent(&self) -> Axis {
        let d = self.max - self.min;
        if d.x > d.y && d.x > d.z {
            Axis::X
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Blends between the corners to produce a point inside the box.
    pub fn lerp(&self, tx: f32, ty: f32, tz: f32) -> Point {
        Point::new(
            lerp(tx, self.min.x, self.max.x),
            lerp(ty, self.min.y, self.max.y),
            lerp(tz, self.min.z, self.max.z),
        )
    }

    /// The position of `p` relative to the box with min at the origin,
    /// mapped to [0,1]³. Used for SAH bucketing.
    pub fn offset(&self, p: Point) -> Vector {
        Vector::new(
            (p.x - self.min.x) / (self.max.x - self.min.x),
            (p.y - self.min.y) / (self.max.y - self.min.y),
            (p.z - self.min.z) / (self.max.z - self.min.z),
        )
    }

    /// Corner `i` of 8, with bit 0 selecting max-x, bit 1 max-y, bit 2 max-z.
    pub fn corner(&self, i: usize) -> Point {
        Point::new(
            self[i & 1].x,
            self[(i >> 1) & 1].y,
            self[(i >> 2) & 1].z,
        )
    }

    /// Slab test against the ray's live `[t_min, t_max]` interval. Returns
    /// the parametric overlap `(t_enter, t_exit)` clipped to that interval;
    /// zero direction components produce ±∞ slabs that behave correctly.
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32)> {
        let mut t0 = ray.t_min;
        let mut t1 = ray.t_max;
        for i in 0..3 {
            let inv = 1.0 / ray.d[i];
            let mut t_near = (self.min[i] - ray.o[i]) * inv;
            let mut t_far = (self.max[i] - ray.o[i]) * inv;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            t0 = if t_near > t0 { t_near } else { t0 };
            t1 = if t_far < t1 { t_far } else { t1 };
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// The specialized traversal test with precomputed reciprocal direction
    /// and sign flags: `bounds[neg_dir[i]]` is the near slab on each axis, so
    /// no per-axis swap is needed.
    pub fn fast_intersect(&self, ray: &Ray, inv_dir: Vector, neg_dir: [usize; 3]) -> bool {
        let mut t_min = (self[neg_dir[0]].x - ray.o.x) * inv_dir.x;
        let mut t_max = (self[1 - neg_dir[0]].x - ray.o.x) * inv_dir.x;
        let ty_min = (self[neg_dir[1]].y - ray.o.y) * inv_dir.y;
        let ty_max = (self[1 - neg_dir[1]].y - ray.o.y) * inv_dir.y;
        if t_min > ty_max || ty_min > t_max {
            return false;
        }
        t_min = t_min.max(ty_min);
        t_max = t_max.min(ty_max);
        let tz_min = (self[neg_dir[2]].z - ray.o.z) * inv_dir.z;
        let tz_max = (self[1 - neg_dir[2]].z - ray.o.z) * inv_dir.z;
        if t_min > tz_max || tz_min > t_max {
            return false;
        }
        t_min = t_min.max(tz_min);
        t_max = t_max.min(tz_max);
        t_min <= ray.t_max && t_max >= ray.t_min
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl Index<usize> for BBox {
    type Output = Point;
    #[inline(always)]
    fn index(&self, i: usize) -> &Point {
        if i == 0 {
            &self.min
        } else {
            &self.max
        }
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bbox {{ min = {}, max = {} }}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_is_union_identity() {
        let b = BBox::new(Point::new(-1.0, 0.0, 2.0), Point::new(1.0, 3.0, 5.0));
        assert_eq!(BBox::empty().union(&b), b);
        assert_eq!(
            BBox::empty().union_point(Point::new(1.0, 2.0, 3.0)),
            BBox::from_point(Point::new(1.0, 2.0, 3.0))
        );
    }

    #[test]
    fn union_grows_surface_area() {
        let a = BBox::new(Point::origin(), Point::new(1.0, 1.0, 1.0));
        let b = BBox::new(Point::new(2.0, 0.0, 0.0), Point::new(3.0, 1.0, 1.0));
        let u = a.union(&b);
        assert!(u.surface_area() >= a.surface_area());
        assert!(u.surface_area() >= b.surface_area());
    }

    #[test]
    fn slab_test_hits_and_misses() {
        let b = BBox::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let hit = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        let (t0, t1) = b.intersect(&hit).unwrap();
        assert!((t0 - 4.0).abs() < 1e-5);
        assert!((t1 - 6.0).abs() < 1e-5);
        let miss = Ray::new(Point::new(0.0, 5.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        assert!(b.intersect(&miss).is_none());
    }

    #[test]
    fn slab_test_respects_ray_interval() {
        let b = BBox::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        let mut r = Ray::new(Point::new(0.0, 0.0, -5.0), Vector::new(0.0, 0.0, 1.0));
        r.t_max = 2.0;
        assert!(b.intersect(&r).is_none());
    }

    #[test]
    fn axis_aligned_ray_with_zero_components() {
        let b = BBox::new(Point::new(-1.0, -1.0, -1.0), Point::new(1.0, 1.0, 1.0));
        // Direction has zero x and y; the 1/0 slabs are infinite and must
        // not reject the hit
        let r = Ray::new(Point::new(0.5, 0.5, -3.0), Vector::new(0.0, 0.0, 1.0));
        assert!(b.intersect(&r).is_some());
    }

    #[test]
    fn fast_intersect_agrees_with_slab_test() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};
        let b = BBox::new(Point::new(-1.0, -2.0, -0.5), Point::new(2.0, 1.0, 1.5));
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..500 {
            let o = Point::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
            let d = Vector::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if d.length_squared() < 1e-6 {
                continue;
            }
            let ray = Ray::new(o, d);
            let inv_dir = Vector::new(1.0 / d.x, 1.0 / d.y, 1.0 / d.z);
            let neg_dir = [
                (inv_dir.x < 0.0) as usize,
                (inv_dir.y < 0.0) as usize,
                (inv_dir.z < 0.0) as usize,
            ];
            assert_eq!(
                b.intersect(&ray).is_some(),
                b.fast_intersect(&ray, inv_dir, neg_dir),
                "disagreement for ray {o} -> {d}"
            );
        }
    }

    #[test]
    fn corners_and_offset() {
        let b = BBox::new(Point::origin(), Point::new(2.0, 4.0, 6.0));
        assert_eq!(b.corner(0), Point::origin());
        assert_eq!(b.corner(7), Point::new(2.0, 4.0, 6.0));
        let off = b.offset(Point::new(1.0, 1.0, 3.0));
        assert_eq!(off, Vector::new(0.5, 0.25, 0.5));
        assert_eq!(b.max_extent(), Axis::Z);
    }
}
