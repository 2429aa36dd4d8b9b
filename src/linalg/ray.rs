use super::{Point, Vector};

// ─── Ray ────────────────────────────────────────────────────────────────────

/// A parametric ray `R(t) = o + t·d` with a live parameter range.
///
/// Intersection routines shrink `t_max` monotonically: a successful hit sets
/// `t_max = t_hit`, so later tests against the same ray are automatically
/// clipped to "must be closer". `depth` tracks recursion for the integrators
/// and `time` supports motion-blurred sampling.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub o: Point,
    pub d: Vector,
    pub t_min: f32,
    pub t_max: f32,
    pub depth: u32,
    pub time: f32,
}

impl Ray {
    #[inline]
    pub fn new(o: Point, d: Vector) -> Self {
        Self {
            o,
            d,
            t_min: 0.0,
            t_max: f32::INFINITY,
            depth: 0,
            time: 0.0,
        }
    }

    #[inline]
    pub fn segment(o: Point, d: Vector, t_min: f32, t_max: f32) -> Self {
        Self {
            o,
            d,
            t_min,
            t_max,
            depth: 0,
            time: 0.0,
        }
    }

    /// Spawns a child ray from a parent, inheriting its time and increasing
    /// the recursion depth.
    #[inline]
    pub fn child(o: Point, d: Vector, parent: &Ray, t_min: f32) -> Self {
        Self {
            o,
            d,
            t_min,
            t_max: f32::INFINITY,
            depth: parent.depth + 1,
            time: parent.time,
        }
    }

    /// Evaluates the ray at parameter t.
    #[inline(always)]
    pub fn at(&self, t: f32) -> Point {
        self.o + self.d * t
    }
}

// ─── RayDifferential ────────────────────────────────────────────────────────

/// A ray plus the two camera rays for the neighboring pixels in x and y,
/// used to estimate texture filter footprints at hit points.
#[derive(Debug, Clone, Copy)]
pub struct RayDifferential {
    pub ray: Ray,
    pub rx: Ray,
    pub ry: Ray,
}

impl RayDifferential {
    #[inline]
    pub fn new(o: Point, d: Vector) -> Self {
        let ray = Ray::new(o, d);
        Self {
            ray,
            rx: Ray::new(o, Vector::zero()),
            ry: Ray::new(o, Vector::zero()),
        }
    }

    #[inline]
    pub fn child(o: Point, d: Vector, parent: &Ray, t_min: f32) -> Self {
        let ray = Ray::child(o, d, parent, t_min);
        Self {
            ray,
            rx: Ray::new(o, Vector::zero()),
            ry: Ray::new(o, Vector::zero()),
        }
    }

    /// Whether the auxiliary rays were ever initialized. Uninitialized
    /// differentials have zero directions.
    #[inline]
    pub fn has_differentials(&self) -> bool {
        self.rx.d.length_squared() > 0.0 && self.ry.d.length_squared() > 0.0
    }

    /// Widens or narrows the differential footprint by `s`, e.g. when one
    /// camera sample stands in for several.
    pub fn scale_differentials(&mut self, s: f32) {
        self.rx.o = self.ray.o + (self.rx.o - self.ray.o) * s;
        self.ry.o = self.ray.o + (self.ry.o - self.ray.o) * s;
        self.rx.d = self.ray.d + (self.rx.d - self.ray.d) * s;
        self.ry.d = self.ray.d + (self.ry.d - self.ray.d) * s;
    }
}

impl From<Ray> for RayDifferential {
    #[inline]
    fn from(ray: Ray) -> Self {
        Self {
            ray,
            rx: Ray::new(ray.o, Vector::zero()),
            ry: Ray::new(ray.o, Vector::zero()),
        }
    }
}

impl std::ops::Deref for RayDifferential {
    type Target = Ray;
    #[inline(always)]
    fn deref(&self) -> &Ray {
        &self.ray
    }
}

impl std::ops::DerefMut for RayDifferential {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Ray {
        &mut self.ray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation() {
        let r = Ray::new(Point::new(1.0, 0.0, 0.0), Vector::new(0.0, 2.0, 0.0));
        assert_eq!(r.at(0.5), Point::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn child_inherits_depth_and_time() {
        let mut parent = Ray::new(Point::origin(), Vector::new(0.0, 0.0, 1.0));
        parent.time = 0.25;
        let c = Ray::child(Point::origin(), Vector::new(1.0, 0.0, 0.0), &parent, 0.001);
        assert_eq!(c.depth, 1);
        assert_eq!(c.time, 0.25);
        assert_eq!(c.t_min, 0.001);
    }

    #[test]
    fn differentials_flag() {
        let mut rd = RayDifferential::new(Point::origin(), Vector::new(0.0, 0.0, 1.0));
        assert!(!rd.has_differentials());
        rd.rx = Ray::new(Point::origin(), Vector::new(0.01, 0.0, 1.0));
        rd.ry = Ray::new(Point::origin(), Vector::new(0.0, 0.01, 1.0));
        assert!(rd.has_differentials());
    }

    #[test]
    fn scaling_shrinks_the_footprint() {
        let mut rd = RayDifferential::new(Point::origin(), Vector::new(0.0, 0.0, 1.0));
        rd.rx = Ray::new(Point::new(0.2, 0.0, 0.0), Vector::new(0.1, 0.0, 1.0));
        rd.ry = Ray::new(Point::new(0.0, 0.2, 0.0), Vector::new(0.0, 0.1, 1.0));
        rd.scale_differentials(0.5);
        assert!((rd.rx.o - Point::new(0.1, 0.0, 0.0)).length() < 1e-6);
        assert!((rd.rx.d - Vector::new(0.05, 0.0, 1.0)).length() < 1e-6);
    }
}
