//! Geometric primitives: object-space intersection, surface sampling for
//! area lights, and the hit record the integrators shade from.

mod bbox;
mod cone;
mod cylinder;
mod disk;
mod mesh;
mod plane;
mod sphere;

pub use bbox::BBox;
pub use cone::Cone;
pub use cylinder::Cylinder;
pub use disk::Disk;
pub use mesh::{load_bobj, save_bobj, TriMesh, TriMeshData, Triangle};
pub use plane::Plane;
pub use sphere::Sphere;

use std::sync::Arc;

use crate::linalg::{solve_linear_2x2, Normal, Point, Ray, RayDifferential, Vector};
use crate::scene::Node;

// ─── Hit record ─────────────────────────────────────────────────────────────

/// Which side of the surface the ray struck, judged against the geometric
/// normal at the hit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HitSide {
    #[default]
    None,
    Front,
    Back,
}

/// The differential geometry of a surface hit: position, shading and
/// geometric normals, the local tangent frame, the (u, v) parameterization,
/// and its screen-space derivatives for texture filtering.
///
/// Geometry fills this in object space; the scene graph transforms it into
/// world space on the way back up. The screen-space derivatives are computed
/// lazily from a ray differential by [`DifferentialGeometry::compute_differentials`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DifferentialGeometry<'a> {
    pub point: Point,
    /// Shading normal (interpolated for meshes, possibly bumped).
    pub normal: Normal,
    /// True surface normal of the underlying geometry.
    pub geom_normal: Normal,
    pub dp_du: Vector,
    pub dp_dv: Vector,
    pub dn_du: Normal,
    pub dn_dv: Normal,
    /// World-space position change per pixel step, from the ray differential.
    pub dp_dx: Vector,
    pub dp_dy: Vector,
    pub u: f32,
    pub v: f32,
    pub du_dx: f32,
    pub dv_dx: f32,
    pub du_dy: f32,
    pub dv_dy: f32,
    pub hit_side: HitSide,
    /// The scene node that was hit, set by the scene graph.
    pub node: Option<&'a Node>,
}

impl<'a> DifferentialGeometry<'a> {
    /// Fills in the screen-space parameterization derivatives by intersecting
    /// the auxiliary rays with the tangent plane at the hit and solving the
    /// resulting 2×2 system for (du/dx, dv/dx) and (du/dy, dv/dy).
    pub fn compute_differentials(&mut self, r: &RayDifferential) {
        if !r.has_differentials() {
            self.dp_dx = Vector::zero();
            self.dp_dy = Vector::zero();
            self.du_dx = 0.0;
            self.dv_dx = 0.0;
            self.du_dy = 0.0;
            self.dv_dy = 0.0;
            return;
        }
        // Intersect rx and ry with the plane through the hit point
        let d = -self.normal.dot_vector(Vector::from(self.point));
        let tx = -(self.normal.dot_vector(Vector::from(r.rx.o)) + d) / self.normal.dot_vector(r.rx.d);
        let px = r.rx.at(tx);
        let ty = -(self.normal.dot_vector(Vector::from(r.ry.o)) + d) / self.normal.dot_vector(r.ry.d);
        let py = r.ry.at(ty);
        self.dp_dx = px - self.point;
        self.dp_dy = py - self.point;

        // Project onto the two axes where the tangent plane is least
        // degenerate to solve for the parameterization derivatives
        let n = self.normal;
        let axes = if n.x.abs() > n.y.abs() && n.x.abs() > n.z.abs() {
            [1, 2]
        } else if n.y.abs() > n.z.abs() {
            [0, 2]
        } else {
            [0, 1]
        };
        let m = [
            self.dp_du[axes[0]],
            self.dp_dv[axes[0]],
            self.dp_du[axes[1]],
            self.dp_dv[axes[1]],
        ];
        let bx = [
            px[axes[0]] - self.point[axes[0]],
            px[axes[1]] - self.point[axes[1]],
        ];
        let by = [
            py[axes[0]] - self.point[axes[0]],
            py[axes[1]] - self.point[axes[1]],
        ];
        (self.du_dx, self.dv_dx) = solve_linear_2x2(m, bx).unwrap_or((0.0, 0.0));
        (self.du_dy, self.dv_dy) = solve_linear_2x2(m, by).unwrap_or((0.0, 0.0));
    }
}

// ─── Geometry trait ─────────────────────────────────────────────────────────

/// A piece of geometry in its own object space.
///
/// `intersect` updates `ray.t_max` to the hit t and fills the hit record only
/// when the hit is closer than the ray's current interval allows; on a miss
/// both are left untouched. The record comes back in object space — the scene
/// graph owns the world-space transformation.
pub trait Geometry: Send + Sync {
    fn intersect(&self, ray: &mut Ray, dg: &mut DifferentialGeometry<'_>) -> bool;

    fn object_bound(&self) -> BBox;

    /// Decomposes into leaf primitives for acceleration structures: meshes
    /// hand out their triangles, analytic shapes hand out themselves.
    fn refine(self: Arc<Self>, prims: &mut Vec<Arc<dyn Geometry>>);

    fn surface_area(&self) -> f32;

    /// Samples a point uniformly over the surface, with its normal.
    /// Only geometry that can carry an area light implements this.
    fn sample(&self, _u: [f32; 2]) -> (Point, Normal) {
        unimplemented!("geometry does not support surface sampling")
    }

    /// Samples the surface as seen from `p`, parameterized by solid angle
    /// where the geometry supports it. Defaults to area sampling.
    fn sample_from(&self, _p: Point, u: [f32; 2]) -> (Point, Normal) {
        self.sample(u)
    }

    /// Pdf of the uniform area sampling at a point on the surface.
    fn pdf(&self, _p: Point) -> f32 {
        1.0 / self.surface_area()
    }

    /// Pdf, with respect to solid angle at `p`, that a ray from `p` along
    /// `w_i` strikes this geometry. The default converts the area pdf at the
    /// hit point using the distance-squared over cosine Jacobian.
    fn pdf_from(&self, p: Point, w_i: Vector) -> f32 {
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
        dist_sqr / (cos * self.surface_area())
    }
}

/// Sets the hit side from the ray direction and geometric normal.
#[inline]
pub(crate) fn classify_hit_side(ray_dir: Vector, normal: Normal) -> HitSide {
    if normal.dot_vector(ray_dir) < 0.0 {
        HitSide::Front
    } else {
        HitSide::Back
    }
}

/// Computes ∂N/∂u and ∂N/∂v from the first and second fundamental forms via
/// the Weingarten equations. `ddp_*` are the second derivatives of the
/// surface position.
pub(crate) fn weingarten_normals(
    dp_du: Vector,
    dp_dv: Vector,
    ddp_duu: Vector,
    ddp_duv: Vector,
    ddp_dvv: Vector,
    normal: Normal,
) -> (Normal, Normal) {
    let e1 = dp_du.dot(dp_du);
    let f1 = dp_du.dot(dp_dv);
    let g1 = dp_dv.dot(dp_dv);
    let e2 = normal.dot_vector(ddp_duu);
    let f2 = normal.dot_vector(ddp_duv);
    let g2 = normal.dot_vector(ddp_dvv);
    let inv = 1.0 / (e1 * g1 - f1 * f1);
    let dn_du = Normal::from(
        dp_du * ((f2 * f1 - e2 * g1) * inv) + dp_dv * ((e2 * f1 - f2 * e1) * inv),
    );
    let dn_dv = Normal::from(
        dp_du * ((g2 * f1 - f2 * g1) * inv) + dp_dv * ((f2 * f1 - g2 * e1) * inv),
    );
    (dn_du, dn_dv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{Ray, RayDifferential};

    #[test]
    fn differentials_on_a_plane() {
        // A hit on the z = 0 plane with unit-length u/v tangents: the ray
        // differentials one pixel apart should produce du/dx ≈ the world
        // distance between the auxiliary hits.
        let mut dg = DifferentialGeometry {
            point: Point::origin(),
            normal: Normal::new(0.0, 0.0, 1.0),
            geom_normal: Normal::new(0.0, 0.0, 1.0),
            dp_du: Vector::new(1.0, 0.0, 0.0),
            dp_dv: Vector::new(0.0, 1.0, 0.0),
            ..Default::default()
        };
        let mut rd = RayDifferential::new(Point::new(0.0, 0.0, 5.0), Vector::new(0.0, 0.0, -1.0));
        rd.rx = Ray::new(Point::new(0.1, 0.0, 5.0), Vector::new(0.0, 0.0, -1.0));
        rd.ry = Ray::new(Point::new(0.0, 0.1, 5.0), Vector::new(0.0, 0.0, -1.0));
        dg.compute_differentials(&rd);
        assert!((dg.du_dx - 0.1).abs() < 1e-5);
        assert!((dg.dv_dy - 0.1).abs() < 1e-5);
        assert!(dg.dv_dx.abs() < 1e-5);
        assert!((dg.dp_dx - Vector::new(0.1, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn no_differentials_zeroes_the_derivatives() {
        let mut dg = DifferentialGeometry {
            du_dx: 9.0,
            dv_dy: 9.0,
            ..Default::default()
        };
        let rd = RayDifferential::new(Point::origin(), Vector::new(0.0, 0.0, 1.0));
        dg.compute_differentials(&rd);
        assert_eq!(dg.du_dx, 0.0);
        assert_eq!(dg.dv_dy, 0.0);
    }
}
