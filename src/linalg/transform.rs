use super::{Matrix4, Normal, Point, Ray, RayDifferential, Vector};
use crate::geometry::{BBox, DifferentialGeometry};

/// An affine (or projective) transformation that stores both its matrix and
/// the inverse so the inverse never has to be recomputed on the hot path.
///
/// Application follows the semantic rules of each geometric type: points get
/// the full affine transform, vectors only the linear part, and normals the
/// inverse transpose of the linear part.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Transform {
    pub mat: Matrix4,
    pub inv: Matrix4,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        mat: Matrix4::IDENTITY,
        inv: Matrix4::IDENTITY,
    };

    pub fn from_matrix(mat: Matrix4) -> Self {
        Self {
            inv: mat.inverse(),
            mat,
        }
    }

    pub const fn from_pair(mat: Matrix4, inv: Matrix4) -> Self {
        Self { mat, inv }
    }

    pub fn translate(v: Vector) -> Self {
        Self::from_pair(
            Matrix4::new([
                1.0, 0.0, 0.0, v.x,
                0.0, 1.0, 0.0, v.y,
                0.0, 0.0, 1.0, v.z,
                0.0, 0.0, 0.0, 1.0,
            ]),
            Matrix4::new([
                1.0, 0.0, 0.0, -v.x,
                0.0, 1.0, 0.0, -v.y,
                0.0, 0.0, 1.0, -v.z,
                0.0, 0.0, 0.0, 1.0,
            ]),
        )
    }

    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        Self::from_pair(
            Matrix4::new([
                x, 0.0, 0.0, 0.0,
                0.0, y, 0.0, 0.0,
                0.0, 0.0, z, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ]),
            Matrix4::new([
                1.0 / x, 0.0, 0.0, 0.0,
                0.0, 1.0 / y, 0.0, 0.0,
                0.0, 0.0, 1.0 / z, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ]),
        )
    }

    pub fn rotate_x(deg: f32) -> Self {
        let (s, c) = deg.to_radians().sin_cos();
        let m = Matrix4::new([
            1.0, 0.0, 0.0, 0.0,
            0.0, c, -s, 0.0,
            0.0, s, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]);
        Self::from_pair(m, m.transpose())
    }

    pub fn rotate_y(deg: f32) -> Self {
        let (s, c) = deg.to_radians().sin_cos();
        let m = Matrix4::new([
            c, 0.0, s, 0.0,
            0.0, 1.0, 0.0, 0.0,
            -s, 0.0, c, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]);
        Self::from_pair(m, m.transpose())
    }

    pub fn rotate_z(deg: f32) -> Self {
        let (s, c) = deg.to_radians().sin_cos();
        let m = Matrix4::new([
            c, -s, 0.0, 0.0,
            s, c, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]);
        Self::from_pair(m, m.transpose())
    }

    /// Rotation of `deg` degrees about an arbitrary axis (Rodrigues form).
    pub fn rotate(axis: Vector, deg: f32) -> Self {
        let a = axis.normalized();
        let (s, c) = deg.to_radians().sin_cos();
        let mut m = Matrix4::IDENTITY;
        m[0][0] = a.x * a.x + (1.0 - a.x * a.x) * c;
        m[0][1] = a.x * a.y * (1.0 - c) - a.z * s;
        m[0][2] = a.x * a.z * (1.0 - c) + a.y * s;
        m[1][0] = a.x * a.y * (1.0 - c) + a.z * s;
        m[1][1] = a.y * a.y + (1.0 - a.y * a.y) * c;
        m[1][2] = a.y * a.z * (1.0 - c) - a.x * s;
        m[2][0] = a.x * a.z * (1.0 - c) - a.y * s;
        m[2][1] = a.y * a.z * (1.0 - c) + a.x * s;
        m[2][2] = a.z * a.z + (1.0 - a.z * a.z) * c;
        Self::from_pair(m, m.transpose())
    }

    /// Camera-to-world view transform: the third column is the forward
    /// direction from `pos` to `center`, so camera-space +z looks at the
    /// target. The basis is orthonormal.
    pub fn look_at(pos: Point, center: Point, up: Vector) -> Self {
        let dir = (center - pos).normalized();
        let right = dir.cross(up).normalized();
        let u = dir.cross(right).normalized();
        let mut m = Matrix4::IDENTITY;
        for i in 0..3 {
            m[i][0] = right[i];
            m[i][1] = u[i];
            m[i][2] = dir[i];
            m[i][3] = pos[i];
        }
        Self::from_matrix(m)
    }

    /// Perspective projection: the projective divide composed with a scale by
    /// `cot(fov / 2)` that maps the field of view onto [-1, 1].
    pub fn perspective(fov_deg: f32, near: f32, far: f32) -> Self {
        let proj_div = Matrix4::new([
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, far / (far - near), -far * near / (far - near),
            0.0, 0.0, 1.0, 0.0,
        ]);
        let inv_tan = 1.0 / (fov_deg.to_radians() / 2.0).tan();
        Self::scale(inv_tan, inv_tan, 1.0) * Self::from_matrix(proj_div)
    }

    #[inline]
    pub fn inverse(&self) -> Self {
        Self {
            mat: self.inv,
            inv: self.mat,
        }
    }

    /// True when transforming the basis vectors changes their length
    /// non-trivially, i.e. the transform carries a scale factor.
    pub fn has_scale(&self) -> bool {
        let a = self.apply_vector(Vector::new(1.0, 0.0, 0.0)).length_squared();
        let b = self.apply_vector(Vector::new(0.0, 1.0, 0.0)).length_squared();
        let c = self.apply_vector(Vector::new(0.0, 0.0, 1.0)).length_squared();
        let off_unit = |l: f32| !(0.999..=1.001).contains(&l);
        off_unit(a) || off_unit(b) || off_unit(c)
    }

    pub fn apply_point(&self, p: Point) -> Point {
        let m = &self.mat;
        let mut out = Point::origin();
        for i in 0..3 {
            out[i] = m[i][0] * p.x + m[i][1] * p.y + m[i][2] * p.z + m[i][3];
        }
        let w = m[3][0] * p.x + m[3][1] * p.y + m[3][2] * p.z + m[3][3];
        if w != 1.0 {
            out / w
        } else {
            out
        }
    }

    pub fn apply_vector(&self, v: Vector) -> Vector {
        let m = &self.mat;
        let mut out = Vector::zero();
        for i in 0..3 {
            out[i] = m[i][0] * v.x + m[i][1] * v.y + m[i][2] * v.z;
        }
        out
    }

    /// Normals transform by the inverse transpose of the linear part, which
    /// is read straight out of the stored inverse.
    pub fn apply_normal(&self, n: Normal) -> Normal {
        let inv = &self.inv;
        Normal::new(
            inv[0][0] * n.x + inv[1][0] * n.y + inv[2][0] * n.z,
            inv[0][1] * n.x + inv[1][1] * n.y + inv[2][1] * n.z,
            inv[0][2] * n.x + inv[1][2] * n.y + inv[2][2] * n.z,
        )
    }

    pub fn apply_ray(&self, r: &Ray) -> Ray {
        let mut out = *r;
        out.o = self.apply_point(r.o);
        out.d = self.apply_vector(r.d);
        out
    }

    pub fn apply_ray_differential(&self, r: &RayDifferential) -> RayDifferential {
        RayDifferential {
            ray: self.apply_ray(&r.ray),
            rx: self.apply_ray(&r.rx),
            ry: self.apply_ray(&r.ry),
        }
    }

    pub fn apply_bbox(&self, b: &BBox) -> BBox {
        let mut out = BBox::empty();
        for i in 0..8 {
            out = out.union_point(self.apply_point(b.corner(i)));
        }
        out
    }

    /// Transforms a hit record's geometric fields in place, leaving the
    /// parameterization (u, v and screen-space derivatives) alone.
    pub fn apply_diff_geom(&self, dg: &mut DifferentialGeometry) {
        dg.point = self.apply_point(dg.point);
        dg.normal = self.apply_normal(dg.normal).normalized();
        dg.geom_normal = self.apply_normal(dg.geom_normal).normalized();
        dg.dp_du = self.apply_vector(dg.dp_du);
        dg.dp_dv = self.apply_vector(dg.dp_dv);
        dg.dp_dx = self.apply_vector(dg.dp_dx);
        dg.dp_dy = self.apply_vector(dg.dp_dy);
        dg.dn_du = self.apply_normal(dg.dn_du);
        dg.dn_dv = self.apply_normal(dg.dn_dv);
    }
}

impl std::ops::Mul for Transform {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            mat: self.mat * rhs.mat,
            inv: rhs.inv * self.inv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{a} != {b}");
    }

    #[test]
    fn point_round_trip() {
        let t = Transform::translate(Vector::new(1.0, -2.0, 3.0))
            * Transform::rotate_y(37.0)
            * Transform::scale(2.0, 1.0, 0.5);
        let p = Point::new(0.3, -1.2, 4.5);
        let back = t.inverse().apply_point(t.apply_point(p));
        assert!((back - p).length() < 1e-4);
    }

    #[test]
    fn vector_ignores_translation() {
        let t = Transform::translate(Vector::new(100.0, 0.0, 0.0));
        let v = Vector::new(1.0, 2.0, 3.0);
        assert_eq!(t.apply_vector(v), v);
    }

    #[test]
    fn normal_stays_unit_under_rotation() {
        let t = Transform::rotate(Vector::new(1.0, 2.0, -1.0), 63.0);
        let n = Normal::new(0.0, 1.0, 0.0);
        assert_near(t.apply_normal(n).length(), 1.0);
    }

    #[test]
    fn normal_uses_inverse_transpose() {
        // Under a non-uniform scale, the transformed normal must stay
        // perpendicular to transformed tangents even though a plain linear
        // transform would shear it off the surface.
        let t = Transform::scale(2.0, 1.0, 1.0);
        let tangent = Vector::new(1.0, 1.0, 0.0);
        let n = Normal::new(1.0, -1.0, 0.0);
        assert_near(n.dot_vector(tangent), 0.0);
        let tn = t.apply_normal(n);
        let tt = t.apply_vector(tangent);
        assert_near(tn.dot_vector(tt), 0.0);
    }

    #[test]
    fn look_at_is_orthonormal() {
        let t = Transform::look_at(
            Point::new(0.0, 0.0, 4.0),
            Point::origin(),
            Vector::new(0.0, 1.0, 0.0),
        );
        assert!(!t.has_scale());
        // Forward axis maps camera +z toward the target
        let fwd = t.apply_vector(Vector::new(0.0, 0.0, 1.0));
        assert!((fwd - Vector::new(0.0, 0.0, -1.0)).length() < 1e-4);
    }

    #[test]
    fn has_scale_detects_scaling() {
        assert!(Transform::scale(2.0, 1.0, 1.0).has_scale());
        assert!(!Transform::rotate_z(45.0).has_scale());
        assert!(!Transform::translate(Vector::new(5.0, 0.0, 0.0)).has_scale());
    }

    #[test]
    fn bbox_round_trip_under_affine_maps() {
        use crate::geometry::BBox;
        // Translation and scale keep boxes axis-aligned, so the round trip
        // is exact; rotations legitimately grow the AABB
        let t = Transform::translate(Vector::new(1.0, -2.0, 3.0)) * Transform::scale(2.0, 3.0, 0.5);
        let b = BBox::new(Point::new(-1.0, 0.0, 2.0), Point::new(1.0, 2.0, 4.0));
        let back = t.inverse().apply_bbox(&t.apply_bbox(&b));
        assert!((back.min - b.min).length() < 1e-4);
        assert!((back.max - b.max).length() < 1e-4);
    }

    #[test]
    fn ray_round_trip() {
        let t = Transform::rotate_x(30.0) * Transform::translate(Vector::new(0.0, 2.0, 0.0));
        let r = Ray::new(Point::new(1.0, 2.0, 3.0), Vector::new(0.0, 0.0, -1.0));
        let back = t.inverse().apply_ray(&t.apply_ray(&r));
        assert!((back.o - r.o).length() < 1e-4);
        assert!((back.d - r.d).length() < 1e-4);
    }
}
