use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign};

// ─── Vector ─────────────────────────────────────────────────────────────────

/// A direction or displacement in 3D space.
///
/// Vectors, points, and normals are distinct types because they transform
/// differently: vectors by the linear part of a transform only, points by the
/// full affine transform, and normals by the inverse transpose of the linear
/// part. Keeping them apart makes those rules impossible to mix up at a call
/// site.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    #[inline(always)]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub const fn broadcast(s: f32) -> Self {
        Self::new(s, s, s)
    }

    #[inline(always)]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// The standard Euclidean inner product, fundamental to every geometric
    /// query in the renderer: projection, angle computation, shading cosines.
    #[inline(always)]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline(always)]
    pub fn dot_normal(self, n: Normal) -> f32 {
        self.x * n.x + self.y * n.y + self.z * n.z
    }

    /// Cross product — used for tangent frames and orthonormal bases.
    #[inline(always)]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Squared length — avoids the sqrt on hot paths such as BVH traversal.
    #[inline(always)]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline(always)]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline(always)]
    pub fn normalized(self) -> Self {
        let len = self.length();
        debug_assert!(len > 1e-12, "normalizing a zero-length vector");
        self / len
    }
}

impl From<Normal> for Vector {
    #[inline(always)]
    fn from(n: Normal) -> Self {
        Self::new(n.x, n.y, n.z)
    }
}

impl From<Point> for Vector {
    #[inline(always)]
    fn from(p: Point) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

impl Neg for Vector {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Add for Vector {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vector {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vector {
    type Output = Self;
    #[inline(always)]
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Mul<Vector> for f32 {
    type Output = Vector;
    #[inline(always)]
    fn mul(self, v: Vector) -> Vector {
        v * self
    }
}

impl MulAssign<f32> for Vector {
    #[inline(always)]
    fn mul_assign(&mut self, s: f32) {
        *self = *self * s;
    }
}

impl Div<f32> for Vector {
    type Output = Self;
    #[inline(always)]
    fn div(self, s: f32) -> Self {
        let inv = 1.0 / s;
        Self::new(self.x * inv, self.y * inv, self.z * inv)
    }
}

impl DivAssign<f32> for Vector {
    #[inline(always)]
    fn div_assign(&mut self, s: f32) {
        *self = *self / s;
    }
}

impl Index<usize> for Vector {
    type Output = f32;
    #[inline(always)]
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl IndexMut<usize> for Vector {
    #[inline(always)]
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v [{:.4}, {:.4}, {:.4}]", self.x, self.y, self.z)
    }
}

// ─── Normal ─────────────────────────────────────────────────────────────────

/// A surface normal.
///
/// Nearly identical to [`Vector`] in representation, but normals transform by
/// the inverse transpose of a transform's linear part, so a separate type
/// keeps the distinction visible. Normals preserve unit length only under
/// orthonormal transforms; callers renormalize when needed.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Normal {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Normal {
    #[inline(always)]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub fn dot(self, n: Self) -> f32 {
        self.x * n.x + self.y * n.y + self.z * n.z
    }

    #[inline(always)]
    pub fn dot_vector(self, v: Vector) -> f32 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    #[inline(always)]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline(always)]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline(always)]
    pub fn normalized(self) -> Self {
        self / self.length()
    }

    /// Flips the normal so it lies in the same hemisphere as `v`.
    #[inline(always)]
    pub fn face_forward(self, v: Vector) -> Self {
        if self.dot_vector(v) < 0.0 {
            -self
        } else {
            self
        }
    }

    #[inline(always)]
    pub fn cross_vector(self, v: Vector) -> Vector {
        Vector::from(self).cross(v)
    }
}

impl From<Vector> for Normal {
    #[inline(always)]
    fn from(v: Vector) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl Neg for Normal {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Add for Normal {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Normal {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Normal {
    type Output = Self;
    #[inline(always)]
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Mul<Normal> for f32 {
    type Output = Normal;
    #[inline(always)]
    fn mul(self, n: Normal) -> Normal {
        n * self
    }
}

impl Div<f32> for Normal {
    type Output = Self;
    #[inline(always)]
    fn div(self, s: f32) -> Self {
        self * (1.0 / s)
    }
}

impl Index<usize> for Normal {
    type Output = f32;
    #[inline(always)]
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl fmt::Display for Normal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n [{:.4}, {:.4}, {:.4}]", self.x, self.y, self.z)
    }
}

// ─── Point ──────────────────────────────────────────────────────────────────

/// A location in 3D space. Points transform by the full affine transform,
/// including translation, which vectors and normals ignore.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    #[inline(always)]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[inline(always)]
    pub fn distance(self, p: Self) -> f32 {
        (self - p).length()
    }

    #[inline(always)]
    pub fn distance_squared(self, p: Self) -> f32 {
        (self - p).length_squared()
    }
}

impl From<Vector> for Point {
    #[inline(always)]
    fn from(v: Vector) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl Add<Vector> for Point {
    type Output = Self;
    #[inline(always)]
    fn add(self, v: Vector) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}

impl AddAssign<Vector> for Point {
    #[inline(always)]
    fn add_assign(&mut self, v: Vector) {
        *self = *self + v;
    }
}

impl Sub for Point {
    type Output = Vector;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub<Vector> for Point {
    type Output = Self;
    #[inline(always)]
    fn sub(self, v: Vector) -> Self {
        Self::new(self.x - v.x, self.y - v.y, self.z - v.z)
    }
}

impl Neg for Point {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Point {
    type Output = Self;
    #[inline(always)]
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Div<f32> for Point {
    type Output = Self;
    #[inline(always)]
    fn div(self, s: f32) -> Self {
        self * (1.0 / s)
    }
}

impl Index<usize> for Point {
    type Output = f32;
    #[inline(always)]
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl IndexMut<usize> for Point {
    #[inline(always)]
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p [{:.4}, {:.4}, {:.4}]", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_and_cross() {
        let a = Vector::new(1.0, 0.0, 0.0);
        let b = Vector::new(0.0, 1.0, 0.0);
        assert_eq!(a.dot(b), 0.0);
        assert_eq!(a.cross(b), Vector::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn point_vector_arithmetic() {
        let p = Point::new(1.0, 2.0, 3.0);
        let q = Point::new(4.0, 6.0, 3.0);
        let d = q - p;
        assert_eq!(d, Vector::new(3.0, 4.0, 0.0));
        assert_eq!(p + d, q);
        assert!((p.distance(q) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn face_forward_flips() {
        let n = Normal::new(0.0, 0.0, 1.0);
        let v = Vector::new(0.0, 0.0, -1.0);
        assert_eq!(n.face_forward(v), Normal::new(0.0, 0.0, -1.0));
        assert_eq!(n.face_forward(-v), n);
    }
}
