use super::{Matrix4, Vector};

/// A rotation quaternion `q = (v, w)` with vector part `v` and scalar `w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub v: Vector,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        v: Vector::new(0.0, 0.0, 0.0),
        w: 1.0,
    };

    /// Rotation of `deg` degrees about `axis`.
    pub fn from_axis_angle(axis: Vector, deg: f32) -> Self {
        let half = deg.to_radians() / 2.0;
        Self {
            v: axis.normalized() * half.sin(),
            w: half.cos(),
        }
    }

    /// Extracts the rotation from an orthonormal matrix, following
    /// Shoemake's branch-free-ish trace method.
    pub fn from_matrix(m: &Matrix4) -> Self {
        let trace = m[0][0] + m[1][1] + m[2][2];
        if trace > 0.0 {
            let mut s = (trace + 1.0).sqrt();
            let w = s / 2.0;
            s = 0.5 / s;
            Self {
                v: Vector::new(
                    (m[2][1] - m[1][2]) * s,
                    (m[0][2] - m[2][0]) * s,
                    (m[1][0] - m[0][1]) * s,
                ),
                w,
            }
        } else {
            // Pick the largest diagonal element to keep s well-conditioned
            let next = [1, 2, 0];
            let mut i = 0;
            if m[1][1] > m[0][0] {
                i = 1;
            }
            if m[2][2] > m[i][i] {
                i = 2;
            }
            let j = next[i];
            let k = next[j];
            let mut s = ((m[i][i] - (m[j][j] + m[k][k])) + 1.0).sqrt();
            let mut q = [0.0f32; 3];
            q[i] = s * 0.5;
            if s != 0.0 {
                s = 0.5 / s;
            }
            let w = (m[k][j] - m[j][k]) * s;
            q[j] = (m[j][i] + m[i][j]) * s;
            q[k] = (m[k][i] + m[i][k]) * s;
            Self {
                v: Vector::new(q[0], q[1], q[2]),
                w,
            }
        }
    }

    pub fn to_matrix(self) -> Matrix4 {
        let (x, y, z, w) = (self.v.x, self.v.y, self.v.z, self.w);
        let mut m = Matrix4::IDENTITY;
        m[0][0] = 1.0 - 2.0 * (y * y + z * z);
        m[0][1] = 2.0 * (x * y - z * w);
        m[0][2] = 2.0 * (x * z + y * w);
        m[1][0] = 2.0 * (x * y + z * w);
        m[1][1] = 1.0 - 2.0 * (x * x + z * z);
        m[1][2] = 2.0 * (y * z - x * w);
        m[2][0] = 2.0 * (x * z - y * w);
        m[2][1] = 2.0 * (y * z + x * w);
        m[2][2] = 1.0 - 2.0 * (x * x + y * y);
        m
    }

    #[inline]
    pub fn dot(self, q: Self) -> f32 {
        self.v.dot(q.v) + self.w * q.w
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    #[inline]
    pub fn normalized(self) -> Self {
        let inv = 1.0 / self.length();
        Self {
            v: self.v * inv,
            w: self.w * inv,
        }
    }

    /// Spherical linear interpolation between two rotations. Falls back to
    /// normalized lerp when the quaternions are nearly parallel, where the
    /// sin(θ) denominator loses precision.
    pub fn slerp(self, other: Self, t: f32) -> Self {
        let cos_theta = self.dot(other);
        if cos_theta > 0.9995 {
            Self {
                v: self.v * (1.0 - t) + other.v * t,
                w: super::lerp(t, self.w, other.w),
            }
            .normalized()
        } else {
            let theta = cos_theta.clamp(-1.0, 1.0).acos();
            let theta_p = theta * t;
            let q_perp = Self {
                v: other.v - self.v * cos_theta,
                w: other.w - self.w * cos_theta,
            }
            .normalized();
            Self {
                v: self.v * theta_p.cos() + q_perp.v * theta_p.sin(),
                w: self.w * theta_p.cos() + q_perp.w * theta_p.sin(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::Transform;

    #[test]
    fn matrix_round_trip() {
        let q = Quaternion::from_axis_angle(Vector::new(0.0, 1.0, 0.0), 90.0);
        let q2 = Quaternion::from_matrix(&q.to_matrix());
        // q and -q encode the same rotation
        let sign = if q.dot(q2) < 0.0 { -1.0 } else { 1.0 };
        assert!((q.w - sign * q2.w).abs() < 1e-4);
        assert!((q.v - q2.v * sign).length() < 1e-4);
    }

    #[test]
    fn rotation_matches_transform() {
        let q = Quaternion::from_axis_angle(Vector::new(0.0, 0.0, 1.0), 90.0);
        let rotated = Transform::from_matrix(q.to_matrix()).apply_vector(Vector::new(1.0, 0.0, 0.0));
        assert!((rotated - Vector::new(0.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn slerp_endpoints() {
        let a = Quaternion::from_axis_angle(Vector::new(1.0, 0.0, 0.0), 0.0);
        let b = Quaternion::from_axis_angle(Vector::new(1.0, 0.0, 0.0), 120.0);
        assert!((a.slerp(b, 0.0).dot(a).abs() - 1.0).abs() < 1e-4);
        assert!((a.slerp(b, 1.0).dot(b).abs() - 1.0).abs() < 1e-4);
    }
}
