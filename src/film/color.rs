use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Index, Mul, MulAssign, Neg, Sub, SubAssign};

// ─── Color ──────────────────────────────────────────────────────────────────

/// A tri-stimulus RGB radiance or reflectance value.
///
/// Colors stay in linear high dynamic range throughout the pipeline; clamping
/// to [0, 1] happens only when quantizing to 8-bit output.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// An 8-bit RGB triple for image output.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Color24 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const BLACK: Color = Color::broadcast(0.0);
pub const WHITE: Color = Color::broadcast(1.0);

impl Color {
    #[inline(always)]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    #[inline(always)]
    pub const fn broadcast(s: f32) -> Self {
        Self::new(s, s, s)
    }

    /// Rec. 709 relative luminance, the scalar brightness used for Russian
    /// roulette survival probabilities and adaptive-sampler contrast tests.
    #[inline(always)]
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    #[inline(always)]
    pub fn is_black(self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0
    }

    /// Clamps each channel to [0, 1] for display.
    #[inline(always)]
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
        )
    }

    /// Componentwise `e^x` — converts negated optical thickness into
    /// transmittance.
    #[inline(always)]
    pub fn exp(self) -> Self {
        Self::new(self.r.exp(), self.g.exp(), self.b.exp())
    }

    #[inline(always)]
    pub fn has_nan(self) -> bool {
        self.r.is_nan() || self.g.is_nan() || self.b.is_nan()
    }
}

impl From<Color> for Color24 {
    #[inline]
    fn from(c: Color) -> Self {
        let c = c.clamped();
        Self {
            r: (c.r * 255.0) as u8,
            g: (c.g * 255.0) as u8,
            b: (c.b * 255.0) as u8,
        }
    }
}

impl Neg for Color {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::new(-self.r, -self.g, -self.b)
    }
}

impl Add for Color {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Color {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Color {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b)
    }
}

impl SubAssign for Color {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Color {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl MulAssign for Color {
    #[inline(always)]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl Mul<f32> for Color {
    type Output = Self;
    #[inline(always)]
    fn mul(self, s: f32) -> Self {
        Self::new(self.r * s, self.g * s, self.b * s)
    }
}

impl Mul<Color> for f32 {
    type Output = Color;
    #[inline(always)]
    fn mul(self, c: Color) -> Color {
        c * self
    }
}

impl MulAssign<f32> for Color {
    #[inline(always)]
    fn mul_assign(&mut self, s: f32) {
        *self = *self * s;
    }
}

impl Div<f32> for Color {
    type Output = Self;
    #[inline(always)]
    fn div(self, s: f32) -> Self {
        self * (1.0 / s)
    }
}

impl DivAssign<f32> for Color {
    #[inline(always)]
    fn div_assign(&mut self, s: f32) {
        *self = *self / s;
    }
}

impl Div for Color {
    type Output = Self;
    #[inline(always)]
    fn div(self, rhs: Self) -> Self {
        Self::new(self.r / rhs.r, self.g / rhs.g, self.b / rhs.b)
    }
}

impl Index<usize> for Color {
    type Output = f32;
    #[inline(always)]
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.r,
            1 => &self.g,
            _ => &self.b,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb [{:.4}, {:.4}, {:.4}]", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luminance_weights() {
        assert!((WHITE.luminance() - 1.0).abs() < 1e-5);
        assert!((Color::new(1.0, 0.0, 0.0).luminance() - 0.2126).abs() < 1e-6);
    }

    #[test]
    fn black_detection() {
        assert!(BLACK.is_black());
        assert!(!Color::new(0.0, 1e-6, 0.0).is_black());
    }

    #[test]
    fn clamp_and_quantize() {
        let c = Color::new(2.0, -0.5, 0.5);
        assert_eq!(c.clamped(), Color::new(1.0, 0.0, 0.5));
        let q = Color24::from(c);
        assert_eq!((q.r, q.g), (255, 0));
    }

    #[test]
    fn exp_of_negated_tau() {
        let tau = Color::broadcast(0.0);
        assert_eq!((-tau).exp(), WHITE);
    }
}
