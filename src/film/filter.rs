use crate::linalg::PI;

// ─── Reconstruction filters ─────────────────────────────────────────────────

/// An image reconstruction filter with symmetric support `[-w, w] × [-h, h]`.
///
/// The filter kinds form a closed set, so the dispatch is a plain enum match
/// rather than a trait object; the render target evaluates weights once into
/// a lookup table at construction, so this is never on the per-sample path.
#[derive(Debug, Clone, Copy)]
pub enum Filter {
    /// Constant weight over the support.
    Box { w: f32, h: f32 },
    /// `max(0, w - |x|) · max(0, h - |y|)` tent.
    Triangle { w: f32, h: f32 },
    /// Tensor-product Gaussian with falloff `alpha`, shifted so the weight
    /// reaches exactly zero at the support edge.
    Gaussian { w: f32, h: f32, alpha: f32 },
    /// Mitchell-Netravali piecewise cubic; `b` and `c` trade ringing for
    /// blurring, with `b + 2c = 1` the recommended family (Mitchell &
    /// Netravali 1988).
    Mitchell { w: f32, h: f32, b: f32, c: f32 },
    /// Lanczos-windowed sinc with `a` lobes.
    LanczosSinc { w: f32, h: f32, a: f32 },
}

impl Filter {
    #[inline]
    pub fn extent(&self) -> (f32, f32) {
        match *self {
            Filter::Box { w, h }
            | Filter::Triangle { w, h }
            | Filter::Gaussian { w, h, .. }
            | Filter::Mitchell { w, h, .. }
            | Filter::LanczosSinc { w, h, .. } => (w, h),
        }
    }

    /// Evaluates the filter weight at an offset from the sample position.
    pub fn weight(&self, x: f32, y: f32) -> f32 {
        match *self {
            Filter::Box { .. } => 1.0,
            Filter::Triangle { w, h } => (w - x.abs()).max(0.0) * (h - y.abs()).max(0.0),
            Filter::Gaussian { w, h, alpha } => {
                gaussian_1d(x, alpha, (-alpha * w * w).exp())
                    * gaussian_1d(y, alpha, (-alpha * h * h).exp())
            }
            Filter::Mitchell { w, h, b, c } => mitchell_1d(x / w, b, c) * mitchell_1d(y / h, b, c),
            Filter::LanczosSinc { w, h, a } => lanczos_sinc_1d(x / w, a) * lanczos_sinc_1d(y / h, a),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Box { w: 0.5, h: 0.5 }
    }
}

#[inline]
fn gaussian_1d(x: f32, alpha: f32, edge: f32) -> f32 {
    ((-alpha * x * x).exp() - edge).max(0.0)
}

fn mitchell_1d(x: f32, b: f32, c: f32) -> f32 {
    let x = (2.0 * x).abs();
    let f = if x >= 2.0 {
        0.0
    } else if x >= 1.0 {
        (-b - 6.0 * c) * x.powi(3)
            + (6.0 * b + 30.0 * c) * x.powi(2)
            + (-12.0 * b - 48.0 * c) * x
            + 8.0 * b
            + 24.0 * c
    } else {
        (12.0 - 9.0 * b - 6.0 * c) * x.powi(3) + (-18.0 + 12.0 * b + 6.0 * c) * x.powi(2) + 6.0
            - 2.0 * b
    };
    f / 6.0
}

fn lanczos_sinc_1d(x: f32, a: f32) -> f32 {
    let x = x.abs();
    if x <= 1e-5 {
        return 1.0;
    }
    if x >= a {
        return 0.0;
    }
    let x = x * PI;
    a * x.sin() * (x / a).sin() / (x * x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_is_constant() {
        let f = Filter::Box { w: 2.0, h: 2.0 };
        assert_eq!(f.weight(0.0, 0.0), 1.0);
        assert_eq!(f.weight(1.9, -1.9), 1.0);
    }

    #[test]
    fn triangle_tapers_to_zero() {
        let f = Filter::Triangle { w: 2.0, h: 2.0 };
        assert_eq!(f.weight(0.0, 0.0), 4.0);
        assert_eq!(f.weight(2.0, 0.0), 0.0);
        assert!(f.weight(1.0, 1.0) > 0.0);
    }

    #[test]
    fn gaussian_zero_at_edge() {
        let f = Filter::Gaussian {
            w: 2.0,
            h: 2.0,
            alpha: 1.0,
        };
        assert!(f.weight(0.0, 0.0) > 0.0);
        assert!(f.weight(2.0, 0.0).abs() < 1e-6);
    }

    #[test]
    fn filters_peak_at_center() {
        let filters = [
            Filter::Triangle { w: 2.0, h: 2.0 },
            Filter::Gaussian { w: 2.0, h: 2.0, alpha: 2.0 },
            Filter::Mitchell { w: 2.0, h: 2.0, b: 1.0 / 3.0, c: 1.0 / 3.0 },
            Filter::LanczosSinc { w: 4.0, h: 4.0, a: 3.0 },
        ];
        for f in filters {
            let center = f.weight(0.0, 0.0);
            for off in [0.5, 1.0, 1.5] {
                assert!(
                    f.weight(off, 0.0) < center,
                    "{f:?} did not peak at the center"
                );
            }
        }
    }
}
