//! Samplers iterate over an image rectangle and hand each pixel a batch of
//! well-distributed sample positions for the camera, lens, and integrators.

mod adaptive;
mod ld;
mod stratified;
mod uniform;

pub use adaptive::AdaptiveSampler;
pub use ld::LowDiscrepancySampler;
pub use stratified::StratifiedSampler;
pub use uniform::UniformSampler;

use crate::film::Color;
use crate::linalg::RayDifferential;
use log::warn;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// ─── Sample ─────────────────────────────────────────────────────────────────

/// One sample position: continuous image coordinates, a lens position in
/// [0,1)², and a time value for motion-blurred scenes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sample {
    pub img: [f32; 2],
    pub lens: [f32; 2],
    pub time: f32,
}

impl Sample {
    pub fn new(img: [f32; 2], lens: [f32; 2], time: f32) -> Self {
        Self { img, lens, time }
    }
}

// ─── Sampler trait ──────────────────────────────────────────────────────────

/// An iterator over the pixels of an image rectangle that produces per-pixel
/// sample batches, plus a source of auxiliary sample arrays for the
/// integrators. A sampler is owned by exactly one worker at a time, so its
/// PRNG is never contended.
pub trait Sampler: Send + Sync {
    /// Fills `samples` with the batch for the current pixel and advances to
    /// the next pixel (except adaptive samplers, which advance in
    /// [`Sampler::report_results`]). An empty batch means the rectangle is
    /// exhausted.
    fn get_samples(&mut self, samples: &mut Vec<Sample>);

    /// Fills an array of 2D sample values in [0,1)² for integrator use.
    fn get_2d(&mut self, out: &mut [[f32; 2]]);

    /// Fills an array of 1D sample values in [0,1).
    fn get_1d(&mut self, out: &mut [f32]);

    fn random_float(&mut self) -> f32;

    /// The most samples a single pixel can receive.
    fn max_spp(&self) -> usize;

    fn has_samples(&self) -> bool;

    /// (width, height) of the rectangle this sampler covers.
    fn dimensions(&self) -> (usize, usize);

    /// Reports the colors computed for the previous batch. Returning `true`
    /// accepts the batch; `false` asks the caller to discard it and re-sample
    /// the same pixel at a higher rate.
    fn report_results(
        &mut self,
        _samples: &[Sample],
        _rays: &[RayDifferential],
        _colors: &[Color],
    ) -> bool {
        true
    }

    /// Partitions this sampler's rectangle into sub-samplers covering blocks
    /// of roughly `w × h` pixels. The sub-rectangles are disjoint and tile
    /// the original rectangle exactly.
    fn get_subsamplers(&self, w: usize, h: usize) -> Vec<Box<dyn Sampler>>;
}

// ─── Shared region bookkeeping ──────────────────────────────────────────────

/// The image rectangle `[x_start, x_end) × [y_start, y_end)` with the scan
/// position and the per-sampler PRNG every sampler carries.
#[derive(Debug, Clone)]
pub(crate) struct Region {
    pub x: usize,
    pub y: usize,
    pub x_start: usize,
    pub x_end: usize,
    pub y_start: usize,
    pub y_end: usize,
    pub rng: SmallRng,
}

impl Region {
    pub fn new(x_start: usize, x_end: usize, y_start: usize, y_end: usize) -> Self {
        Self {
            x: x_start,
            y: y_start,
            x_start,
            x_end,
            y_start,
            y_end,
            rng: SmallRng::from_entropy(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.x_end - self.x_start
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y_end - self.y_start
    }

    #[inline]
    pub fn has_samples(&self) -> bool {
        self.y != self.y_end
    }

    /// Steps the scan position one pixel in row-major order.
    pub fn advance(&mut self) {
        self.x += 1;
        if self.x == self.x_end {
            self.x = self.x_start;
            self.y += 1;
        }
    }

    #[inline]
    pub fn random_float(&mut self) -> f32 {
        self.rng.gen()
    }

    pub fn fill_rand_2d(&mut self, out: &mut [[f32; 2]]) {
        for s in out.iter_mut() {
            *s = [self.rng.gen(), self.rng.gen()];
        }
    }

    pub fn fill_rand_1d(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.rng.gen();
        }
    }

    /// Computes the sub-rectangles for [`Sampler::get_subsamplers`]. Blocks
    /// larger than the region collapse to a single copy of the whole region;
    /// uneven partitions are reported but still tile exactly, with the last
    /// row/column absorbing the remainder.
    pub fn subregions(&self, w: usize, h: usize) -> Vec<(usize, usize, usize, usize)> {
        let x_dim = self.width();
        let y_dim = self.height();
        if w > x_dim || h > y_dim {
            warn!("sampler cannot be partitioned into blocks bigger than itself");
            return vec![(self.x_start, self.x_end, self.y_start, self.y_end)];
        }
        let n_cols = x_dim / w;
        let n_rows = y_dim / h;
        let bw = x_dim / n_cols;
        let bh = y_dim / n_rows;
        if bw * n_cols != x_dim || bh * n_rows != y_dim {
            warn!(
                "sampler could not be partitioned equally into {w} x {h} blocks; \
                 edge blocks will absorb the remainder"
            );
        }
        let mut regions = Vec::with_capacity(n_cols * n_rows);
        for j in 0..n_rows {
            for i in 0..n_cols {
                let x0 = self.x_start + i * bw;
                let y0 = self.y_start + j * bh;
                // The final row/column extends to the region edge so the
                // union of blocks is exact
                let x1 = if i + 1 == n_cols { self.x_end } else { x0 + bw };
                let y1 = if j + 1 == n_rows { self.y_end } else { y0 + bh };
                regions.push((x0, x1, y0, y1));
            }
        }
        regions
    }
}
