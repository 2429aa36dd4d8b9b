use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{Region, Sample, Sampler};
use crate::linalg::round_up_pow2;

// ─── (0,2)-sequence generators ──────────────────────────────────────────────

/// The base-2 radical inverse computed by bit reversal, XOR-scrambled.
/// Together with [`sobol2`] this forms a scrambled (0,2)-sequence: for any
/// sample count 2^k, every dyadic rectangle of area 2^-k contains exactly one
/// sample.
pub fn van_der_corput(mut n: u32, scramble: u32) -> f32 {
    n = (n << 16) | (n >> 16);
    n = ((n & 0x00ff00ff) << 8) | ((n & 0xff00ff00) >> 8);
    n = ((n & 0x0f0f0f0f) << 4) | ((n & 0xf0f0f0f0) >> 4);
    n = ((n & 0x33333333) << 2) | ((n & 0xcccccccc) >> 2);
    n = ((n & 0x55555555) << 1) | ((n & 0xaaaaaaaa) >> 1);
    n ^= scramble;
    ((n >> 8) & 0xffffff) as f32 / (1 << 24) as f32
}

/// The second dimension of the (0,2)-sequence, generated from the Sobol'
/// direction numbers for base 2.
pub fn sobol2(mut n: u32, mut scramble: u32) -> f32 {
    let mut i: u32 = 1 << 31;
    while n != 0 {
        if n & 0x1 != 0 {
            scramble ^= i;
        }
        n >>= 1;
        i ^= i >> 1;
    }
    ((scramble >> 8) & 0xffffff) as f32 / (1 << 24) as f32
}

/// The n-th point of the scrambled (0,2)-sequence.
#[inline]
pub fn sample02(n: u32, scramble: [u32; 2]) -> [f32; 2] {
    [van_der_corput(n, scramble[0]), sobol2(n, scramble[1])]
}

/// Fills `out` with the first points of a freshly scrambled (0,2)-sequence.
pub fn sample_2d(out: &mut [[f32; 2]], scramble_x: u32, scramble_y: u32) {
    let scramble = [scramble_x, scramble_y];
    for (i, s) in out.iter_mut().enumerate() {
        *s = sample02(i as u32, scramble);
    }
}

/// Fills `out` with a scrambled base-2 radical-inverse sequence.
pub fn sample_1d(out: &mut [f32], scramble: u32) {
    for (i, s) in out.iter_mut().enumerate() {
        *s = van_der_corput(i as u32, scramble);
    }
}

// ─── Low-discrepancy sampler ────────────────────────────────────────────────

/// Produces image and lens positions from independently scrambled
/// (0,2)-sequences. Requires a power-of-two sample count; other counts are
/// rounded up since the sequence's stratification guarantees only hold at
/// powers of two.
pub struct LowDiscrepancySampler {
    region: Region,
    spp: usize,
}

impl LowDiscrepancySampler {
    pub fn new(x_start: usize, x_end: usize, y_start: usize, y_end: usize, spp: usize) -> Self {
        let rounded = round_up_pow2(spp as u32) as usize;
        if rounded != spp {
            warn!("low-discrepancy sampler requires a power-of-two sample count; rounded {spp} up to {rounded}");
        }
        Self {
            region: Region::new(x_start, x_end, y_start, y_end),
            spp: rounded,
        }
    }
}

impl Sampler for LowDiscrepancySampler {
    fn get_samples(&mut self, samples: &mut Vec<Sample>) {
        samples.clear();
        if !self.region.has_samples() {
            return;
        }
        let mut pos = vec![[0.0f32; 2]; self.spp];
        let mut lens = vec![[0.0f32; 2]; self.spp];
        sample_2d(&mut pos, self.region.rng.gen(), self.region.rng.gen());
        sample_2d(&mut lens, self.region.rng.gen(), self.region.rng.gen());
        pos.shuffle(&mut self.region.rng);
        lens.shuffle(&mut self.region.rng);
        let px = self.region.x as f32;
        let py = self.region.y as f32;
        samples.extend(
            pos.iter()
                .zip(lens.iter())
                .map(|(p, l)| Sample::new([p[0] + px, p[1] + py], *l, 0.0)),
        );
        self.region.advance();
    }

    fn get_2d(&mut self, out: &mut [[f32; 2]]) {
        sample_2d(out, self.region.rng.gen(), self.region.rng.gen());
        out.shuffle(&mut self.region.rng);
    }

    fn get_1d(&mut self, out: &mut [f32]) {
        sample_1d(out, self.region.rng.gen());
        out.shuffle(&mut self.region.rng);
    }

    fn random_float(&mut self) -> f32 {
        self.region.random_float()
    }

    fn max_spp(&self) -> usize {
        self.spp
    }

    fn has_samples(&self) -> bool {
        self.region.has_samples()
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.region.width(), self.region.height())
    }

    fn get_subsamplers(&self, w: usize, h: usize) -> Vec<Box<dyn Sampler>> {
        self.region
            .subregions(w, h)
            .into_iter()
            .map(|(x0, x1, y0, y1)| {
                Box::new(LowDiscrepancySampler::new(x0, x1, y0, y1, self.spp)) as Box<dyn Sampler>
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_two_sequence_elementary_intervals() {
        // For N = 2^k unscrambled samples, every dyadic rectangle of
        // dimensions (1/2^i) x (1/2^(k-i)) contains exactly one point.
        let k = 4;
        let n = 1usize << k;
        let pts: Vec<[f32; 2]> = (0..n as u32).map(|i| sample02(i, [0, 0])).collect();
        for i in 0..=k {
            let nx = 1usize << i;
            let ny = 1usize << (k - i);
            let mut counts = vec![0usize; nx * ny];
            for p in &pts {
                let cx = ((p[0] * nx as f32) as usize).min(nx - 1);
                let cy = ((p[1] * ny as f32) as usize).min(ny - 1);
                counts[cy * nx + cx] += 1;
            }
            assert!(
                counts.iter().all(|&c| c == 1),
                "elementary interval {nx}x{ny} not equidistributed: {counts:?}"
            );
        }
    }

    #[test]
    fn scrambling_preserves_the_property() {
        let k = 3;
        let n = 1usize << k;
        let scramble = [0xdeadbeef, 0xcafebabe];
        let pts: Vec<[f32; 2]> = (0..n as u32).map(|i| sample02(i, scramble)).collect();
        let nx = 1 << 1;
        let ny = 1 << (k - 1);
        let mut counts = vec![0usize; nx * ny];
        for p in &pts {
            let cx = ((p[0] * nx as f32) as usize).min(nx - 1);
            let cy = ((p[1] * ny as f32) as usize).min(ny - 1);
            counts[cy * nx + cx] += 1;
        }
        assert!(counts.iter().all(|&c| c == 1));
    }

    #[test]
    fn spp_rounds_to_power_of_two() {
        let s = LowDiscrepancySampler::new(0, 4, 0, 4, 6);
        assert_eq!(s.max_spp(), 8);
        let mut s = LowDiscrepancySampler::new(0, 1, 0, 1, 4);
        let mut batch = Vec::new();
        s.get_samples(&mut batch);
        assert_eq!(batch.len(), 4);
    }
}
