use rand::seq::SliceRandom;
use rand::Rng;

use super::{Region, Sample, Sampler};

/// Jittered stratified sampling: the pixel is divided into an `n × n` grid
/// and one sample lands uniformly inside each cell, which bounds clumping
/// while keeping the variance benefits of randomness. Image and lens strata
/// are shuffled independently so they are decorrelated.
pub struct StratifiedSampler {
    region: Region,
    /// Samples per pixel is `n × n`.
    n: usize,
}

impl StratifiedSampler {
    pub fn new(x_start: usize, x_end: usize, y_start: usize, y_end: usize, n: usize) -> Self {
        Self {
            region: Region::new(x_start, x_end, y_start, y_end),
            n: n.max(1),
        }
    }

    /// One jittered sample per cell of the n×n grid over [0,1)².
    fn sample_grid(&mut self) -> Vec<[f32; 2]> {
        let n = self.n;
        let inv = 1.0 / n as f32;
        let mut out = Vec::with_capacity(n * n);
        for y in 0..n {
            for x in 0..n {
                out.push([
                    (x as f32 + self.region.rng.gen::<f32>()) * inv,
                    (y as f32 + self.region.rng.gen::<f32>()) * inv,
                ]);
            }
        }
        out
    }
}

impl Sampler for StratifiedSampler {
    fn get_samples(&mut self, samples: &mut Vec<Sample>) {
        samples.clear();
        if !self.region.has_samples() {
            return;
        }
        let mut pos = self.sample_grid();
        let mut lens = self.sample_grid();
        pos.shuffle(&mut self.region.rng);
        lens.shuffle(&mut self.region.rng);
        let px = self.region.x as f32;
        let py = self.region.y as f32;
        samples.extend(pos.iter().zip(lens.iter()).map(|(p, l)| {
            Sample::new([p[0] + px, p[1] + py], *l, self.region.rng.gen())
        }));
        self.region.advance();
    }

    fn get_2d(&mut self, out: &mut [[f32; 2]]) {
        self.region.fill_rand_2d(out);
    }

    fn get_1d(&mut self, out: &mut [f32]) {
        self.region.fill_rand_1d(out);
    }

    fn random_float(&mut self) -> f32 {
        self.region.random_float()
    }

    fn max_spp(&self) -> usize {
        self.n * self.n
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
                Box::new(StratifiedSampler::new(x0, x1, y0, y1, self.n)) as Box<dyn Sampler>
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_n_squared_and_inside_pixel() {
        let mut s = StratifiedSampler::new(3, 4, 7, 8, 4);
        let mut batch = Vec::new();
        s.get_samples(&mut batch);
        assert_eq!(batch.len(), 16);
        for sample in &batch {
            assert!(sample.img[0] >= 3.0 && sample.img[0] < 4.0);
            assert!(sample.img[1] >= 7.0 && sample.img[1] < 8.0);
            assert!(sample.lens[0] >= 0.0 && sample.lens[0] < 1.0);
        }
    }

    #[test]
    fn strata_cover_every_cell() {
        let mut s = StratifiedSampler::new(0, 1, 0, 1, 4);
        let mut batch = Vec::new();
        s.get_samples(&mut batch);
        let mut cells = vec![false; 16];
        for sample in &batch {
            let cx = (sample.img[0] * 4.0) as usize;
            let cy = (sample.img[1] * 4.0) as usize;
            cells[cy.min(3) * 4 + cx.min(3)] = true;
        }
        assert!(cells.iter().all(|&c| c), "a stratum received no sample");
    }
}
