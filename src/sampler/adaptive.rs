use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{ld, Region, Sample, Sampler};
use crate::film::Color;
use crate::linalg::{round_up_pow2, RayDifferential};

/// Relative luminance deviation from the batch mean above which a pixel is
/// considered high-contrast and gets re-sampled at double the rate.
const MAX_CONTRAST: f32 = 0.3;

/// An adaptive sampler bracketed by `[min_spp, max_spp]`. Each pixel starts
/// at `min_spp` low-discrepancy samples; if the returned colors show high
/// luminance contrast the batch is discarded and the pixel is re-shot with
/// twice as many samples, up to `max_spp`.
pub struct AdaptiveSampler {
    region: Region,
    min_spp: usize,
    max_spp: usize,
    /// The rate the *current* pixel is being sampled at; resets to `min_spp`
    /// whenever a batch is accepted.
    supersample: usize,
}

impl AdaptiveSampler {
    pub fn new(
        x_start: usize,
        x_end: usize,
        y_start: usize,
        y_end: usize,
        min_spp: usize,
        max_spp: usize,
    ) -> Self {
        let min = round_up_pow2(min_spp as u32) as usize;
        let max = round_up_pow2(max_spp as u32) as usize;
        if min != min_spp || max != max_spp {
            warn!(
                "adaptive sampler requires power-of-two sample counts; \
                 using [{min}, {max}] for requested [{min_spp}, {max_spp}]"
            );
        }
        Self {
            region: Region::new(x_start, x_end, y_start, y_end),
            min_spp: min,
            max_spp: max.max(min),
            supersample: min,
        }
    }

    fn needs_supersampling(&self, colors: &[Color]) -> bool {
        if colors.is_empty() {
            return false;
        }
        let mean = colors.iter().map(|c| c.luminance()).sum::<f32>() / colors.len() as f32;
        if mean == 0.0 {
            return false;
        }
        colors
            .iter()
            .any(|c| ((c.luminance() - mean) / mean).abs() > MAX_CONTRAST)
    }
}

impl Sampler for AdaptiveSampler {
    fn get_samples(&mut self, samples: &mut Vec<Sample>) {
        samples.clear();
        // While re-sampling (supersample > min) the current pixel still owes
        // samples even if the scan position sits at the rectangle's end
        if self.supersample == self.min_spp && !self.region.has_samples() {
            return;
        }
        let spp = self.supersample;
        let mut pos = vec![[0.0f32; 2]; spp];
        let mut lens = vec![[0.0f32; 2]; spp];
        let mut time = vec![0.0f32; spp];
        ld::sample_2d(&mut pos, self.region.rng.gen(), self.region.rng.gen());
        ld::sample_2d(&mut lens, self.region.rng.gen(), self.region.rng.gen());
        ld::sample_1d(&mut time, self.region.rng.gen());
        pos.shuffle(&mut self.region.rng);
        lens.shuffle(&mut self.region.rng);
        time.shuffle(&mut self.region.rng);
        let px = self.region.x as f32;
        let py = self.region.y as f32;
        for i in 0..spp {
            samples.push(Sample::new(
                [pos[i][0] + px, pos[i][1] + py],
                lens[i],
                time[i],
            ));
        }
    }

    fn get_2d(&mut self, out: &mut [[f32; 2]]) {
        ld::sample_2d(out, self.region.rng.gen(), self.region.rng.gen());
        out.shuffle(&mut self.region.rng);
    }

    fn get_1d(&mut self, out: &mut [f32]) {
        ld::sample_1d(out, self.region.rng.gen());
        out.shuffle(&mut self.region.rng);
    }

    fn random_float(&mut self) -> f32 {
        self.region.random_float()
    }

    fn max_spp(&self) -> usize {
        self.max_spp
    }

    fn has_samples(&self) -> bool {
        self.supersample != self.min_spp || self.region.has_samples()
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.region.width(), self.region.height())
    }

    fn report_results(
        &mut self,
        _samples: &[Sample],
        _rays: &[RayDifferential],
        colors: &[Color],
    ) -> bool {
        if self.supersample == self.max_spp || !self.needs_supersampling(colors) {
            self.supersample = self.min_spp;
            self.region.advance();
            return true;
        }
        // Discard the batch and re-shoot this pixel at double the rate
        self.supersample *= 2;
        false
    }

    fn get_subsamplers(&self, w: usize, h: usize) -> Vec<Box<dyn Sampler>> {
        self.region
            .subregions(w, h)
            .into_iter()
            .map(|(x0, x1, y0, y1)| {
                Box::new(AdaptiveSampler::new(
                    x0,
                    x1,
                    y0,
                    y1,
                    self.min_spp,
                    self.max_spp,
                )) as Box<dyn Sampler>
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_pixel(sampler: &mut AdaptiveSampler, colors_for: impl Fn(usize) -> Vec<Color>) -> usize {
        // Drives one pixel to acceptance, returning total samples consumed
        let mut total = 0;
        let mut batch = Vec::new();
        loop {
            sampler.get_samples(&mut batch);
            assert!(!batch.is_empty());
            total += batch.len();
            let colors = colors_for(batch.len());
            if sampler.report_results(&batch, &[], &colors) {
                return total;
            }
        }
    }

    #[test]
    fn flat_pixel_stops_at_min_spp() {
        let mut s = AdaptiveSampler::new(0, 1, 0, 1, 4, 32);
        let consumed = run_pixel(&mut s, |n| vec![Color::broadcast(0.5); n]);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn noisy_pixel_escalates_to_max_spp() {
        let mut s = AdaptiveSampler::new(0, 1, 0, 1, 4, 16);
        // Alternate bright and dark samples: relative deviation stays huge
        let consumed = run_pixel(&mut s, |n| {
            (0..n)
                .map(|i| {
                    if i % 2 == 0 {
                        Color::broadcast(1.0)
                    } else {
                        Color::broadcast(0.0)
                    }
                })
                .collect()
        });
        // 4 discarded + 8 discarded + 16 accepted at the cap
        assert_eq!(consumed, 4 + 8 + 16);
        assert!(!s.has_samples());
    }

    #[test]
    fn batch_count_doubles_on_rejection() {
        let mut s = AdaptiveSampler::new(0, 1, 0, 1, 2, 8);
        let mut batch = Vec::new();
        s.get_samples(&mut batch);
        assert_eq!(batch.len(), 2);
        let noisy = vec![Color::broadcast(1.0), Color::broadcast(0.0)];
        assert!(!s.report_results(&batch, &[], &noisy));
        s.get_samples(&mut batch);
        assert_eq!(batch.len(), 4);
    }
}
