use super::{Region, Sample, Sampler};

/// The simplest sampler: one sample per pixel, dead center, with a centered
/// lens position. Useful for debugging and depth passes.
pub struct UniformSampler {
    region: Region,
}

impl UniformSampler {
    pub fn new(x_start: usize, x_end: usize, y_start: usize, y_end: usize) -> Self {
        Self {
            region: Region::new(x_start, x_end, y_start, y_end),
        }
    }
}

impl Sampler for UniformSampler {
    fn get_samples(&mut self, samples: &mut Vec<Sample>) {
        samples.clear();
        if !self.region.has_samples() {
            return;
        }
        samples.push(Sample::new(
            [self.region.x as f32 + 0.5, self.region.y as f32 + 0.5],
            [0.5, 0.5],
            0.0,
        ));
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
        1
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
            .map(|(x0, x1, y0, y1)| Box::new(UniformSampler::new(x0, x1, y0, y1)) as Box<dyn Sampler>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_centered_sample_per_pixel() {
        let mut s = UniformSampler::new(0, 2, 0, 1);
        let mut batch = Vec::new();
        s.get_samples(&mut batch);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].img, [0.5, 0.5]);
        s.get_samples(&mut batch);
        assert_eq!(batch[0].img, [1.5, 0.5]);
        s.get_samples(&mut batch);
        assert!(batch.is_empty());
    }
}
