use std::ops::Range;

/// Mono PCM samples normalized to [-1.0, 1.0] at a fixed sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn sample_index_at_time(&self, time: f64) -> usize {
        ((time.max(0.0) * self.sample_rate as f64) as usize).min(self.samples.len())
    }

    pub fn time_at_sample(&self, index: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        index as f64 / self.sample_rate as f64
    }

    /// Samples in `range`, clamped to the segment.
    pub fn slice(&self, range: Range<usize>) -> &[f32] {
        let end = range.end.min(self.samples.len());
        let start = range.start.min(end);
        &self.samples[start..end]
    }
}
