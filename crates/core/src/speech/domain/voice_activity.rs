//! Energy-based voice activity detection over a whole recording.
//!
//! Frames are classified against a threshold derived from the recording's
//! own noise floor, so quiet and loud sources are handled alike.

use std::ops::Range;

use crate::audio::domain::loudness::rms;

/// Tuning knobs for [`speech_regions`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VadConfig {
    /// Analysis frame length in milliseconds.
    pub frame_ms: u32,
    /// Percentile of frame levels taken as the noise floor (0.0 to 1.0).
    pub floor_percentile: f32,
    /// Threshold as a multiple of the noise floor.
    pub threshold_multiplier: f32,
    /// Threshold never exceeds this fraction of the loudest frame.
    pub peak_fraction: f32,
    /// Absolute RMS below which nothing counts as speech.
    pub min_threshold: f32,
    /// Runs of speech shorter than this are dropped as clicks.
    pub min_speech_ms: u32,
    /// Speech is held for this long after the last loud frame.
    pub hangover_ms: u32,
    /// Context kept on both sides of each region.
    pub padding_ms: u32,
    /// Regions separated by less than this are joined.
    pub merge_gap_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            frame_ms: 30,
            floor_percentile: 0.1,
            threshold_multiplier: 2.5,
            peak_fraction: 0.5,
            min_threshold: 0.01,
            min_speech_ms: 150,
            hangover_ms: 300,
            padding_ms: 200,
            merge_gap_ms: 500,
        }
    }
}

impl VadConfig {
    fn frame_len(&self, sample_rate: u32) -> usize {
        (sample_rate as u64 * self.frame_ms as u64 / 1000) as usize
    }

    fn frames_for(&self, ms: u32) -> usize {
        if self.frame_ms == 0 {
            return 0;
        }
        ms.div_ceil(self.frame_ms) as usize
    }

    fn samples_for(&self, ms: u32, sample_rate: u32) -> usize {
        (sample_rate as u64 * ms as u64 / 1000) as usize
    }
}

/// Locate speech in `samples`, returning sorted, disjoint sample ranges.
///
/// Silence or an empty input yields no regions.
pub fn speech_regions(samples: &[f32], sample_rate: u32, config: &VadConfig) -> Vec<Range<usize>> {
    let frame_len = config.frame_len(sample_rate);
    if samples.is_empty() || frame_len == 0 {
        return Vec::new();
    }

    let levels: Vec<f32> = samples.chunks(frame_len).map(|f| rms(f) as f32).collect();
    let threshold = adaptive_threshold(&levels, config);
    let active: Vec<bool> = levels.iter().map(|&l| l > threshold).collect();

    let min_frames = config.frames_for(config.min_speech_ms).max(1);
    let hangover = config.frames_for(config.hangover_ms);
    let padding = config.samples_for(config.padding_ms, sample_rate);
    let merge_gap = config.samples_for(config.merge_gap_ms, sample_rate);

    let mut regions: Vec<Range<usize>> = Vec::new();
    for run in frame_runs(&active).filter(|r| r.len() >= min_frames) {
        let end_frame = (run.end + hangover).min(levels.len());
        let start = (run.start * frame_len).saturating_sub(padding);
        let end = (end_frame * frame_len + padding).min(samples.len());

        match regions.last_mut() {
            Some(prev) if start <= prev.end + merge_gap => prev.end = prev.end.max(end),
            _ => regions.push(start..end),
        }
    }

    log::debug!(
        "Voice activity: {} region(s), threshold {:.4} over {} frames",
        regions.len(),
        threshold,
        levels.len()
    );
    regions
}

/// Threshold above the noise floor, capped relative to the loudest frame so
/// a recording without pauses is still detected as speech.
fn adaptive_threshold(levels: &[f32], config: &VadConfig) -> f32 {
    let mut sorted = levels.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let Some(&peak) = sorted.last() else {
        return config.min_threshold;
    };
    let q = config.floor_percentile.clamp(0.0, 1.0);
    let floor = sorted[((sorted.len() - 1) as f32 * q) as usize];

    (floor * config.threshold_multiplier)
        .min(peak * config.peak_fraction)
        .max(config.min_threshold)
}

/// Maximal runs of `true` as frame index ranges.
fn frame_runs(active: &[bool]) -> impl Iterator<Item = Range<usize>> + '_ {
    let mut i = 0;
    std::iter::from_fn(move || {
        while i < active.len() && !active[i] {
            i += 1;
        }
        if i >= active.len() {
            return None;
        }
        let start = i;
        while i < active.len() && active[i] {
            i += 1;
        }
        Some(start..i)
    })
}
