use serde::Serialize;

use crate::shared::interval::TimeInterval;

/// A diarization turn: `speaker` talks during `[start, end)`.
///
/// Turns of different speakers may overlap; turns of one speaker are
/// expected not to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpeakerSegment {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
}

impl SpeakerSegment {
    pub fn new(speaker: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            speaker: speaker.into(),
            start,
            end,
        }
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }
}

/// Number of distinct speaker labels across `segments`.
pub fn distinct_speakers(segments: &[SpeakerSegment]) -> usize {
    let mut labels: Vec<&str> = segments.iter().map(|s| s.speaker.as_str()).collect();
    labels.sort_unstable();
    labels.dedup();
    labels.len()
}
