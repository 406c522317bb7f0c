use serde::Serialize;

use crate::shared::interval::TimeInterval;

/// A recognized word with its time bounds in seconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WordSpan {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl WordSpan {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }

    pub fn midpoint(&self) -> f64 {
        self.interval().midpoint()
    }

    /// Shift both bounds by `offset` seconds.
    pub fn offset_by(mut self, offset: f64) -> Self {
        self.start += offset;
        self.end += offset;
        self
    }
}
