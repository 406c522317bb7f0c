use serde::Serialize;

use super::attributed_segment::AttributedSegment;

/// Run-level facts attached to a transcript.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultMetadata {
    pub speaker_count: usize,
    pub language: String,
    pub duration_secs: f64,
}

/// Final speaker-attributed transcript handed to the caller and formatters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineResult {
    pub segments: Vec<AttributedSegment>,
    pub metadata: ResultMetadata,
}

impl PipelineResult {
    pub fn is_multi_speaker(&self) -> bool {
        self.metadata.speaker_count > 1
    }
}
