use serde::Serialize;

use crate::output::domain::transcript_formatter::{FormatError, OutputKind, TranscriptFormatter};
use crate::transcript::domain::attributed_segment::AttributedSegment;
use crate::transcript::domain::pipeline_result::PipelineResult;
use crate::transcript::domain::word_span::WordSpan;

/// Structured JSON document with metadata, segments and per-word timing.
/// Times are rounded to milliseconds.
#[derive(Debug, Default)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct Document<'a> {
    metadata: Metadata<'a>,
    segments: Vec<Segment<'a>>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    num_speakers: usize,
    language: &'a str,
    duration: f64,
    total_segments: usize,
}

#[derive(Serialize)]
struct Segment<'a> {
    speaker: &'a str,
    start: f64,
    end: f64,
    text: &'a str,
    words: Vec<Word<'a>>,
}

#[derive(Serialize)]
struct Word<'a> {
    word: &'a str,
    start: f64,
    end: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    probability: Option<f64>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

impl<'a> From<&'a WordSpan> for Word<'a> {
    fn from(w: &'a WordSpan) -> Self {
        Self {
            word: w.text.trim(),
            start: round_to(w.start, 3),
            end: round_to(w.end, 3),
            probability: w.confidence.map(|c| round_to(c as f64, 4)),
        }
    }
}

impl<'a> From<&'a AttributedSegment> for Segment<'a> {
    fn from(seg: &'a AttributedSegment) -> Self {
        Self {
            speaker: &seg.speaker,
            start: round_to(seg.start, 3),
            end: round_to(seg.end, 3),
            text: &seg.text,
            words: seg.words.iter().map(Word::from).collect(),
        }
    }
}

impl TranscriptFormatter for JsonFormatter {
    fn kind(&self) -> OutputKind {
        OutputKind::Structured
    }

    fn format(&self, result: &PipelineResult) -> Result<String, FormatError> {
        let doc = Document {
            metadata: Metadata {
                num_speakers: result.metadata.speaker_count,
                language: &result.metadata.language,
                duration: round_to(result.metadata.duration_secs, 2),
                total_segments: result.segments.len(),
            },
            segments: result.segments.iter().map(Segment::from).collect(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }
}
