use super::attributed_segment::AttributedSegment;
use super::pipeline_result::{PipelineResult, ResultMetadata};

/// Packages merged segments with run metadata. Segment content is passed
/// through untouched.
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn assemble(segments: Vec<AttributedSegment>, metadata: ResultMetadata) -> PipelineResult {
        PipelineResult { segments, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::domain::word_span::WordSpan;

    #[test]
    fn test_assemble_keeps_segments_and_metadata() {
        let segments = vec![AttributedSegment::open("S0", WordSpan::new("hi", 0.0, 0.4))];
        let metadata = ResultMetadata {
            speaker_count: 2,
            language: "en".to_string(),
            duration_secs: 12.5,
        };

        let result = ResultAssembler::assemble(segments.clone(), metadata.clone());

        assert_eq!(result.segments, segments);
        assert_eq!(result.metadata, metadata);
        assert!(result.is_multi_speaker());
    }
}
