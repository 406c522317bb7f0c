use crate::output::domain::transcript_formatter::{OutputKind, TranscriptFormatter};

use super::json_formatter::JsonFormatter;
use super::srt_formatter::SrtFormatter;
use super::text_formatter::TextFormatter;

/// Creates the formatter for an output kind.
pub fn formatter_for(kind: OutputKind) -> Box<dyn TranscriptFormatter> {
    match kind {
        OutputKind::PlainText => Box::new(TextFormatter),
        OutputKind::Subtitle => Box::new(SrtFormatter),
        OutputKind::Structured => Box::new(JsonFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::domain::attributed_segment::AttributedSegment;
    use crate::transcript::domain::pipeline_result::{PipelineResult, ResultMetadata};
    use crate::transcript::domain::word_span::WordSpan;
    use tempfile::TempDir;

    fn result() -> PipelineResult {
        PipelineResult {
            segments: vec![AttributedSegment::open(
                "SPEAKER_0",
                WordSpan::new("hello", 0.0, 0.5),
            )],
            metadata: ResultMetadata {
                speaker_count: 1,
                language: "en".to_string(),
                duration_secs: 1.0,
            },
        }
    }

    #[test]
    fn test_factory_returns_matching_kind() {
        for kind in OutputKind::ALL {
            assert_eq!(formatter_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_save_replaces_extension() {
        let tmp = TempDir::new().unwrap();
        let requested = tmp.path().join("out").join("talk.wav");

        let written = formatter_for(OutputKind::Subtitle)
            .save(&result(), &requested)
            .unwrap();

        assert_eq!(written, tmp.path().join("out").join("talk.srt"));
        let body = std::fs::read_to_string(&written).unwrap();
        assert!(body.contains("hello"));
    }

    #[test]
    fn test_save_reports_unwritable_target() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = formatter_for(OutputKind::PlainText)
            .save(&result(), &blocker.join("talk"))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::output::domain::transcript_formatter::FormatError::Write { .. }
        ));
    }
}
