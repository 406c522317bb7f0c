use crate::output::domain::timecode::clock;
use crate::output::domain::transcript_formatter::{FormatError, OutputKind, TranscriptFormatter};
use crate::transcript::domain::pipeline_result::PipelineResult;

const RULE_WIDTH: usize = 60;

/// Meeting-minutes style plain text: a short header, then one block per
/// speaker turn.
///
/// ```text
/// [00:00:02 - 00:00:07] SPEAKER_0
/// Good morning, let's get started.
/// ```
#[derive(Debug, Default)]
pub struct TextFormatter;

impl TranscriptFormatter for TextFormatter {
    fn kind(&self) -> OutputKind {
        OutputKind::PlainText
    }

    fn format(&self, result: &PipelineResult) -> Result<String, FormatError> {
        let meta = &result.metadata;
        let mut lines = vec![
            "# Transcript".to_string(),
            format!("# Speakers: {}", meta.speaker_count),
        ];
        if !meta.language.is_empty() {
            lines.push(format!("# Language: {}", meta.language));
        }
        if meta.duration_secs > 0.0 {
            lines.push(format!("# Duration: {}", clock(meta.duration_secs)));
        }
        lines.push(String::new());
        lines.push("=".repeat(RULE_WIDTH));
        lines.push(String::new());

        for seg in &result.segments {
            lines.push(format!(
                "[{} - {}] {}",
                clock(seg.start),
                clock(seg.end),
                seg.speaker
            ));
            lines.push(seg.text.clone());
            lines.push(String::new());
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::domain::attributed_segment::AttributedSegment;
    use crate::transcript::domain::pipeline_result::ResultMetadata;
    use crate::transcript::domain::word_span::WordSpan;

    fn segment(speaker: &str, words: &[(&str, f64, f64)]) -> AttributedSegment {
        let mut iter = words.iter().map(|&(t, s, e)| WordSpan::new(t, s, e));
        let first = iter.next().unwrap();
        let mut seg = AttributedSegment::open(speaker, first);
        for w in iter {
            seg.push(w);
        }
        seg
    }

    fn result(segments: Vec<AttributedSegment>, language: &str, duration: f64) -> PipelineResult {
        PipelineResult {
            metadata: ResultMetadata {
                speaker_count: 2,
                language: language.to_string(),
                duration_secs: duration,
            },
            segments,
        }
    }

    #[test]
    fn test_blocks_per_segment() {
        let r = result(
            vec![
                segment("SPEAKER_0", &[("Good", 2.0, 2.4), ("morning", 2.5, 7.2)]),
                segment("SPEAKER_1", &[("Hi", 7.5, 12.0)]),
            ],
            "en",
            65.0,
        );

        let text = TextFormatter.format(&r).unwrap();

        let expected_body = "[00:00:02 - 00:00:07] SPEAKER_0\nGood morning\n\n\
                             [00:00:07 - 00:00:12] SPEAKER_1\nHi\n";
        assert!(text.ends_with(expected_body), "got:\n{text}");
        assert!(text.starts_with("# Transcript\n# Speakers: 2\n# Language: en\n# Duration: 00:01:05\n"));
    }

    #[test]
    fn test_header_omits_unknown_fields() {
        let text = TextFormatter.format(&result(Vec::new(), "", 0.0)).unwrap();
        assert!(!text.contains("# Language"));
        assert!(!text.contains("# Duration"));
        assert!(text.contains(&"=".repeat(RULE_WIDTH)));
    }
}
