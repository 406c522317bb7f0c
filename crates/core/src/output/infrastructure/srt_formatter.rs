use crate::output::domain::timecode::subrip;
use crate::output::domain::transcript_formatter::{FormatError, OutputKind, TranscriptFormatter};
use crate::transcript::domain::attributed_segment::AttributedSegment;
use crate::transcript::domain::pipeline_result::PipelineResult;

/// A silence longer than this between two words starts a new cue.
const MAX_PAUSE_SECS: f64 = 1.0;
/// A cue is closed before it would run longer than this.
const MAX_CUE_SECS: f64 = 7.0;

/// SubRip subtitles. Each speaker turn becomes one or more cues, split at
/// pauses and before a cue grows too long to read. Cues carry a `[SPEAKER]`
/// prefix only when more than one speaker was found.
#[derive(Debug, Default)]
pub struct SrtFormatter;

/// Split a turn into readable cues. A turn without words is one cue.
fn cues(segment: &AttributedSegment) -> Vec<AttributedSegment> {
    let mut words = segment.words.iter();
    let Some(first) = words.next() else {
        return vec![segment.clone()];
    };

    let mut cues = Vec::new();
    let mut current = AttributedSegment::open(&segment.speaker, first.clone());
    for word in words {
        let pause = word.start - current.end;
        let too_long = word.end - current.start > MAX_CUE_SECS;
        if pause > MAX_PAUSE_SECS || too_long {
            let done = std::mem::replace(
                &mut current,
                AttributedSegment::open(&segment.speaker, word.clone()),
            );
            cues.push(done);
        } else {
            current.push(word.clone());
        }
    }
    cues.push(current);
    cues
}

impl TranscriptFormatter for SrtFormatter {
    fn kind(&self) -> OutputKind {
        OutputKind::Subtitle
    }

    fn format(&self, result: &PipelineResult) -> Result<String, FormatError> {
        let tag_speakers = result.is_multi_speaker();
        let mut lines = Vec::with_capacity(result.segments.len() * 4);
        let all_cues = result.segments.iter().flat_map(cues);
        for (i, seg) in all_cues.enumerate() {
            lines.push((i + 1).to_string());
            lines.push(format!("{} --> {}", subrip(seg.start), subrip(seg.end)));
            if tag_speakers {
                lines.push(format!("[{}] {}", seg.speaker, seg.text));
            } else {
                lines.push(seg.text.clone());
            }
            lines.push(String::new());
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::domain::pipeline_result::ResultMetadata;
    use crate::transcript::domain::word_span::WordSpan;

    fn result(speaker_count: usize, segments: Vec<AttributedSegment>) -> PipelineResult {
        PipelineResult {
            segments,
            metadata: ResultMetadata {
                speaker_count,
                language: "en".to_string(),
                duration_secs: 20.0,
            },
        }
    }

    #[test]
    fn test_multi_speaker_cues_are_tagged() {
        let r = result(
            2,
            vec![
                AttributedSegment::open("SPEAKER_0", WordSpan::new("Hello", 2.0, 7.5)),
                AttributedSegment::open("SPEAKER_1", WordSpan::new("Sure", 7.5, 12.0)),
            ],
        );

        let srt = SrtFormatter.format(&r).unwrap();

        assert_eq!(
            srt,
            "1\n00:00:02,000 --> 00:00:07,500\n[SPEAKER_0] Hello\n\n\
             2\n00:00:07,500 --> 00:00:12,000\n[SPEAKER_1] Sure\n"
        );
    }

    #[test]
    fn test_single_speaker_cues_are_untagged() {
        let r = result(
            1,
            vec![AttributedSegment::open("SPEAKER_0", WordSpan::new("Solo", 0.25, 1.0))],
        );
        let srt = SrtFormatter.format(&r).unwrap();
        assert_eq!(srt, "1\n00:00:00,250 --> 00:00:01,000\nSolo\n");
    }

    #[test]
    fn test_empty_result_is_empty_document() {
        assert_eq!(SrtFormatter.format(&result(0, Vec::new())).unwrap(), "");
    }

    fn turn(speaker: &str, words: &[(&str, f64, f64)]) -> AttributedSegment {
        let mut spans = words.iter().map(|&(w, s, e)| WordSpan::new(w, s, e));
        let mut seg = AttributedSegment::open(speaker, spans.next().unwrap());
        for span in spans {
            seg.push(span);
        }
        seg
    }

    #[test]
    fn test_long_single_speaker_turn_is_split_at_pauses() {
        let r = result(
            1,
            vec![turn(
                "SPEAKER_0",
                &[
                    ("Good", 0.0, 0.4),
                    ("morning.", 0.5, 1.0),
                    ("Today", 4.0, 4.3),
                    ("we", 4.4, 4.5),
                    ("start.", 4.6, 5.0),
                ],
            )],
        );

        let srt = SrtFormatter.format(&r).unwrap();

        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,000\nGood morning.\n\n\
             2\n00:00:04,000 --> 00:00:05,000\nToday we start.\n"
        );
    }

    #[test]
    fn test_continuous_speech_is_split_by_cue_length() {
        // one word per second with no pauses, 20 seconds long
        let words: Vec<(&str, f64, f64)> = (0..20).map(|i| ("la", i as f64, i as f64 + 0.9)).collect();
        let r = result(1, vec![turn("SPEAKER_0", &words)]);

        let srt = SrtFormatter.format(&r).unwrap();
        let cue_count = srt.lines().filter(|l| l.contains(" --> ")).count();

        assert_eq!(cue_count, 3);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:06,900\n"));
    }

    #[test]
    fn test_cue_numbering_continues_across_turns() {
        let r = result(
            2,
            vec![
                turn("SPEAKER_0", &[("One", 0.0, 0.5), ("two", 3.0, 3.5)]),
                turn("SPEAKER_1", &[("Three", 4.0, 4.5)]),
            ],
        );

        let srt = SrtFormatter.format(&r).unwrap();

        assert!(srt.contains("\n3\n00:00:04,000 --> 00:00:04,500\n[SPEAKER_1] Three\n"));
        assert!(srt.contains("[SPEAKER_0] One\n"));
        assert!(srt.contains("[SPEAKER_0] two\n"));
    }
}
