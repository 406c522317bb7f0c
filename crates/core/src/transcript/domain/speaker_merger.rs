use std::cmp::Ordering;

use thiserror::Error;

use super::attributed_segment::AttributedSegment;
use super::speaker_segment::SpeakerSegment;
use super::word_span::WordSpan;
use crate::shared::constants::SINGLE_SPEAKER_LABEL;

#[derive(Error, Debug, PartialEq)]
pub enum MergeFailure {
    #[error("{words} words but no speaker segments to attribute them to")]
    NoSegments { words: usize },
    #[error("word {index} ({text:?}) has non-finite bounds")]
    InvalidWord { index: usize, text: String },
    #[error("speaker segment {index} ({speaker}) has non-finite bounds")]
    InvalidSegment { index: usize, speaker: String },
}

/// Joins word timestamps with diarization turns into speaker-attributed runs.
///
/// Each word goes to the speaker whose turn contains its midpoint. When
/// several turns contain it, the earliest-starting turn wins. When none do,
/// the turn with the nearest boundary wins, again breaking ties by earliest
/// start. Consecutive words of one speaker form one segment.
pub struct SpeakerMerger;

impl SpeakerMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(
        &self,
        words: &[WordSpan],
        segments: &[SpeakerSegment],
    ) -> Result<Vec<AttributedSegment>, MergeFailure> {
        validate(words, segments)?;
        if words.is_empty() {
            return Ok(Vec::new());
        }

        let mut merged: Vec<AttributedSegment> = Vec::new();
        for word in words {
            // validate() guarantees at least one segment
            let speaker = match Self::assign_speaker(word, segments) {
                Some(s) => s,
                None => return Err(MergeFailure::NoSegments { words: words.len() }),
            };
            match merged.last_mut() {
                Some(current) if current.speaker == speaker => current.push(word.clone()),
                _ => merged.push(AttributedSegment::open(speaker, word.clone())),
            }
        }

        log::debug!(
            "Merged {} words into {} speaker runs",
            words.len(),
            merged.len()
        );
        Ok(merged)
    }

    /// Pick the speaker for one word. Pure: same inputs, same answer.
    pub fn assign_speaker<'a>(word: &WordSpan, segments: &'a [SpeakerSegment]) -> Option<&'a str> {
        let mid = word.midpoint();

        let containing = segments
            .iter()
            .filter(|s| s.interval().contains(mid))
            .min_by(|a, b| a.start.total_cmp(&b.start));
        if let Some(seg) = containing {
            return Some(seg.speaker.as_str());
        }

        segments
            .iter()
            .min_by(|a, b| {
                let da = a.interval().distance_to(mid);
                let db = b.interval().distance_to(mid);
                match da.total_cmp(&db) {
                    Ordering::Equal => a.start.total_cmp(&b.start),
                    other => other,
                }
            })
            .map(|s| s.speaker.as_str())
    }

    /// Synthetic turn covering the whole recording for single-speaker mode.
    pub fn single_speaker_segment(duration_secs: f64) -> SpeakerSegment {
        SpeakerSegment::new(SINGLE_SPEAKER_LABEL, 0.0, duration_secs.max(0.0))
    }
}

impl Default for SpeakerMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(words: &[WordSpan], segments: &[SpeakerSegment]) -> Result<(), MergeFailure> {
    if !words.is_empty() && segments.is_empty() {
        return Err(MergeFailure::NoSegments { words: words.len() });
    }
    if let Some((index, w)) = words
        .iter()
        .enumerate()
        .find(|(_, w)| !w.interval().is_finite())
    {
        return Err(MergeFailure::InvalidWord {
            index,
            text: w.text.clone(),
        });
    }
    if let Some((index, s)) = segments
        .iter()
        .enumerate()
        .find(|(_, s)| !s.interval().is_finite())
    {
        return Err(MergeFailure::InvalidSegment {
            index,
            speaker: s.speaker.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn word(text: &str, start: f64, end: f64) -> WordSpan {
        WordSpan::new(text, start, end)
    }

    fn seg(speaker: &str, start: f64, end: f64) -> SpeakerSegment {
        SpeakerSegment::new(speaker, start, end)
    }

    fn flatten(merged: &[AttributedSegment]) -> Vec<WordSpan> {
        merged.iter().flat_map(|m| m.words.iter().cloned()).collect()
    }

    #[test]
    fn test_two_speakers_with_gap() {
        let words = vec![
            word("hi", 0.0, 0.4),
            word("there", 0.5, 0.9),
            word("bye", 3.0, 3.4),
        ];
        let segments = vec![seg("S0", 0.0, 1.0), seg("S1", 2.5, 4.0)];

        let merged = SpeakerMerger::new().merge(&words, &segments).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].speaker, "S0");
        assert_eq!(merged[0].text, "hi there");
        assert_relative_eq!(merged[0].start, 0.0);
        assert_relative_eq!(merged[0].end, 0.9);
        assert_eq!(merged[1].speaker, "S1");
        assert_eq!(merged[1].text, "bye");
        assert_relative_eq!(merged[1].start, 3.0);
        assert_relative_eq!(merged[1].end, 3.4);
    }

    #[test]
    fn test_gap_word_goes_to_nearest_boundary() {
        // midpoint 1.2: 0.2 past S0's end, 1.3 before S1's start
        let w = word("um", 1.1, 1.3);
        let segments = vec![seg("S0", 0.0, 1.0), seg("S1", 2.5, 4.0)];
        assert_eq!(SpeakerMerger::assign_speaker(&w, &segments), Some("S0"));
    }

    #[test]
    fn test_overlapping_turns_prefer_earliest_start() {
        let w = word("yes", 1.5, 1.7);
        let segments = vec![seg("S1", 1.0, 3.0), seg("S0", 0.0, 2.0)];
        assert_eq!(SpeakerMerger::assign_speaker(&w, &segments), Some("S0"));
    }

    #[test]
    fn test_equal_distance_prefers_earliest_start() {
        // midpoint 2.0 sits exactly between S0 ending at 1.0 and S1 starting at 3.0
        let w = word("so", 1.5, 2.5);
        let segments = vec![seg("S1", 3.0, 4.0), seg("S0", 0.0, 1.0)];
        assert_eq!(SpeakerMerger::assign_speaker(&w, &segments), Some("S0"));
    }

    #[test]
    fn test_midpoint_on_end_boundary_belongs_to_next_turn() {
        let w = word("and", 0.5, 1.5);
        let segments = vec![seg("S0", 0.0, 1.0), seg("S1", 1.0, 2.0)];
        assert_eq!(SpeakerMerger::assign_speaker(&w, &segments), Some("S1"));
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let w = word("again", 1.1, 1.3);
        let segments = vec![seg("S0", 0.0, 1.0), seg("S1", 1.5, 2.0)];
        let first = SpeakerMerger::assign_speaker(&w, &segments);
        for _ in 0..10 {
            assert_eq!(SpeakerMerger::assign_speaker(&w, &segments), first);
        }
    }

    #[test]
    fn test_alternating_speakers_produce_separate_runs() {
        let words = vec![
            word("a", 0.0, 0.5),
            word("b", 1.0, 1.5),
            word("c", 2.0, 2.5),
            word("d", 2.6, 2.9),
        ];
        let segments = vec![seg("S0", 0.0, 1.0), seg("S1", 1.0, 2.0), seg("S0", 2.0, 3.0)];

        let merged = SpeakerMerger::new().merge(&words, &segments).unwrap();

        let speakers: Vec<&str> = merged.iter().map(|m| m.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["S0", "S1", "S0"]);
        assert_eq!(merged[2].text, "c d");
    }

    #[test]
    fn test_every_word_appears_once_in_order() {
        let words: Vec<WordSpan> = (0..50)
            .map(|i| word(&format!("w{i}"), i as f64 * 0.3, i as f64 * 0.3 + 0.2))
            .collect();
        let segments = vec![
            seg("S0", 0.0, 4.0),
            seg("S1", 3.5, 9.0),
            seg("S2", 11.0, 12.0),
            seg("S0", 12.5, 20.0),
        ];

        let merged = SpeakerMerger::new().merge(&words, &segments).unwrap();

        assert_eq!(flatten(&merged), words);
        for pair in merged.windows(2) {
            assert_ne!(pair[0].speaker, pair[1].speaker);
        }
    }

    #[test]
    fn test_single_speaker_segment_yields_one_label() {
        let words = vec![word("one", 0.0, 0.5), word("two", 10.0, 10.5), word("three", 99.0, 99.5)];
        let segments = vec![SpeakerMerger::single_speaker_segment(30.0)];

        let merged = SpeakerMerger::new().merge(&words, &segments).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].speaker, SINGLE_SPEAKER_LABEL);
        assert_eq!(merged[0].text, "one two three");
    }

    #[test]
    fn test_no_words_yields_no_segments() {
        let merged = SpeakerMerger::new().merge(&[], &[]).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_words_without_segments_fail() {
        let err = SpeakerMerger::new()
            .merge(&[word("hi", 0.0, 0.1)], &[])
            .unwrap_err();
        assert_eq!(err, MergeFailure::NoSegments { words: 1 });
    }

    #[test]
    fn test_non_finite_word_fails() {
        let err = SpeakerMerger::new()
            .merge(&[word("bad", f64::NAN, 0.1)], &[seg("S0", 0.0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, MergeFailure::InvalidWord { index: 0, .. }));
    }

    #[test]
    fn test_non_finite_segment_fails() {
        let err = SpeakerMerger::new()
            .merge(&[word("ok", 0.0, 0.1)], &[seg("S0", 0.0, f64::INFINITY)])
            .unwrap_err();
        assert!(matches!(err, MergeFailure::InvalidSegment { index: 0, .. }));
    }
}
