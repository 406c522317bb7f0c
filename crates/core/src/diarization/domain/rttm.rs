use std::collections::BTreeMap;

use thiserror::Error;

use crate::transcript::domain::speaker_segment::SpeakerSegment;

#[derive(Error, Debug, PartialEq)]
pub enum RttmError {
    #[error("line {line}: expected at least 8 fields, found {found}")]
    TooFewFields { line: usize, found: usize },
    #[error("line {line}: invalid {field} {value:?}")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// Parse `SPEAKER` records from RTTM text.
///
/// Other record types, blank lines and `#` comments are skipped. Turns are
/// sorted by start time and labels are renamed to `SPEAKER_<n>`, numbering
/// the original labels in sorted order.
pub fn parse(text: &str) -> Result<Vec<SpeakerSegment>, RttmError> {
    let mut turns: Vec<SpeakerSegment> = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields[0] != "SPEAKER" {
            continue;
        }
        if fields.len() < 8 {
            return Err(RttmError::TooFewFields {
                line,
                found: fields.len(),
            });
        }
        let onset = parse_seconds(fields[3], line, "onset")?;
        let duration = parse_seconds(fields[4], line, "duration")?;
        turns.push(SpeakerSegment::new(fields[7], onset, onset + duration));
    }

    turns.sort_by(|a, b| a.start.total_cmp(&b.start));
    normalize_labels(&mut turns);
    Ok(turns)
}

fn parse_seconds(value: &str, line: usize, field: &'static str) -> Result<f64, RttmError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(RttmError::InvalidNumber {
            line,
            field,
            value: value.to_string(),
        }),
    }
}

fn normalize_labels(turns: &mut [SpeakerSegment]) {
    let mut labels: BTreeMap<String, String> = turns
        .iter()
        .map(|t| (t.speaker.clone(), String::new()))
        .collect();
    for (i, name) in labels.values_mut().enumerate() {
        *name = format!("SPEAKER_{i}");
    }
    for turn in turns.iter_mut() {
        if let Some(name) = labels.get(&turn.speaker) {
            turn.speaker = name.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
# progress 0.5
SPEAKER audio 1 2.50 1.50 <NA> <NA> spk_b <NA> <NA>
SPEAKER audio 1 0.00 1.00 <NA> <NA> spk_a <NA> <NA>

SPKR-INFO audio 1 <NA> <NA> <NA> unknown spk_a <NA> <NA>
SPEAKER audio 1 4.00 0.75 <NA> <NA> spk_a <NA> <NA>
";

    #[test]
    fn test_parses_sorts_and_renames() {
        let turns = parse(SAMPLE).unwrap();

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].speaker, "SPEAKER_0");
        assert_relative_eq!(turns[0].start, 0.0);
        assert_relative_eq!(turns[0].end, 1.0);
        assert_eq!(turns[1].speaker, "SPEAKER_1");
        assert_relative_eq!(turns[1].start, 2.5);
        assert_relative_eq!(turns[1].end, 4.0);
        assert_eq!(turns[2].speaker, "SPEAKER_0");
        assert_relative_eq!(turns[2].end, 4.75);
    }

    #[test]
    fn test_labels_follow_sorted_original_names() {
        let text = "SPEAKER a 1 0.0 1.0 <NA> <NA> SPEAKER_01 <NA> <NA>\n\
                    SPEAKER a 1 1.0 1.0 <NA> <NA> SPEAKER_00 <NA> <NA>\n";
        let turns = parse(text).unwrap();
        assert_eq!(turns[0].speaker, "SPEAKER_1");
        assert_eq!(turns[1].speaker, "SPEAKER_0");
    }

    #[test]
    fn test_empty_input_yields_no_turns() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_short_record_is_rejected() {
        let err = parse("SPEAKER a 1 0.0 1.0\n").unwrap_err();
        assert_eq!(err, RttmError::TooFewFields { line: 1, found: 5 });
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let err = parse("SPEAKER a 1 zero 1.0 <NA> <NA> s <NA> <NA>\n").unwrap_err();
        assert!(matches!(err, RttmError::InvalidNumber { line: 1, field: "onset", .. }));
        let err = parse("SPEAKER a 1 0.0 -1.0 <NA> <NA> s <NA> <NA>\n").unwrap_err();
        assert!(matches!(err, RttmError::InvalidNumber { field: "duration", .. }));
    }
}
