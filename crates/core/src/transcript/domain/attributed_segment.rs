use serde::Serialize;

use super::word_span::WordSpan;

/// A maximal run of consecutive words attributed to one speaker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributedSegment {
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub words: Vec<WordSpan>,
}

impl AttributedSegment {
    /// Open a segment with its first word.
    pub fn open(speaker: &str, word: WordSpan) -> Self {
        Self {
            speaker: speaker.to_string(),
            start: word.start,
            end: word.end,
            text: word.text.trim().to_string(),
            words: vec![word],
        }
    }

    /// Extend with the next word of the same speaker.
    pub fn push(&mut self, word: WordSpan) {
        let token = word.text.trim();
        if !token.is_empty() {
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(token);
        }
        self.end = word.end;
        self.words.push(word);
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
