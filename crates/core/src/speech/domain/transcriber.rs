use crate::audio::domain::preprocessor::NormalizedAudio;
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::stage_control::StageControl;
use crate::transcript::domain::word_span::WordSpan;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TranscribeOptions {
    /// `None` lets the recognizer detect the language.
    pub language: Option<String>,
    pub apply_voice_filter: bool,
    pub force_cpu: bool,
}

/// Recognized words in time order plus the language they were decoded in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    pub words: Vec<WordSpan>,
    pub language: String,
}

/// Domain interface for speech-to-text with word-level timestamps.
pub trait Transcriber: Send {
    fn transcribe(
        &self,
        audio: &NormalizedAudio,
        options: &TranscribeOptions,
        control: &dyn StageControl,
    ) -> Result<Transcript, CollaboratorError>;
}
