use std::fmt;
use std::num::NonZeroU32;

use crate::audio::domain::preprocessor::NormalizedAudio;
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::stage_control::StageControl;
use crate::transcript::domain::speaker_segment::SpeakerSegment;

#[derive(Clone, Default)]
pub struct DiarizeOptions {
    pub target_speakers: Option<NonZeroU32>,
    pub credential: Option<String>,
    pub force_cpu: bool,
}

impl fmt::Debug for DiarizeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiarizeOptions")
            .field("target_speakers", &self.target_speakers)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("force_cpu", &self.force_cpu)
            .finish()
    }
}

/// Domain interface for speaker diarization.
///
/// Returns speaker turns ordered by start time. A missing model or
/// credential is reported as `CollaboratorError::ModelUnavailable`.
pub trait Diarizer: Send {
    fn diarize(
        &self,
        audio: &NormalizedAudio,
        options: &DiarizeOptions,
        control: &dyn StageControl,
    ) -> Result<Vec<SpeakerSegment>, CollaboratorError>;
}
