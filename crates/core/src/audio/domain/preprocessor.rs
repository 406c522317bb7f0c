use std::path::{Path, PathBuf};

use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::stage_control::StageControl;

/// Mono audio at a fixed sample rate, ready for diarization and recognition.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedAudio {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

/// Domain interface for format conversion and loudness normalization.
pub trait AudioPreprocessor: Send {
    fn normalize(
        &self,
        input: &Path,
        work_dir: &Path,
        control: &dyn StageControl,
    ) -> Result<NormalizedAudio, CollaboratorError>;
}
