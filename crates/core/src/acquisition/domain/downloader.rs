use std::path::{Path, PathBuf};

use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::stage_control::StageControl;

/// Domain interface for retrieving the audio track of a remote source.
///
/// Implementations write into `work_dir`, which the pipeline owns and
/// removes when the run ends.
pub trait Downloader: Send {
    fn fetch(
        &self,
        url: &str,
        work_dir: &Path,
        control: &dyn StageControl,
    ) -> Result<PathBuf, CollaboratorError>;
}
