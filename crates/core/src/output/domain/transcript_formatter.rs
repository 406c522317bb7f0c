use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::transcript::domain::pipeline_result::PipelineResult;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("unsupported output format {0:?} (expected txt, srt or json)")]
    UnknownKind(String),
    #[error("failed to serialize transcript: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Output format selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputKind {
    #[default]
    PlainText,
    Subtitle,
    Structured,
}

impl OutputKind {
    pub const ALL: [OutputKind; 3] = [
        OutputKind::PlainText,
        OutputKind::Subtitle,
        OutputKind::Structured,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::PlainText => "txt",
            OutputKind::Subtitle => "srt",
            OutputKind::Structured => "json",
        }
    }
}

impl FromStr for OutputKind {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_ascii_lowercase();
        OutputKind::ALL
            .into_iter()
            .find(|k| k.extension() == wanted)
            .ok_or_else(|| FormatError::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Domain interface for turning a finished transcript into a document.
pub trait TranscriptFormatter {
    fn kind(&self) -> OutputKind;

    fn format(&self, result: &PipelineResult) -> Result<String, FormatError>;

    fn extension(&self) -> &'static str {
        self.kind().extension()
    }

    /// Write the document next to `path`, replacing its extension with the
    /// formatter's own. Returns the path actually written.
    fn save(&self, result: &PipelineResult, path: &Path) -> Result<PathBuf, FormatError> {
        let target = path.with_extension(self.extension());
        let body = self.format(result)?;
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| FormatError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, body).map_err(|source| FormatError::Write {
            path: target.clone(),
            source,
        })?;
        log::info!("Wrote {} transcript to {}", self.kind(), target.display());
        Ok(target)
    }
}
