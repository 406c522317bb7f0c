use std::fmt;

use thiserror::Error;

use super::stage::{policy_for, FailurePolicy, StageName};
use crate::shared::collaborator_error::CollaboratorError;
use crate::transcript::domain::speaker_merger::MergeFailure;

/// Unified failure taxonomy for a run.
///
/// `Cancelled` is never produced by wrapping another error; the stage runner
/// maps cancellation to it before any other translation happens.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("download failed: {source}")]
    Download {
        #[source]
        source: CollaboratorError,
    },
    #[error("audio preprocessing failed: {source}")]
    Preprocess {
        #[source]
        source: CollaboratorError,
    },
    #[error("diarization failed: {source}")]
    Diarize {
        #[source]
        source: CollaboratorError,
    },
    #[error("transcription failed: {source}")]
    Transcribe {
        #[source]
        source: CollaboratorError,
    },
    #[error("merging words with speakers failed: {0}")]
    Merge(#[from] MergeFailure),
    #[error("{stage} model could not be loaded: {source}")]
    ModelLoad {
        stage: StageName,
        /// Local assets are present but unusable.
        fatal: bool,
        #[source]
        source: CollaboratorError,
    },
    #[error("{stage} stage failed: {source}")]
    Internal {
        stage: StageName,
        #[source]
        source: CollaboratorError,
    },
    #[error("could not create the run working area: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("cancelled")]
    Cancelled,
}

/// Coarse classification carried by a failed outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Download,
    Preprocess,
    Diarize,
    Transcribe,
    Merge,
    ModelLoad,
    Internal,
    Workspace,
    Cancelled,
    /// The worker thread died without reporting an outcome.
    Panicked,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Download => "download error",
            ErrorKind::Preprocess => "preprocess error",
            ErrorKind::Diarize => "diarize error",
            ErrorKind::Transcribe => "transcribe error",
            ErrorKind::Merge => "merge error",
            ErrorKind::ModelLoad => "model load error",
            ErrorKind::Internal => "internal error",
            ErrorKind::Workspace => "workspace error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Panicked => "worker panicked",
        };
        f.write_str(name)
    }
}

impl PipelineError {
    /// Translate a collaborator failure raised while `stage` was running.
    pub fn from_collaborator(stage: StageName, err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Cancelled => PipelineError::Cancelled,
            CollaboratorError::ModelUnavailable(_) => PipelineError::ModelLoad {
                stage,
                fatal: false,
                source: err,
            },
            CollaboratorError::ModelCorrupt(_) => PipelineError::ModelLoad {
                stage,
                fatal: true,
                source: err,
            },
            source => match stage {
                StageName::Download => PipelineError::Download { source },
                StageName::Preprocess => PipelineError::Preprocess { source },
                StageName::Diarize => PipelineError::Diarize { source },
                StageName::Transcribe => PipelineError::Transcribe { source },
                StageName::Merge | StageName::Format => PipelineError::Internal { stage, source },
            },
        }
    }

    /// The stage the failure belongs to. Workspace setup counts as part of
    /// the download stage since nothing else has run yet.
    pub fn stage(&self) -> Option<StageName> {
        match self {
            PipelineError::Download { .. } | PipelineError::Workspace(_) => Some(StageName::Download),
            PipelineError::Preprocess { .. } => Some(StageName::Preprocess),
            PipelineError::Diarize { .. } => Some(StageName::Diarize),
            PipelineError::Transcribe { .. } => Some(StageName::Transcribe),
            PipelineError::Merge(_) => Some(StageName::Merge),
            PipelineError::ModelLoad { stage, .. } | PipelineError::Internal { stage, .. } => {
                Some(*stage)
            }
            PipelineError::Cancelled => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Download { .. } => ErrorKind::Download,
            PipelineError::Preprocess { .. } => ErrorKind::Preprocess,
            PipelineError::Diarize { .. } => ErrorKind::Diarize,
            PipelineError::Transcribe { .. } => ErrorKind::Transcribe,
            PipelineError::Merge(_) => ErrorKind::Merge,
            PipelineError::ModelLoad { .. } => ErrorKind::ModelLoad,
            PipelineError::Internal { .. } => ErrorKind::Internal,
            PipelineError::Workspace(_) => ErrorKind::Workspace,
            PipelineError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// Whether the orchestrator may absorb this failure and continue in a
    /// degraded mode.
    pub fn is_recoverable(&self) -> bool {
        let Some(stage) = self.stage() else {
            return false;
        };
        if policy_for(stage) != FailurePolicy::RecoverableWithDefault {
            return false;
        }
        match self {
            PipelineError::ModelLoad { fatal, .. } => !fatal,
            PipelineError::Diarize { source } => {
                !matches!(source, CollaboratorError::ResourceExhausted(_))
            }
            _ => false,
        }
    }
}

/// Conversion used by the stage runner for whatever error a stage body returns.
pub trait IntoPipelineError {
    /// True when the error is the cancellation signal itself.
    fn signals_cancellation(&self) -> bool;

    fn into_pipeline_error(self, stage: StageName) -> PipelineError;
}

impl IntoPipelineError for CollaboratorError {
    fn signals_cancellation(&self) -> bool {
        self.is_cancelled()
    }

    fn into_pipeline_error(self, stage: StageName) -> PipelineError {
        PipelineError::from_collaborator(stage, self)
    }
}

impl IntoPipelineError for MergeFailure {
    fn signals_cancellation(&self) -> bool {
        false
    }

    fn into_pipeline_error(self, _stage: StageName) -> PipelineError {
        PipelineError::Merge(self)
    }
}

impl IntoPipelineError for PipelineError {
    fn signals_cancellation(&self) -> bool {
        self.is_cancelled()
    }

    fn into_pipeline_error(self, _stage: StageName) -> PipelineError {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::download(StageName::Download, ErrorKind::Download)]
    #[case::preprocess(StageName::Preprocess, ErrorKind::Preprocess)]
    #[case::diarize(StageName::Diarize, ErrorKind::Diarize)]
    #[case::transcribe(StageName::Transcribe, ErrorKind::Transcribe)]
    #[case::merge(StageName::Merge, ErrorKind::Internal)]
    fn test_generic_failure_maps_to_stage_kind(#[case] stage: StageName, #[case] kind: ErrorKind) {
        let err = PipelineError::from_collaborator(stage, CollaboratorError::other("boom"));
        assert_eq!(err.kind(), kind);
        assert_eq!(err.stage(), Some(stage));
    }

    #[rstest]
    #[case::download(StageName::Download)]
    #[case::diarize(StageName::Diarize)]
    #[case::transcribe(StageName::Transcribe)]
    fn test_cancellation_is_never_relabelled(#[case] stage: StageName) {
        let err = PipelineError::from_collaborator(stage, CollaboratorError::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_model_errors_carry_fatality() {
        let missing = PipelineError::from_collaborator(
            StageName::Diarize,
            CollaboratorError::ModelUnavailable("no token".into()),
        );
        let corrupt = PipelineError::from_collaborator(
            StageName::Diarize,
            CollaboratorError::ModelCorrupt("bad weights".into()),
        );
        assert!(matches!(missing, PipelineError::ModelLoad { fatal: false, .. }));
        assert!(matches!(corrupt, PipelineError::ModelLoad { fatal: true, .. }));
        assert!(missing.is_recoverable());
        assert!(!corrupt.is_recoverable());
    }

    #[rstest]
    #[case::diarize_other(StageName::Diarize, CollaboratorError::other("crash"), true)]
    #[case::diarize_transient(StageName::Diarize, CollaboratorError::Transient("reset".into()), true)]
    #[case::diarize_exhausted(
        StageName::Diarize,
        CollaboratorError::ResourceExhausted("out of memory".into()),
        false
    )]
    #[case::transcribe_missing_model(
        StageName::Transcribe,
        CollaboratorError::ModelUnavailable("no model".into()),
        false
    )]
    #[case::download(StageName::Download, CollaboratorError::other("404"), false)]
    fn test_recoverability(
        #[case] stage: StageName,
        #[case] err: CollaboratorError,
        #[case] expected: bool,
    ) {
        assert_eq!(PipelineError::from_collaborator(stage, err).is_recoverable(), expected);
    }

    #[test]
    fn test_message_includes_cause() {
        let err = PipelineError::from_collaborator(
            StageName::Download,
            CollaboratorError::InvalidSource("not a video link".into()),
        );
        assert_eq!(
            err.to_string(),
            "download failed: invalid source: not a video link"
        );
    }

    #[test]
    fn test_merge_failure_converts() {
        let err: PipelineError = MergeFailure::NoSegments { words: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::Merge);
        assert!(!err.is_recoverable());
    }
}
