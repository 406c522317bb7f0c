use super::error::{ErrorKind, PipelineError};
use super::stage::StageName;
use crate::transcript::domain::pipeline_result::PipelineResult;

/// Terminal result of one run.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineOutcome {
    Completed(PipelineResult),
    /// Stopped on request. Carries no error.
    Cancelled,
    Failed {
        stage: Option<StageName>,
        kind: ErrorKind,
        message: String,
    },
}

impl PipelineOutcome {
    pub fn from_error(err: &PipelineError) -> Self {
        if err.is_cancelled() {
            return PipelineOutcome::Cancelled;
        }
        PipelineOutcome::Failed {
            stage: err.stage(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineOutcome::Cancelled)
    }

    pub fn result(&self) -> Option<&PipelineResult> {
        match self {
            PipelineOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<PipelineResult> {
        match self {
            PipelineOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }
}
