use std::fmt;

/// Orchestrator lifecycle. Only forward transitions in declaration order are
/// valid, plus the diarization bypass and early termination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Idle,
    Downloading,
    Preprocessing,
    Diarizing,
    Transcribing,
    Merging,
    Formatting,
    Completed,
    Cancelled,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Cancelled | PipelineState::Failed
        )
    }

    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        if self.is_terminal() {
            return false;
        }
        match next {
            Cancelled | Failed => true,
            Completed => self == Formatting,
            _ => matches!(
                (self, next),
                (Idle, Downloading)
                    | (Downloading, Preprocessing)
                    | (Preprocessing, Diarizing)
                    | (Preprocessing, Transcribing)
                    | (Diarizing, Transcribing)
                    | (Transcribing, Merging)
                    | (Merging, Formatting)
            ),
        }
    }

    /// Move to `next` if the transition is valid. Returns whether it moved.
    pub fn advance(&mut self, next: PipelineState) -> bool {
        if !self.can_advance_to(next) {
            log::warn!("Ignoring invalid pipeline transition {self} -> {next}");
            return false;
        }
        log::debug!("Pipeline state: {self} -> {next}");
        *self = next;
        true
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
