use std::fmt;

/// One named phase of a run. Variants are declared in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageName {
    Download,
    Preprocess,
    Diarize,
    Transcribe,
    Merge,
    Format,
}

impl StageName {
    pub const ALL: &[StageName] = &[
        StageName::Download,
        StageName::Preprocess,
        StageName::Diarize,
        StageName::Transcribe,
        StageName::Merge,
        StageName::Format,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StageName::Download => "download",
            StageName::Preprocess => "preprocess",
            StageName::Diarize => "diarize",
            StageName::Transcribe => "transcribe",
            StageName::Merge => "merge",
            StageName::Format => "format",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub stage: StageName,
    /// Completion of `stage` in `[0, 1]`.
    pub fraction: f64,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(stage: StageName, fraction: f64, message: impl Into<String>) -> Self {
        Self {
            stage,
            fraction,
            message: message.into(),
        }
    }
}

/// What the orchestrator does when a stage fails with something other than
/// cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    Fatal,
    /// Continue with a default in place of the stage's output.
    RecoverableWithDefault,
}

pub fn policy_for(stage: StageName) -> FailurePolicy {
    match stage {
        StageName::Diarize => FailurePolicy::RecoverableWithDefault,
        StageName::Download
        | StageName::Preprocess
        | StageName::Transcribe
        | StageName::Merge
        | StageName::Format => FailurePolicy::Fatal,
    }
}
