use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures reported by external collaborators (downloader, preprocessor,
/// diarizer, transcriber).
///
/// The stage runner translates these into the stage-specific
/// `PipelineError`; `Cancelled` always passes through untouched.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("cancelled")]
    Cancelled,
    #[error("invalid source: {0}")]
    InvalidSource(String),
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("model or credential unavailable: {0}")]
    ModelUnavailable(String),
    #[error("model assets unusable: {0}")]
    ModelCorrupt(String),
    #[error("resources exhausted: {0}")]
    ResourceExhausted(String),
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<CollaboratorError>,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(#[source] BoxError),
}

impl CollaboratorError {
    pub fn other(err: impl Into<BoxError>) -> Self {
        CollaboratorError::Other(err.into())
    }

    /// Network hiccups and I/O errors may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CollaboratorError::Transient(_) | CollaboratorError::Io(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CollaboratorError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::transient(CollaboratorError::Transient("timeout".into()), true)]
    #[case::io(CollaboratorError::Io(std::io::Error::other("reset")), true)]
    #[case::cancelled(CollaboratorError::Cancelled, false)]
    #[case::invalid(CollaboratorError::InvalidSource("bad url".into()), false)]
    #[case::model(CollaboratorError::ModelCorrupt("bad header".into()), false)]
    #[case::other(CollaboratorError::other("boom"), false)]
    fn test_is_retryable(#[case] err: CollaboratorError, #[case] expected: bool) {
        assert_eq!(err.is_retryable(), expected);
    }

    #[test]
    fn test_retries_exhausted_keeps_last_cause() {
        let err = CollaboratorError::RetriesExhausted {
            attempts: 3,
            last: Box::new(CollaboratorError::Transient("HTTP 503".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("3 attempts"));
        assert!(msg.contains("HTTP 503"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("transient failure: HTTP 503"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CollaboratorError>();
    }
}
