use super::cancellation::{CancelCheck, CancellationToken};
use super::collaborator_error::CollaboratorError;

/// What a collaborator may do while it works on a stage: poll for
/// cancellation at safe points and report fractional progress.
pub trait StageControl: CancelCheck {
    /// Report progress within the current stage. Fractions are clamped to
    /// `[0, 1]` and never move backwards.
    fn report(&self, fraction: f64, message: &str);

    /// A shareable handle for callbacks that must outlive a borrow of `self`.
    fn cancellation_token(&self) -> CancellationToken;

    /// Early-return guard for use with `?` at safe points.
    fn check_cancelled(&self) -> Result<(), CollaboratorError> {
        if self.is_cancelled() {
            Err(CollaboratorError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records reports; cancellation follows the wrapped token.
    #[derive(Default)]
    pub struct RecordingControl {
        pub token: CancellationToken,
        pub reports: Mutex<Vec<(f64, String)>>,
    }

    impl CancelCheck for RecordingControl {
        fn is_cancelled(&self) -> bool {
            self.token.is_cancelled()
        }
    }

    impl StageControl for RecordingControl {
        fn report(&self, fraction: f64, message: &str) {
            self.reports
                .lock()
                .unwrap()
                .push((fraction, message.to_string()));
        }

        fn cancellation_token(&self) -> CancellationToken {
            self.token.clone()
        }
    }
}
