use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Run-wide cancellation flag shared between the caller and every stage.
///
/// Clones observe the same flag. Only the first `cancel` has an effect;
/// later signals are no-ops.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Returns `true` only for the first signal.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The "should I stop now" capability handed to collaborators.
pub trait CancelCheck {
    fn is_cancelled(&self) -> bool;
}

impl CancelCheck for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}
