use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::acquisition::domain::downloader::Downloader;
use crate::acquisition::domain::source_url;
use crate::shared::cancellation::{CancelCheck, CancellationToken};
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::constants::{FETCH_RETRY_DELAY_SECS, MAX_FETCH_ATTEMPTS};
use crate::shared::stage_control::StageControl;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maps an attempt's own `[0, 1]` progress onto its slice of the stage, so
/// a retry keeps moving forward instead of stalling at the previous peak.
struct AttemptControl<'a> {
    outer: &'a dyn StageControl,
    start: f64,
    width: f64,
}

impl<'a> AttemptControl<'a> {
    fn new(outer: &'a dyn StageControl, attempt: usize, max_attempts: usize) -> Self {
        let width = 1.0 / max_attempts as f64;
        Self {
            outer,
            start: (attempt - 1) as f64 * width,
            width,
        }
    }
}

impl CancelCheck for AttemptControl<'_> {
    fn is_cancelled(&self) -> bool {
        self.outer.is_cancelled()
    }
}

impl StageControl for AttemptControl<'_> {
    fn report(&self, fraction: f64, message: &str) {
        let fraction = fraction.clamp(0.0, 1.0);
        self.outer.report(self.start + fraction * self.width, message);
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.outer.cancellation_token()
    }
}

/// Decorator that validates the source URL, then retries transient
/// failures of the wrapped downloader.
///
/// Attempt `n` is preceded by a wait of `n - 1` times the base delay.
/// Validation failures, cancellation and non-retryable errors are returned
/// immediately. Each attempt reports progress within its own share of the
/// stage.
pub struct RetryingDownloader {
    inner: Box<dyn Downloader>,
    max_attempts: usize,
    base_delay: Duration,
}

impl RetryingDownloader {
    pub fn new(inner: Box<dyn Downloader>) -> Self {
        Self {
            inner,
            max_attempts: MAX_FETCH_ATTEMPTS,
            base_delay: Duration::from_secs(FETCH_RETRY_DELAY_SECS),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sleep for `delay`, waking early if the run is cancelled.
    fn wait(&self, delay: Duration, control: &dyn StageControl) -> Result<(), CollaboratorError> {
        let deadline = Instant::now() + delay;
        loop {
            control.check_cancelled()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(CANCEL_POLL_INTERVAL.min(deadline - now));
        }
    }
}

impl Downloader for RetryingDownloader {
    fn fetch(
        &self,
        url: &str,
        work_dir: &Path,
        control: &dyn StageControl,
    ) -> Result<PathBuf, CollaboratorError> {
        source_url::validate(url)?;
        let url = url.trim();

        let mut attempt = 1;
        loop {
            control.check_cancelled()?;
            log::info!("Download attempt {attempt}/{}: {url}", self.max_attempts);
            let attempt_control = AttemptControl::new(control, attempt, self.max_attempts);
            attempt_control.report(0.0, &format!("attempt {attempt}/{}", self.max_attempts));

            let err = match self.inner.fetch(url, work_dir, &attempt_control) {
                Ok(path) => return Ok(path),
                Err(err) => err,
            };
            if err.is_cancelled() || control.is_cancelled() {
                return Err(CollaboratorError::Cancelled);
            }
            if !err.is_retryable() {
                log::warn!("Download failed permanently on attempt {attempt}: {err}");
                return Err(err);
            }
            log::warn!("Download attempt {attempt} failed: {err}");
            if attempt >= self.max_attempts {
                return Err(CollaboratorError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            self.wait(self.base_delay * attempt as u32, control)?;
            attempt += 1;
        }
    }
}
