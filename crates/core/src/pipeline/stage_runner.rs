use std::cell::{Cell, RefCell};

use super::error::{IntoPipelineError, PipelineError};
use super::progress_sink::ProgressSink;
use super::stage::{ProgressEvent, StageName};
use crate::shared::cancellation::{CancelCheck, CancellationToken};
use crate::shared::stage_control::StageControl;

/// Executes named stages against one run's cancellation token and sink.
///
/// Every stage gets a start event (fraction 0) and, on success, an end
/// event (fraction 1). Failures are translated into [`PipelineError`] with
/// cancellation checked first: a cancelled run never reports a stage
/// failure, whatever the stage body returned.
pub struct StageRunner<'s> {
    token: CancellationToken,
    sink: RefCell<&'s mut dyn ProgressSink>,
}

impl<'s> StageRunner<'s> {
    pub fn new(token: CancellationToken, sink: &'s mut dyn ProgressSink) -> Self {
        Self {
            token,
            sink: RefCell::new(sink),
        }
    }

    pub fn run<T, E, F>(&self, stage: StageName, work: F) -> Result<T, PipelineError>
    where
        E: IntoPipelineError,
        F: FnOnce(&StageContext<'_, 's>) -> Result<T, E>,
    {
        if self.token.is_cancelled() {
            log::debug!("Skipping {stage}: run already cancelled");
            return Err(PipelineError::Cancelled);
        }

        let ctx = StageContext {
            runner: self,
            stage,
            last_fraction: Cell::new(0.0),
        };
        self.emit(stage, 0.0, "started");

        match work(&ctx) {
            Ok(value) => {
                ctx.report(1.0, "finished");
                Ok(value)
            }
            Err(err) if err.signals_cancellation() || self.token.is_cancelled() => {
                log::debug!("{stage} stopped by cancellation");
                Err(PipelineError::Cancelled)
            }
            Err(err) => Err(err.into_pipeline_error(stage)),
        }
    }

    /// Report an out-of-band condition for `stage`, e.g. a recoverable failure.
    pub fn note(&self, stage: StageName, fraction: f64, message: &str) {
        self.emit(stage, fraction, message);
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    fn emit(&self, stage: StageName, fraction: f64, message: &str) {
        let event = ProgressEvent::new(stage, fraction, message);
        self.sink.borrow_mut().on_progress(&event);
    }
}

/// The capability handed to a stage body.
pub struct StageContext<'r, 's> {
    runner: &'r StageRunner<'s>,
    stage: StageName,
    last_fraction: Cell<f64>,
}

impl StageContext<'_, '_> {
    pub fn stage(&self) -> StageName {
        self.stage
    }
}

impl CancelCheck for StageContext<'_, '_> {
    fn is_cancelled(&self) -> bool {
        self.runner.token.is_cancelled()
    }
}

impl StageControl for StageContext<'_, '_> {
    fn report(&self, fraction: f64, message: &str) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0).max(self.last_fraction.get());
        self.last_fraction.set(fraction);
        self.runner.emit(self.stage, fraction, message);
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.runner.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress_sink::RecordingSink;
    use crate::shared::collaborator_error::CollaboratorError;
    use approx::assert_relative_eq;

    fn fractions(sink: &RecordingSink) -> Vec<f64> {
        sink.events.iter().map(|e| e.fraction).collect()
    }

    #[test]
    fn test_emits_start_and_end_events() {
        let mut sink = RecordingSink::default();
        let runner = StageRunner::new(CancellationToken::new(), &mut sink);

        let value = runner
            .run(StageName::Download, |_| Ok::<_, CollaboratorError>(42))
            .unwrap();
        drop(runner);

        assert_eq!(value, 42);
        assert_eq!(fractions(&sink), vec![0.0, 1.0]);
        assert!(sink.events.iter().all(|e| e.stage == StageName::Download));
    }

    #[test]
    fn test_reported_fractions_never_decrease() {
        let mut sink = RecordingSink::default();
        let runner = StageRunner::new(CancellationToken::new(), &mut sink);

        runner
            .run(StageName::Transcribe, |ctx| {
                ctx.report(0.5, "half");
                ctx.report(0.3, "late report");
                ctx.report(2.0, "overshoot");
                ctx.report(f64::NAN, "ignored");
                Ok::<_, CollaboratorError>(())
            })
            .unwrap();
        drop(runner);

        let seen = fractions(&sink);
        assert_eq!(seen.len(), 5);
        assert_relative_eq!(seen[1], 0.5);
        assert_relative_eq!(seen[2], 0.5);
        assert_relative_eq!(seen[3], 1.0);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_failure_is_translated_to_stage_error() {
        let mut sink = RecordingSink::default();
        let runner = StageRunner::new(CancellationToken::new(), &mut sink);

        let err = runner
            .run(StageName::Preprocess, |_| {
                Err::<(), _>(CollaboratorError::other("corrupt container"))
            })
            .unwrap_err();

        assert!(matches!(err, PipelineError::Preprocess { .. }));
        assert!(err.to_string().contains("corrupt container"));
    }

    #[test]
    fn test_cancellation_wins_over_generic_failure() {
        let mut sink = RecordingSink::default();
        let runner = StageRunner::new(CancellationToken::new(), &mut sink);

        let err = runner
            .run(StageName::Transcribe, |ctx| {
                ctx.cancellation_token().cancel();
                Err::<(), _>(CollaboratorError::other("interrupted read"))
            })
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[test]
    fn test_cancelled_collaborator_error_passes_through() {
        let mut sink = RecordingSink::default();
        let runner = StageRunner::new(CancellationToken::new(), &mut sink);

        let err = runner
            .run(StageName::Diarize, |_| Err::<(), _>(CollaboratorError::Cancelled))
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[test]
    fn test_already_cancelled_token_skips_stage() {
        let token = CancellationToken::new();
        token.cancel();
        let mut sink = RecordingSink::default();
        let runner = StageRunner::new(token, &mut sink);
        let mut ran = false;

        let err = runner
            .run(StageName::Download, |_| {
                ran = true;
                Ok::<_, CollaboratorError>(())
            })
            .unwrap_err();
        drop(runner);

        assert!(err.is_cancelled());
        assert!(!ran);
        assert!(sink.events.is_empty());
    }

    #[test]
    fn test_context_polls_shared_token() {
        let token = CancellationToken::new();
        let mut sink = RecordingSink::default();
        let runner = StageRunner::new(token.clone(), &mut sink);

        let result = runner.run(StageName::Transcribe, |ctx| {
            ctx.check_cancelled()?;
            token.cancel();
            ctx.check_cancelled()?;
            Ok::<_, CollaboratorError>(())
        });

        assert!(result.unwrap_err().is_cancelled());
    }
}
