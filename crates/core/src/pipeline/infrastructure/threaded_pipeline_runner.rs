use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::error::ErrorKind;
use crate::pipeline::outcome::PipelineOutcome;
use crate::pipeline::progress_sink::ProgressSink;
use crate::pipeline::request::PipelineRequest;
use crate::pipeline::stage::{ProgressEvent, StageName};
use crate::pipeline::transcribe_pipeline::TranscribePipeline;
use crate::shared::cancellation::CancellationToken;

/// Messages sent from the worker thread to the caller.
#[derive(Debug, Clone)]
pub enum PipelineMessage {
    Progress(ProgressEvent),
    Finished(PipelineOutcome),
}

/// Forwards progress over a channel. A dropped receiver is ignored so the
/// run keeps going (and cleans up) even if nobody is listening.
struct ChannelProgressSink {
    tx: Sender<PipelineMessage>,
}

impl ProgressSink for ChannelProgressSink {
    fn on_progress(&mut self, event: &ProgressEvent) {
        let _ = self.tx.send(PipelineMessage::Progress(event.clone()));
    }
}

/// Caller-side handle for a run executing on a worker thread.
pub struct PipelineHandle {
    receiver: Receiver<PipelineMessage>,
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn receiver(&self) -> &Receiver<PipelineMessage> {
        &self.receiver
    }

    /// Request cancellation. Returns `true` for the first request only.
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Block until the worker finishes, handing each progress event to
    /// `on_progress`. A worker that dies without reporting yields a failed
    /// outcome attributed to the last stage seen.
    pub fn wait_with(mut self, mut on_progress: impl FnMut(&ProgressEvent)) -> PipelineOutcome {
        let mut last_stage: Option<StageName> = None;
        let mut outcome = None;
        for message in self.receiver.iter() {
            match message {
                PipelineMessage::Progress(event) => {
                    last_stage = Some(event.stage);
                    on_progress(&event);
                }
                PipelineMessage::Finished(result) => {
                    outcome = Some(result);
                    break;
                }
            }
        }

        let panicked = match self.join.take() {
            Some(handle) => handle.join().is_err(),
            None => false,
        };

        outcome.unwrap_or_else(|| {
            log::error!("Pipeline worker exited without an outcome (panicked: {panicked})");
            PipelineOutcome::Failed {
                stage: last_stage,
                kind: ErrorKind::Panicked,
                message: "pipeline worker stopped unexpectedly".to_string(),
            }
        })
    }

    /// Like [`wait_with`](Self::wait_with), feeding `sink` and asking it for
    /// its summary once the run is over.
    pub fn wait_into(self, sink: &mut dyn ProgressSink) -> PipelineOutcome {
        let outcome = self.wait_with(|event| sink.on_progress(event));
        sink.summary();
        outcome
    }

    pub fn wait(self) -> PipelineOutcome {
        self.wait_with(|_| {})
    }
}

/// Run `pipeline` on a background thread. Progress and the final outcome
/// arrive on the returned handle's channel.
pub fn spawn(pipeline: TranscribePipeline, request: PipelineRequest) -> PipelineHandle {
    let (tx, rx) = crossbeam_channel::unbounded::<PipelineMessage>();
    let token = pipeline.cancellation_token();

    let join = thread::Builder::new()
        .name("diarscribe-pipeline".to_string())
        .spawn(move || {
            let mut sink = ChannelProgressSink { tx: tx.clone() };
            let outcome = pipeline.run(request, &mut sink);
            let _ = tx.send(PipelineMessage::Finished(outcome));
        });

    let join = match join {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("Failed to spawn pipeline worker: {e}");
            None
        }
    };

    PipelineHandle {
        receiver: rx,
        token,
        join,
    }
}
