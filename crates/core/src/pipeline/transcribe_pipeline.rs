use std::path::{Path, PathBuf};

use super::error::PipelineError;
use super::outcome::PipelineOutcome;
use super::progress_sink::ProgressSink;
use super::request::{PipelineOptions, PipelineRequest};
use super::run_workspace::RunWorkspace;
use super::stage::StageName;
use super::stage_runner::StageRunner;
use super::state::PipelineState;
use crate::acquisition::domain::downloader::Downloader;
use crate::audio::domain::preprocessor::{AudioPreprocessor, NormalizedAudio};
use crate::diarization::domain::diarizer::{DiarizeOptions, Diarizer};
use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::AUTO_LANGUAGE;
use crate::speech::domain::transcriber::{TranscribeOptions, Transcriber};
use crate::transcript::domain::pipeline_result::{PipelineResult, ResultMetadata};
use crate::transcript::domain::result_assembler::ResultAssembler;
use crate::transcript::domain::speaker_merger::SpeakerMerger;
use crate::transcript::domain::speaker_segment::{distinct_speakers, SpeakerSegment};

const UNKNOWN_LANGUAGE: &str = "unknown";

/// Orchestrates one transcription run: download, preprocess, optional
/// diarization, transcription, merge and result assembly.
///
/// This is a single-use struct: `run` consumes it. Concurrent runs need
/// separate instances, each with its own cancellation token and workspace.
pub struct TranscribePipeline {
    downloader: Box<dyn Downloader>,
    preprocessor: Box<dyn AudioPreprocessor>,
    diarizer: Option<Box<dyn Diarizer>>,
    transcriber: Box<dyn Transcriber>,
    merger: SpeakerMerger,
    token: CancellationToken,
    workspace_root: Option<PathBuf>,
}

impl TranscribePipeline {
    /// `diarizer` is `None` when no usable model or credential exists; the
    /// run then goes straight to single-speaker mode.
    pub fn new(
        downloader: Box<dyn Downloader>,
        preprocessor: Box<dyn AudioPreprocessor>,
        diarizer: Option<Box<dyn Diarizer>>,
        transcriber: Box<dyn Transcriber>,
    ) -> Self {
        Self {
            downloader,
            preprocessor,
            diarizer,
            transcriber,
            merger: SpeakerMerger::new(),
            token: CancellationToken::new(),
            workspace_root: None,
        }
    }

    /// Create run workspaces under `root` instead of the system temp dir.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Handle for cancelling the run from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn run(self, request: PipelineRequest, sink: &mut dyn ProgressSink) -> PipelineOutcome {
        let mut state = PipelineState::Idle;
        log::info!("Starting run for {}", request.url());
        log::debug!("Run options: {:?}", request.options());

        let outcome = match self.execute(&request, sink, &mut state) {
            Ok(result) => {
                state.advance(PipelineState::Completed);
                log::info!(
                    "Run completed: {} segments, {} speaker(s), language {}",
                    result.segments.len(),
                    result.metadata.speaker_count,
                    result.metadata.language
                );
                PipelineOutcome::Completed(result)
            }
            Err(err) if err.is_cancelled() => {
                log::info!("Run cancelled while {state}");
                state.advance(PipelineState::Cancelled);
                PipelineOutcome::Cancelled
            }
            Err(err) => {
                log::error!("Run failed while {state}: {err}");
                state.advance(PipelineState::Failed);
                PipelineOutcome::from_error(&err)
            }
        };

        sink.summary();
        outcome
    }

    fn execute(
        &self,
        request: &PipelineRequest,
        sink: &mut dyn ProgressSink,
        state: &mut PipelineState,
    ) -> Result<PipelineResult, PipelineError> {
        if self.token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let workspace =
            RunWorkspace::create(self.workspace_root.as_deref()).map_err(PipelineError::Workspace)?;
        let result = self.run_stages(request, sink, state, workspace.path());
        workspace.close();
        result
    }

    fn run_stages(
        &self,
        request: &PipelineRequest,
        sink: &mut dyn ProgressSink,
        state: &mut PipelineState,
        work_dir: &Path,
    ) -> Result<PipelineResult, PipelineError> {
        let runner = StageRunner::new(self.token.clone(), sink);
        let options = request.options();

        state.advance(PipelineState::Downloading);
        let raw = runner.run(StageName::Download, |ctx| {
            self.downloader.fetch(request.url(), work_dir, ctx)
        })?;

        state.advance(PipelineState::Preprocessing);
        let audio = runner.run(StageName::Preprocess, |ctx| {
            self.preprocessor.normalize(&raw, work_dir, ctx)
        })?;

        let speaker_segments = self.diarize(&runner, options, &audio, state)?;

        state.advance(PipelineState::Transcribing);
        let transcribe_options = TranscribeOptions {
            language: options.language.clone(),
            apply_voice_filter: options.voice_filter,
            force_cpu: options.force_cpu,
        };
        let transcript = runner.run(StageName::Transcribe, |ctx| {
            self.transcriber.transcribe(&audio, &transcribe_options, ctx)
        })?;

        state.advance(PipelineState::Merging);
        let (segments, speaker_count) = match speaker_segments {
            Some(segments) => {
                let count = distinct_speakers(&segments);
                (segments, count)
            }
            None => (vec![SpeakerMerger::single_speaker_segment(audio.duration_secs)], 1),
        };
        let merged = runner.run(StageName::Merge, |_| {
            self.merger.merge(&transcript.words, &segments)
        })?;

        state.advance(PipelineState::Formatting);
        let metadata = ResultMetadata {
            speaker_count,
            language: resolve_language(&transcript.language, options),
            duration_secs: audio.duration_secs,
        };
        runner.run(StageName::Format, |_| {
            Ok::<_, PipelineError>(ResultAssembler::assemble(merged, metadata))
        })
    }

    /// Speaker turns, or `None` for single-speaker mode.
    fn diarize(
        &self,
        runner: &StageRunner<'_>,
        options: &PipelineOptions,
        audio: &NormalizedAudio,
        state: &mut PipelineState,
    ) -> Result<Option<Vec<SpeakerSegment>>, PipelineError> {
        if !options.diarize {
            log::info!("Diarization disabled; using a single speaker");
            return Ok(None);
        }
        let Some(diarizer) = self.diarizer.as_deref() else {
            log::info!("No diarization model or credential available; using a single speaker");
            return Ok(None);
        };

        state.advance(PipelineState::Diarizing);
        let diarize_options = DiarizeOptions {
            target_speakers: options.target_speakers,
            credential: options.credential.clone(),
            force_cpu: options.force_cpu,
        };
        match runner.run(StageName::Diarize, |ctx| {
            diarizer.diarize(audio, &diarize_options, ctx)
        }) {
            Ok(segments) if segments.is_empty() => {
                log::warn!("Diarization found no speaker turns; using a single speaker");
                runner.note(
                    StageName::Diarize,
                    1.0,
                    "no speaker turns found, continuing with a single speaker",
                );
                Ok(None)
            }
            Ok(segments) => {
                log::info!(
                    "Diarization found {} turns from {} speaker(s)",
                    segments.len(),
                    distinct_speakers(&segments)
                );
                Ok(Some(segments))
            }
            Err(err) if err.is_recoverable() => {
                log::warn!("Diarization unavailable, falling back to a single speaker: {err}");
                runner.note(
                    StageName::Diarize,
                    1.0,
                    &format!("{err}; continuing with a single speaker"),
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Detected language if the recognizer reported one, else the requested one.
fn resolve_language(detected: &str, options: &PipelineOptions) -> String {
    let detected = detected.trim();
    if !detected.is_empty() && detected != AUTO_LANGUAGE {
        return detected.to_string();
    }
    options
        .language
        .clone()
        .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string())
}
