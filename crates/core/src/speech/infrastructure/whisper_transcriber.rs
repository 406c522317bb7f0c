use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use crate::audio::domain::preprocessor::NormalizedAudio;
use crate::audio::infrastructure::wav_file;
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::stage_control::StageControl;
use crate::speech::domain::transcriber::{TranscribeOptions, Transcript, Transcriber};
use crate::speech::domain::voice_activity::{speech_regions, VadConfig};
use crate::transcript::domain::word_span::WordSpan;

/// Longest stretch of audio handed to whisper in one call. Bounds the
/// latency of cancellation and the spacing of progress reports.
const DEFAULT_WINDOW_SECS: f64 = 120.0;

/// Beam width used unless overridden.
pub const DEFAULT_BEAM_SIZE: usize = 5;

/// whisper.cpp refuses input shorter than one second.
const MIN_WINDOW_SECS: f64 = 1.0;

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// The model is loaded on first use and kept for later calls. A request
/// to run on the CPU after a GPU load reloads it.
pub struct WhisperTranscriber {
    model_path: PathBuf,
    window_secs: f64,
    beam_size: usize,
    vad: VadConfig,
    model: Mutex<Option<LoadedModel>>,
}

struct LoadedModel {
    context: WhisperContext,
    use_gpu: bool,
}

/// One decoded token with absolute times in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPiece {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub probability: f32,
}

impl WhisperTranscriber {
    pub fn new(model_path: &Path) -> Result<Self, CollaboratorError> {
        if !model_path.exists() {
            return Err(CollaboratorError::ModelUnavailable(format!(
                "Whisper model not found at: {}",
                model_path.display()
            )));
        }
        Ok(Self {
            model_path: model_path.to_path_buf(),
            window_secs: DEFAULT_WINDOW_SECS,
            beam_size: DEFAULT_BEAM_SIZE,
            vad: VadConfig::default(),
            model: Mutex::new(None),
        })
    }

    pub fn with_window_secs(mut self, secs: f64) -> Self {
        self.window_secs = secs.max(MIN_WINDOW_SECS);
        self
    }

    /// Beam search width. A width of 0 or 1 decodes greedily.
    pub fn with_beam_size(mut self, beam_size: usize) -> Self {
        self.beam_size = beam_size;
        self
    }

    pub fn with_vad_config(mut self, vad: VadConfig) -> Self {
        self.vad = vad;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn create_state(&self, force_cpu: bool) -> Result<WhisperState, CollaboratorError> {
        let mut guard = self
            .model
            .lock()
            .map_err(|_| CollaboratorError::other("whisper model lock poisoned"))?;
        let use_gpu = !force_cpu;
        let reload = match guard.as_ref() {
            None => true,
            Some(loaded) => loaded.use_gpu && !use_gpu,
        };
        if reload {
            log::info!(
                "Loading whisper model {} ({})",
                self.model_path.display(),
                if use_gpu { "GPU" } else { "CPU" }
            );
            *guard = Some(LoadedModel {
                context: load_context(&self.model_path, use_gpu)?,
                use_gpu,
            });
        }
        let loaded = guard
            .as_ref()
            .ok_or_else(|| CollaboratorError::other("whisper model not loaded"))?;
        loaded
            .context
            .create_state()
            .map_err(|e| CollaboratorError::other(format!("Failed to create Whisper state: {e}")))
    }

    fn plan(&self, samples: &[f32], sample_rate: u32, voice_filter: bool) -> Vec<Range<usize>> {
        let max_len = (self.window_secs * sample_rate as f64) as usize;
        let spans = if voice_filter {
            speech_regions(samples, sample_rate, &self.vad)
        } else {
            vec![0..samples.len()]
        };
        split_windows(&spans, max_len)
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(
        &self,
        audio: &NormalizedAudio,
        options: &TranscribeOptions,
        control: &dyn StageControl,
    ) -> Result<Transcript, CollaboratorError> {
        control.check_cancelled()?;
        let decoded = wav_file::read_mono(&audio.path)?;
        let rate = decoded.sample_rate();
        let windows = self.plan(decoded.samples(), rate, options.apply_voice_filter);
        if windows.is_empty() {
            log::info!("No speech found in {}", audio.path.display());
            return Ok(Transcript {
                words: Vec::new(),
                language: options.language.clone().unwrap_or_default(),
            });
        }

        control.report(0.02, "loading speech model");
        let mut state = self.create_state(options.force_cpu)?;
        control.check_cancelled()?;

        let mut words = Vec::new();
        let mut detected: Option<String> = None;
        let total = windows.len();
        for (i, window) in windows.into_iter().enumerate() {
            control.check_cancelled()?;
            let offset = decoded.time_at_sample(window.start);
            let samples = padded(decoded.slice(window), rate);

            // Pin later windows to the language found in the first one
            let language = options.language.as_deref().or(detected.as_deref());
            let params = decode_params(language, self.beam_size);
            state
                .full(params, &samples)
                .map_err(|e| CollaboratorError::other(format!("Whisper inference failed: {e}")))?;

            if detected.is_none() && options.language.is_none() {
                let lang_id = state.full_lang_id_from_state();
                let code = whisper_rs::get_lang_str(lang_id).unwrap_or("");
                if !code.is_empty() {
                    log::info!("Detected language: {code}");
                    detected = Some(code.to_string());
                }
            }

            words.extend(
                group_words(&collect_tokens(&state))
                    .into_iter()
                    .map(|w| w.offset_by(offset)),
            );
            control.report(
                (i + 1) as f64 / total as f64,
                &format!("window {}/{}", i + 1, total),
            );
        }

        log::info!("Transcribed {} words in {} window(s)", words.len(), total);
        Ok(Transcript {
            words,
            language: detected
                .or_else(|| options.language.clone())
                .unwrap_or_default(),
        })
    }
}

fn load_context(path: &Path, use_gpu: bool) -> Result<WhisperContext, CollaboratorError> {
    if !path.exists() {
        return Err(CollaboratorError::ModelUnavailable(format!(
            "Whisper model not found at: {}",
            path.display()
        )));
    }
    let path_str = path
        .to_str()
        .ok_or_else(|| CollaboratorError::ModelCorrupt("Invalid model path".to_string()))?;
    let mut params = WhisperContextParameters::default();
    params.use_gpu(use_gpu);
    WhisperContext::new_with_params(path_str, params)
        .map_err(|e| CollaboratorError::ModelCorrupt(format!("Failed to load Whisper model: {e}")))
}

fn sampling_strategy(beam_size: usize) -> SamplingStrategy {
    if beam_size <= 1 {
        SamplingStrategy::Greedy { best_of: 1 }
    } else {
        SamplingStrategy::BeamSearch {
            beam_size: beam_size.min(i32::MAX as usize) as i32,
            patience: -1.0,
        }
    }
}

fn decode_params(language: Option<&str>, beam_size: usize) -> FullParams<'_, '_> {
    let mut params = FullParams::new(sampling_strategy(beam_size));
    params.set_language(language);
    params.set_translate(false);
    params.set_token_timestamps(true);
    params.set_no_context(true);
    params.set_suppress_blank(true);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);
    params.set_n_threads(num_cpus().min(8) as i32);
    params
}

/// Non-special tokens of the last decode, times relative to the window.
fn collect_tokens(state: &WhisperState) -> Vec<TokenPiece> {
    let mut tokens = Vec::new();
    for seg_idx in 0..state.full_n_segments() {
        let Some(segment) = state.get_segment(seg_idx) else {
            continue;
        };
        for tok_idx in 0..segment.n_tokens() {
            let Some(token) = segment.get_token(tok_idx) else {
                continue;
            };
            let Ok(text) = token.to_str() else {
                continue;
            };
            let trimmed = text.trim();
            if trimmed.starts_with('[') || trimmed.starts_with('<') {
                continue;
            }

            // Token timestamps are in centiseconds
            let data = token.token_data();
            let start = data.t0 as f64 / 100.0;
            let end = (data.t1 as f64 / 100.0).max(start);
            tokens.push(TokenPiece {
                text: text.to_string(),
                start,
                end,
                probability: token.token_probability(),
            });
        }
    }
    tokens
}

/// Join sub-word tokens into words. A token with leading whitespace opens a
/// new word; anything else continues the current one. Confidence is the mean
/// token probability.
pub fn group_words(tokens: &[TokenPiece]) -> Vec<WordSpan> {
    struct Open {
        text: String,
        start: f64,
        end: f64,
        prob_sum: f32,
        count: u32,
    }

    fn close(open: Open, out: &mut Vec<WordSpan>) {
        if open.text.is_empty() {
            return;
        }
        let confidence = open.prob_sum / open.count.max(1) as f32;
        out.push(WordSpan::new(open.text, open.start, open.end).with_confidence(confidence));
    }

    let mut words = Vec::new();
    let mut current: Option<Open> = None;
    for token in tokens {
        let piece = token.text.trim();
        if piece.is_empty() {
            continue;
        }
        let starts_word = token.text.starts_with(char::is_whitespace);
        match current.as_mut() {
            Some(open) if !starts_word => {
                open.text.push_str(piece);
                open.end = open.end.max(token.end);
                open.prob_sum += token.probability;
                open.count += 1;
            }
            _ => {
                if let Some(done) = current.take() {
                    close(done, &mut words);
                }
                current = Some(Open {
                    text: piece.to_string(),
                    start: token.start,
                    end: token.end,
                    prob_sum: token.probability,
                    count: 1,
                });
            }
        }
    }
    if let Some(done) = current {
        close(done, &mut words);
    }
    words
}

/// Split spans longer than `max_len` into consecutive windows.
fn split_windows(spans: &[Range<usize>], max_len: usize) -> Vec<Range<usize>> {
    let max_len = max_len.max(1);
    let mut windows = Vec::new();
    for span in spans.iter().filter(|s| !s.is_empty()) {
        let mut start = span.start;
        while start < span.end {
            let end = (start + max_len).min(span.end);
            windows.push(start..end);
            start = end;
        }
    }
    windows
}

/// Pad with trailing silence up to the shortest input whisper accepts.
fn padded(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let min_len = (MIN_WINDOW_SECS * sample_rate as f64).ceil() as usize;
    let mut out = samples.to_vec();
    if out.len() < min_len {
        out.resize(min_len, 0.0);
    }
    out
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
