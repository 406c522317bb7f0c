use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process;

use clap::Parser;

mod interrupt;

use diarscribe_core::acquisition::infrastructure::retrying_downloader::RetryingDownloader;
use diarscribe_core::acquisition::infrastructure::yt_dlp_downloader::YtDlpDownloader;
use diarscribe_core::audio::infrastructure::ffmpeg_preprocessor::FfmpegPreprocessor;
use diarscribe_core::config::app_config::AppConfig;
use diarscribe_core::diarization::domain::diarizer::Diarizer;
use diarscribe_core::diarization::infrastructure::command_diarizer::CommandDiarizer;
use diarscribe_core::output::domain::transcript_formatter::OutputKind;
use diarscribe_core::output::infrastructure::formatter_factory::formatter_for;
use diarscribe_core::pipeline::infrastructure::threaded_pipeline_runner;
use diarscribe_core::pipeline::outcome::PipelineOutcome;
use diarscribe_core::pipeline::progress_sink::{LogProgressSink, ProgressSink};
use diarscribe_core::pipeline::request::{normalize_language, PipelineOptions, PipelineRequest};
use diarscribe_core::pipeline::stage::{ProgressEvent, StageName};
use diarscribe_core::pipeline::transcribe_pipeline::TranscribePipeline;
use diarscribe_core::shared::constants::{WHISPER_MODEL_NAME, WHISPER_MODEL_URL};
use diarscribe_core::shared::model_resolver;
use diarscribe_core::speech::infrastructure::whisper_transcriber::{
    WhisperTranscriber, DEFAULT_BEAM_SIZE,
};

const DEFAULT_OUTPUT_STEM: &str = "transcript";

/// Speaker-attributed transcription of YouTube videos.
#[derive(Parser)]
#[command(name = "diarscribe")]
struct Cli {
    /// YouTube URL (watch, youtu.be or shorts).
    url: String,

    /// Language code (ko, en, ...) or "auto" to detect.
    #[arg(long)]
    language: Option<String>,

    /// Expected number of speakers (omit to detect).
    #[arg(long)]
    speakers: Option<u32>,

    /// Output format: txt, srt or json.
    #[arg(long)]
    format: Option<String>,

    /// Output file. The extension follows the format. Prints to stdout when
    /// neither this nor a configured output directory is set.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Credential for the diarization model (falls back to HF_TOKEN).
    #[arg(long)]
    hf_token: Option<String>,

    /// Diarization command, e.g. "python3 diarize.py".
    #[arg(long)]
    diarizer: Option<String>,

    /// Whisper ggml model file (downloaded on first use when omitted).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Beam search width for decoding (1 decodes greedily).
    #[arg(long, default_value_t = DEFAULT_BEAM_SIZE)]
    beam_size: usize,

    /// Skip speaker diarization (single speaker).
    #[arg(long)]
    no_diarize: bool,

    /// Transcribe the whole recording instead of detected speech only.
    #[arg(long)]
    no_vad: bool,

    /// Force CPU inference.
    #[arg(long)]
    cpu: bool,

    /// Debug logging, with per-stage progress and timings in the log.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    validate(&cli)?;
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable config: {e}");
        AppConfig::default()
    });

    let kind: OutputKind = cli
        .format
        .as_deref()
        .unwrap_or(&config.output_format)
        .parse()?;
    let options = build_options(&cli, &config);
    let pipeline = TranscribePipeline::new(
        Box::new(RetryingDownloader::new(Box::new(YtDlpDownloader::new()))),
        Box::new(FfmpegPreprocessor::new()),
        build_diarizer(&cli, &config, &options),
        Box::new(build_transcriber(&cli)?),
    );

    let handle = threaded_pipeline_runner::spawn(pipeline, PipelineRequest::new(&cli.url, options));
    interrupt::cancel_on_ctrl_c(handle.cancellation_token());
    let mut sink = progress_sink(cli.verbose);
    let outcome = handle.wait_into(sink.as_mut());

    let result = match outcome {
        PipelineOutcome::Completed(result) => result,
        PipelineOutcome::Cancelled => return Err("Run cancelled".into()),
        PipelineOutcome::Failed {
            stage,
            kind,
            message,
        } => {
            let stage = stage.map(|s| s.label()).unwrap_or("pipeline");
            return Err(format!("{stage} failed ({kind}): {message}").into());
        }
    };

    let formatter = formatter_for(kind);
    match output_path(&cli, &config) {
        Some(path) => {
            let written = formatter.save(&result, &path)?;
            log::info!("Output written to {}", written.display());
        }
        None => println!("{}", formatter.format(&result)?),
    }
    Ok(())
}

fn build_options(cli: &Cli, config: &AppConfig) -> PipelineOptions {
    let mut options = PipelineOptions::from_config(config);
    if let Some(language) = &cli.language {
        options.language = normalize_language(language);
    }
    if let Some(n) = cli.speakers {
        options.target_speakers = NonZeroU32::new(n);
    }
    options.diarize = !cli.no_diarize;
    options.voice_filter = !cli.no_vad;
    options.force_cpu = cli.cpu;
    options.credential = config.resolve_credential(cli.hf_token.as_deref());
    options
}

fn build_diarizer(
    cli: &Cli,
    config: &AppConfig,
    options: &PipelineOptions,
) -> Option<Box<dyn Diarizer>> {
    if !options.diarize {
        return None;
    }
    let parts: Vec<String> = match &cli.diarizer {
        Some(line) => line.split_whitespace().map(str::to_string).collect(),
        None => config.diarization_command.clone().unwrap_or_default(),
    };
    match CommandDiarizer::from_command_line(&parts) {
        Some(diarizer) => Some(Box::new(diarizer)),
        None => {
            log::info!("No diarization command configured; using single-speaker mode");
            None
        }
    }
}

fn build_transcriber(cli: &Cli) -> Result<WhisperTranscriber, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {WHISPER_MODEL_NAME}");
            let path = model_resolver::resolve(
                WHISPER_MODEL_NAME,
                WHISPER_MODEL_URL,
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };
    Ok(WhisperTranscriber::new(&model_path)?.with_beam_size(cli.beam_size))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.speakers == Some(0) {
        return Err("Speaker count must be at least 1".into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if cli.no_diarize && (cli.speakers.is_some() || cli.diarizer.is_some()) {
        log::warn!("--no-diarize set; speaker options are ignored");
    }
    Ok(())
}

fn output_path(cli: &Cli, config: &AppConfig) -> Option<PathBuf> {
    cli.output
        .clone()
        .or_else(|| config.output_dir.as_ref().map(|d| d.join(DEFAULT_OUTPUT_STEM)))
}

/// Verbose runs log every stage and end with a timing summary; otherwise a
/// status line per stage goes to stderr.
fn progress_sink(verbose: bool) -> Box<dyn ProgressSink> {
    if verbose {
        Box::new(LogProgressSink::default())
    } else {
        Box::new(ProgressPrinter::default())
    }
}

/// Single status line per stage on stderr.
#[derive(Default)]
struct ProgressPrinter {
    stage: Option<StageName>,
}

impl ProgressSink for ProgressPrinter {
    fn on_progress(&mut self, event: &ProgressEvent) {
        if self.stage.is_some_and(|s| s != event.stage) {
            eprintln!();
        }
        self.stage = Some(event.stage);
        let pct = (event.fraction * 100.0).round() as u32;
        eprint!("\r{:<10} {pct:>3}% {:<50}", event.stage.label(), event.message);
    }

    fn summary(&self) {
        if self.stage.is_some() {
            eprintln!();
        }
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading speech model... {pct}%");
    } else {
        eprint!("\rDownloading speech model... {downloaded} bytes");
    }
}
