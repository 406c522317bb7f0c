use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;

use crate::acquisition::domain::downloader::Downloader;
use crate::shared::child_process::{self, last_line};
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::stage_control::StageControl;

const DEFAULT_PROGRAM: &str = "yt-dlp";
const OUTPUT_STEM: &str = "audio_raw";

/// stderr fragments that indicate a network problem worth retrying.
const TRANSIENT_MARKERS: &[&str] = &[
    "timed out",
    "connection reset",
    "connection refused",
    "temporary failure in name resolution",
    "unable to download webpage",
    "http error 429",
    "http error 500",
    "http error 502",
    "http error 503",
    "http error 504",
    "incompleteread",
];

/// Extracts the best available audio track as WAV using the `yt-dlp`
/// executable.
pub struct YtDlpDownloader {
    program: PathBuf,
    ffmpeg_location: Option<PathBuf>,
}

impl YtDlpDownloader {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            ffmpeg_location: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Directory containing the `ffmpeg` binary yt-dlp should use.
    pub fn with_ffmpeg_location(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ffmpeg_location = Some(dir.into());
        self
    }

    fn command(&self, url: &str, work_dir: &Path) -> Command {
        let template = work_dir.join(format!("{OUTPUT_STEM}.%(ext)s"));
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "--format",
            "bestaudio/best",
            "--extract-audio",
            "--audio-format",
            "wav",
            "--audio-quality",
            "0",
            "--no-playlist",
            "--newline",
            "--no-warnings",
            "--output",
        ])
        .arg(&template);
        if let Some(dir) = &self.ffmpeg_location {
            cmd.arg("--ffmpeg-location").arg(dir);
        }
        cmd.arg(url);
        cmd
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for YtDlpDownloader {
    fn fetch(
        &self,
        url: &str,
        work_dir: &Path,
        control: &dyn StageControl,
    ) -> Result<PathBuf, CollaboratorError> {
        let mut cmd = self.command(url, work_dir);
        log::debug!("Running {cmd:?}");

        let output = child_process::run_cancellable(&mut cmd, control, |line| {
            if let Some(fraction) = parse_progress(line) {
                // leave headroom for the WAV conversion after the transfer
                control.report(fraction * 0.9, "downloading");
            } else if line.starts_with("[ExtractAudio]") {
                control.report(0.9, "extracting audio");
            }
        })
        .map_err(|err| match err {
            CollaboratorError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                CollaboratorError::other(format!(
                    "{} not found; install yt-dlp and make sure it is on PATH",
                    self.program.display()
                ))
            }
            other => other,
        })?;

        if !output.status.success() {
            return Err(classify_failure(&output.stderr));
        }

        let wav = work_dir.join(format!("{OUTPUT_STEM}.wav"));
        if !wav.exists() {
            return Err(CollaboratorError::other("yt-dlp finished but produced no WAV file"));
        }
        log::info!("Downloaded audio to {}", wav.display());
        Ok(wav)
    }
}

/// Fraction in `[0, 1]` from a `[download]  42.0% of ...` line.
pub fn parse_progress(line: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").expect("Invalid regex")
    });
    let pct: f64 = re.captures(line)?.get(1)?.as_str().parse().ok()?;
    Some((pct / 100.0).clamp(0.0, 1.0))
}

fn classify_failure(stderr: &str) -> CollaboratorError {
    let message = match last_line(stderr) {
        "" => "yt-dlp exited with an error".to_string(),
        line => line.to_string(),
    };
    let lower = stderr.to_lowercase();
    if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        CollaboratorError::Transient(message)
    } else {
        CollaboratorError::other(message)
    }
}
