use std::path::PathBuf;
use std::process::Command;

use crate::audio::domain::preprocessor::NormalizedAudio;
use crate::diarization::domain::diarizer::{DiarizeOptions, Diarizer};
use crate::diarization::domain::rttm;
use crate::shared::child_process::{self, last_line};
use crate::shared::collaborator_error::CollaboratorError;
use crate::shared::constants::CREDENTIAL_ENV;
use crate::shared::stage_control::StageControl;
use crate::transcript::domain::speaker_segment::SpeakerSegment;

/// Exit status a diarization command uses to report unusable local model
/// files.
pub const EXIT_MODEL_CORRUPT: i32 = 3;

const PROGRESS_PREFIX: &str = "# progress ";

/// Runs an external diarization command and reads RTTM from its stdout.
///
/// Invocation: `<program> <args...> [--num-speakers N] [--device cpu] <audio>`
/// with the credential, if any, in `HF_TOKEN`. Lines of the form
/// `# progress <fraction>` are forwarded as progress.
pub struct CommandDiarizer {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandDiarizer {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from `[program, args...]`; `None` when empty.
    pub fn from_command_line(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self::new(program, args.to_vec()))
    }

    fn command(&self, audio: &NormalizedAudio, options: &DiarizeOptions) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(n) = options.target_speakers {
            cmd.arg("--num-speakers").arg(n.to_string());
        }
        if options.force_cpu {
            cmd.args(["--device", "cpu"]);
        }
        cmd.arg(&audio.path);
        match &options.credential {
            Some(token) => cmd.env(CREDENTIAL_ENV, token),
            None => cmd.env_remove(CREDENTIAL_ENV),
        };
        cmd
    }
}

impl Diarizer for CommandDiarizer {
    fn diarize(
        &self,
        audio: &NormalizedAudio,
        options: &DiarizeOptions,
        control: &dyn StageControl,
    ) -> Result<Vec<SpeakerSegment>, CollaboratorError> {
        let mut cmd = self.command(audio, options);
        log::debug!("Running diarization command {}", self.program.display());

        let output = child_process::run_cancellable(&mut cmd, control, |line| {
            if let Some(fraction) = line
                .strip_prefix(PROGRESS_PREFIX)
                .and_then(|v| v.trim().parse::<f64>().ok())
            {
                control.report(fraction, "diarizing");
            }
        })
        .map_err(|err| match err {
            CollaboratorError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                CollaboratorError::ModelUnavailable(format!(
                    "diarization command {} not found",
                    self.program.display()
                ))
            }
            other => other,
        })?;

        if !output.status.success() {
            let detail = last_line(&output.stderr).to_string();
            return Err(match output.status.code() {
                Some(EXIT_MODEL_CORRUPT) => CollaboratorError::ModelCorrupt(detail),
                Some(code) => CollaboratorError::other(format!(
                    "diarization command exited with status {code}: {detail}"
                )),
                None => CollaboratorError::other(format!(
                    "diarization command terminated by signal: {detail}"
                )),
            });
        }

        let turns = rttm::parse(&output.stdout).map_err(CollaboratorError::other)?;
        log::debug!("Diarization command produced {} turns", turns.len());
        Ok(turns)
    }
}
