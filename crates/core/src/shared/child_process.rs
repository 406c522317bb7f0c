use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;

use super::collaborator_error::CollaboratorError;
use super::stage_control::StageControl;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run `command` to completion, handing each stdout line to `on_line` as it
/// arrives. The child is killed as soon as cancellation is observed.
///
/// A program that cannot be started is returned as `CollaboratorError::Io`
/// so callers can tell a missing executable apart from a failed run.
pub fn run_cancellable(
    command: &mut Command,
    control: &dyn StageControl,
    mut on_line: impl FnMut(&str),
) -> Result<ProcessOutput, CollaboratorError> {
    control.check_cancelled()?;
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let (line_tx, line_rx) = crossbeam_channel::unbounded::<String>();
    let stdout_reader = child.stdout.take().map(|out| {
        thread::spawn(move || {
            for line in BufReader::new(out).lines() {
                let Ok(line) = line else { break };
                if line_tx.send(line).is_err() {
                    break;
                }
            }
        })
    });
    let stderr_reader = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut text = String::new();
            let _ = err.read_to_string(&mut text);
            text
        })
    });

    let mut stdout = String::new();
    let mut collect = |line: String, stdout: &mut String| {
        on_line(&line);
        stdout.push_str(&line);
        stdout.push('\n');
    };

    let status = loop {
        if control.is_cancelled() {
            // Readers are left to finish on their own; a grandchild may
            // still hold the pipes open.
            kill(&mut child);
            return Err(CollaboratorError::Cancelled);
        }
        match line_rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                collect(line, &mut stdout);
                continue;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
        }
        if let Some(status) = child.try_wait()? {
            break status;
        }
    };

    let stderr = join_readers(stdout_reader, stderr_reader);
    for line in line_rx.try_iter() {
        collect(line, &mut stdout);
    }

    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
    })
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("Failed to kill child process {}: {e}", child.id());
    }
    let _ = child.wait();
}

fn join_readers(
    stdout_reader: Option<JoinHandle<()>>,
    stderr_reader: Option<JoinHandle<String>>,
) -> String {
    if let Some(handle) = stdout_reader {
        let _ = handle.join();
    }
    stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Last non-empty line of `text`, for short error messages.
pub fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("")
}
