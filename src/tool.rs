//! Launching and supervising the external separation tool.
//!
//! The tool is an ordinary subprocess: stdin closed, stdout and stderr piped.
//! Both pipes are drained on dedicated threads so a chatty run can never
//! deadlock against a full pipe while we wait on the exit status.

use std::ffi::OsString;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::SeparatorConfig;
use crate::error::{Result, SeparateError};

/// Sleep between `try_wait` polls when a deadline is configured.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured outcome of one tool run.
#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Diagnostic text for error reporting: stderr verbatim, falling back to
    /// stdout when the tool wrote its complaint there instead.
    pub fn diagnostic(&self) -> String {
        let err = self.stderr.trim();
        if !err.is_empty() {
            return err.to_string();
        }
        self.stdout.trim().to_string()
    }
}

/// Run the configured tool with `args` appended to its base command, capture
/// both output streams, and enforce the configured deadline if one is set.
pub(crate) fn run(cfg: &SeparatorConfig, args: &[OsString]) -> Result<ToolOutput> {
    let Some((program, leading)) = cfg.command.split_first() else {
        return Err(SeparateError::Launch {
            command: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty tool command"),
        });
    };

    debug!(command = %render(&cfg.command, args), "launching separation tool");

    let mut child = Command::new(program)
        .args(leading)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SeparateError::Launch {
            command: render(&cfg.command, args),
            source,
        })?;

    let stdout_reader = reader_thread(child.stdout.take());
    let stderr_reader = reader_thread(child.stderr.take());

    let waited = wait_child(&mut child, cfg.timeout);
    if waited.is_err() {
        // Waiting itself failed; make sure the child is gone before joining
        // the readers, otherwise they could block forever.
        let _ = child.kill();
        let _ = child.wait();
    }

    let stdout = join_capture(stdout_reader);
    let stderr = join_capture(stderr_reader);

    match waited? {
        Some(status) => Ok(ToolOutput {
            status,
            stdout,
            stderr,
        }),
        None => Err(SeparateError::Timeout {
            limit: cfg.timeout.unwrap_or_default(),
            stderr,
        }),
    }
}

/// Wait for the child, polling against the deadline when one is set.
/// `Ok(None)` means the deadline passed and the child was killed and reaped.
fn wait_child(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(limit) = timeout else {
        return child.wait().map(Some);
    };

    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // Kill errors are ignored; the child may have exited in between.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn reader_thread<R: Read + Send + 'static>(pipe: Option<R>) -> Option<thread::JoinHandle<String>> {
    let mut pipe = pipe?;
    Some(thread::spawn(move || {
        let mut bytes = Vec::new();
        // Tool output is not guaranteed UTF-8; keep what we can.
        let _ = pipe.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    }))
}

fn join_capture(handle: Option<thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn render(command: &[String], args: &[OsString]) -> String {
    let mut parts = command.to_vec();
    parts.extend(args.iter().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Stable classification of a probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// `--help` exited zero.
    Runnable,
    /// The command could not be found at all.
    Missing,
    /// The command exists but cannot be executed.
    NotExecutable,
    /// The command started and failed, or failed in some other way.
    ExecFailed,
}

impl ProbeOutcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Runnable => "runnable",
            Self::Missing => "missing",
            Self::NotExecutable => "not executable",
            Self::ExecFailed => "failed",
        }
    }
}

/// Outcome of checking that the separation tool can run at all.
#[derive(Debug)]
pub struct ProbeReport {
    /// The command line that was probed.
    pub command: String,
    pub outcome: ProbeOutcome,
    /// First line of whatever went wrong, when not runnable.
    pub detail: Option<String>,
}

impl ProbeReport {
    pub fn is_ok(&self) -> bool {
        self.outcome == ProbeOutcome::Runnable
    }
}

/// Ask the tool for `--help` and report whether that worked. A zero exit is
/// the only signal we rely on; anything else (launch failure, non-zero exit)
/// means the environment is not usable for separation.
pub fn probe(cfg: &SeparatorConfig) -> ProbeReport {
    let args = [OsString::from("--help")];
    let command = render(&cfg.command, &args);

    match run(cfg, &args) {
        Ok(out) if out.status.success() => ProbeReport {
            command,
            outcome: ProbeOutcome::Runnable,
            detail: None,
        },
        Ok(out) => {
            let detail = first_line(&out.diagnostic());
            ProbeReport {
                command,
                outcome: ProbeOutcome::ExecFailed,
                detail: Some(if detail.is_empty() {
                    "tool returned a non-zero exit status".to_string()
                } else {
                    detail
                }),
            }
        }
        Err(SeparateError::Launch { source, .. }) => {
            let (outcome, detail) = classify_spawn_error(&source);
            ProbeReport {
                command,
                outcome,
                detail: Some(detail),
            }
        }
        Err(err) => ProbeReport {
            command,
            outcome: ProbeOutcome::ExecFailed,
            detail: Some(err.to_string()),
        },
    }
}

fn classify_spawn_error(error: &io::Error) -> (ProbeOutcome, String) {
    match error.kind() {
        io::ErrorKind::NotFound => (ProbeOutcome::Missing, "tool not found".to_string()),
        io::ErrorKind::PermissionDenied => (
            ProbeOutcome::NotExecutable,
            "permission denied while executing tool".to_string(),
        ),
        _ => (ProbeOutcome::ExecFailed, error.to_string()),
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or(text)
        .trim()
        .to_string()
}
