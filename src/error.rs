use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Central error type for separation runs.
///
/// Every variant is raised before scratch cleanup happens, so callers never
/// see a half-removed workspace; cleanup failures themselves are logged and
/// swallowed rather than surfaced here.
#[derive(Debug, Error)]
pub enum SeparateError {
    /// A per-call option failed basic validation before the tool was spawned.
    #[error("{field} must not be empty")]
    Invalid { field: &'static str },

    /// The input file is missing or unreadable; raised before the tool runs.
    #[error("input file {} is not readable: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The tool process could not be started at all.
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran and reported failure. `stderr` carries its diagnostic
    /// output verbatim (falling back to stdout when stderr is empty).
    #[error("separation failed ({status}): {stderr}")]
    Separation { status: ExitStatus, stderr: String },

    /// The tool exited zero but an expected output file is absent.
    #[error("expected output {} not found in {}", path.display(), dir.display())]
    OutputMissing { path: PathBuf, dir: PathBuf },

    /// The configured deadline elapsed and the tool was killed.
    #[error("separation did not finish within {}s", limit.as_secs())]
    Timeout { limit: Duration, stderr: String },

    // Scratch setup, output reads, and other filesystem trouble.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors surfaced by the load/predict wrapper.
#[derive(Debug, Error)]
pub enum PredictError {
    /// `audio_content` was not valid base64; nothing was spawned.
    #[error("audio_content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The separation tool failed its availability probe at load time.
    #[error("separation tool unavailable (`{command}`): {detail}")]
    Unavailable { command: String, detail: String },

    /// Could not spool the decoded audio to a temporary input file.
    #[error("failed to spool request audio: {0}")]
    Spool(#[source] io::Error),

    #[error(transparent)]
    Separate(#[from] SeparateError),
}

pub type Result<T> = std::result::Result<T, SeparateError>;
