//! The core two-stem invoker.
//!
//! One call runs the external tool against a private scratch directory,
//! collects the target stem and its complement by the tool's fixed output
//! layout (`<scratch>/<model>/<input stem>/{<stem>,no_<stem>}.<ext>`), and
//! removes the scratch directory on every exit path.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::Path;

use tempfile::{Builder, TempDir};
use tracing::{info, warn};

use crate::config::SeparatorConfig;
use crate::error::{Result, SeparateError};
use crate::tool;

/// Output encoding the tool is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Constant-bitrate MP3, bitrate in kbps.
    Mp3 { bitrate: u32 },
    Wav,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 { .. } => "mp3",
            Self::Wav => "wav",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Mp3 { .. } => "audio/mp3",
            Self::Wav => "audio/wav",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Mp3 { bitrate: 320 }
    }
}

/// Per-call knobs. The defaults reproduce the service's canonical call:
/// vocals out of `htdemucs`, encoded as 320 kbps MP3.
#[derive(Debug, Clone)]
pub struct SeparateOptions {
    /// Stem to isolate; everything else lands in the complement.
    pub target_stem: String,
    /// Model identifier passed through to the tool.
    pub model: String,
    pub format: OutputFormat,
}

impl Default for SeparateOptions {
    fn default() -> Self {
        Self {
            target_stem: "vocals".to_string(),
            model: "htdemucs".to_string(),
            format: OutputFormat::default(),
        }
    }
}

/// Both halves of a finished separation.
#[derive(Debug)]
pub struct Separation {
    /// The requested stem.
    pub target: Vec<u8>,
    /// Everything else (the tool's `no_<stem>` file).
    pub residual: Vec<u8>,
    pub content_type: &'static str,
}

/// Separate `input` into the target stem and its complement.
///
/// The scratch directory is private to this call, so concurrent calls never
/// see each other's files. It is removed before this function returns,
/// whether the run succeeded or failed; a failed removal is logged and does
/// not change the outcome.
pub fn separate_two_stems(
    input: &Path,
    opts: &SeparateOptions,
    cfg: &SeparatorConfig,
) -> Result<Separation> {
    if opts.target_stem.trim().is_empty() {
        return Err(SeparateError::Invalid {
            field: "target_stem",
        });
    }
    if opts.model.trim().is_empty() {
        return Err(SeparateError::Invalid { field: "model" });
    }

    let input_stem = check_input(input)?;
    let scratch = make_scratch(cfg)?;

    info!(
        input = %input.display(),
        stem = %opts.target_stem,
        model = %opts.model,
        "running separation"
    );

    let outcome = run_in_scratch(input, &input_stem, opts, cfg, scratch.path());
    remove_scratch(scratch);

    let separation = outcome?;
    info!(
        target_bytes = separation.target.len(),
        residual_bytes = separation.residual.len(),
        "separation complete"
    );
    Ok(separation)
}

/// Separate `input` and write both stems to caller-chosen paths.
pub fn separate_to_files(
    input: &Path,
    target_out: &Path,
    residual_out: &Path,
    opts: &SeparateOptions,
    cfg: &SeparatorConfig,
) -> Result<()> {
    let separation = separate_two_stems(input, opts, cfg)?;
    fs::write(target_out, &separation.target)?;
    fs::write(residual_out, &separation.residual)?;
    Ok(())
}

/// Verify the input is a readable file before anything is spawned, and
/// return its file stem (the tool names its output directory after it).
fn check_input(input: &Path) -> Result<OsString> {
    let file = fs::File::open(input).map_err(|source| SeparateError::Input {
        path: input.to_path_buf(),
        source,
    })?;
    let meta = file.metadata().map_err(|source| SeparateError::Input {
        path: input.to_path_buf(),
        source,
    })?;
    if !meta.is_file() {
        return Err(SeparateError::Input {
            path: input.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    match input.file_stem() {
        Some(stem) => Ok(stem.to_owned()),
        None => Err(SeparateError::Input {
            path: input.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "no file name"),
        }),
    }
}

fn make_scratch(cfg: &SeparatorConfig) -> Result<TempDir> {
    let scratch = match &cfg.scratch_dir {
        Some(root) => {
            fs::create_dir_all(root)?;
            Builder::new().prefix("demucs-").tempdir_in(root)?
        }
        None => Builder::new().prefix("demucs-").tempdir()?,
    };
    Ok(scratch)
}

fn remove_scratch(scratch: TempDir) {
    let path = scratch.path().to_path_buf();
    if let Err(err) = scratch.close() {
        warn!(scratch = %path.display(), error = %err, "failed to remove scratch directory");
    }
}

fn run_in_scratch(
    input: &Path,
    input_stem: &OsStr,
    opts: &SeparateOptions,
    cfg: &SeparatorConfig,
    scratch: &Path,
) -> Result<Separation> {
    let args = build_args(input, opts, scratch);
    let out = tool::run(cfg, &args)?;

    if !out.status.success() {
        return Err(SeparateError::Separation {
            status: out.status,
            stderr: out.diagnostic(),
        });
    }

    // The tool writes <scratch>/<model>/<input stem>/{<stem>,no_<stem>}.<ext>.
    let stems_dir = scratch.join(&opts.model).join(input_stem);
    let ext = opts.format.extension();
    let target_path = stems_dir.join(format!("{}.{ext}", opts.target_stem));
    let residual_path = stems_dir.join(format!("no_{}.{ext}", opts.target_stem));

    let target = read_output(&target_path, &stems_dir)?;
    let residual = read_output(&residual_path, &stems_dir)?;

    Ok(Separation {
        target,
        residual,
        content_type: opts.format.content_type(),
    })
}

fn build_args(input: &Path, opts: &SeparateOptions, scratch: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        OsString::from("-o"),
        scratch.as_os_str().to_owned(),
        OsString::from("-n"),
        OsString::from(&opts.model),
        OsString::from(format!("--two-stems={}", opts.target_stem)),
    ];
    if let OutputFormat::Mp3 { bitrate } = opts.format {
        args.push(OsString::from("--mp3"));
        args.push(OsString::from(format!("--mp3-bitrate={bitrate}")));
    }
    args.push(input.as_os_str().to_owned());
    args
}

fn read_output(path: &Path, dir: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(SeparateError::OutputMissing {
            path: path.to_path_buf(),
            dir: dir.to_path_buf(),
        });
    }
    Ok(fs::read(path)?)
}
