//! Model-server style front over the invoker: construct once, predict many.
//!
//! Requests and responses carry audio as base64 so they survive any JSON
//! transport unchanged. The field names are part of the wire format and do
//! not change with the requested stem: `vocal_audio` is always the target,
//! `bg_audio` always the complement.

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tempfile::Builder;
use tracing::info;

use crate::config::SeparatorConfig;
use crate::error::PredictError;
use crate::separator::{separate_two_stems, SeparateOptions};
use crate::tool::{probe, ProbeReport};

fn default_stem() -> String {
    "vocals".to_string()
}

fn default_model() -> String {
    "htdemucs".to_string()
}

/// One separation job as it arrives over JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct SeparationRequest {
    /// Base64-encoded input audio bytes.
    pub audio_content: String,
    #[serde(default = "default_stem")]
    pub target_stem: String,
    #[serde(default = "default_model")]
    pub model: String,
}

/// The finished job, audio base64-encoded again.
#[derive(Debug, Clone, Serialize)]
pub struct SeparationResponse {
    /// The requested stem, whatever stem that was.
    pub vocal_audio: String,
    /// The complement of the requested stem.
    pub bg_audio: String,
    pub target_stem: String,
    pub content_type: String,
}

/// Load-once, predict-many wrapper around the invoker.
#[derive(Debug)]
pub struct Predictor {
    config: SeparatorConfig,
}

impl Predictor {
    /// Wrap `config` without touching the tool. Use [`Predictor::load`] when
    /// a broken environment should fail at startup instead of per request.
    pub fn new(config: SeparatorConfig) -> Self {
        Self { config }
    }

    /// Probe the tool once and fail fast if it cannot run.
    pub fn load(config: SeparatorConfig) -> Result<Self, PredictError> {
        let report = probe(&config);
        if !report.is_ok() {
            let ProbeReport {
                command,
                outcome,
                detail,
            } = report;
            return Err(PredictError::Unavailable {
                command,
                detail: detail.unwrap_or_else(|| outcome.label().to_string()),
            });
        }
        info!(command = %report.command, "separation tool ready");
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &SeparatorConfig {
        &self.config
    }

    /// Decode, separate, re-encode. Blocking for the duration of the tool
    /// run; async hosts should call this from a blocking task.
    pub fn predict(&self, request: &SeparationRequest) -> Result<SeparationResponse, PredictError> {
        let audio = BASE64.decode(request.audio_content.as_bytes())?;

        info!(
            stem = %request.target_stem,
            model = %request.model,
            bytes = audio.len(),
            "separation request"
        );

        // Spool to a uniquely named input file; the tool derives its output
        // directory from this file's stem, so uniqueness keeps concurrent
        // requests apart. The file is deleted on drop, success or not.
        let mut spool = Builder::new()
            .prefix("demucs-input-")
            .suffix(".wav")
            .tempfile()
            .map_err(PredictError::Spool)?;
        spool.write_all(&audio).map_err(PredictError::Spool)?;

        let opts = SeparateOptions {
            target_stem: request.target_stem.clone(),
            model: request.model.clone(),
            ..SeparateOptions::default()
        };
        let separation = separate_two_stems(spool.path(), &opts, &self.config)?;

        Ok(SeparationResponse {
            vocal_audio: BASE64.encode(&separation.target),
            bg_audio: BASE64.encode(&separation.residual),
            target_stem: request.target_stem.clone(),
            content_type: separation.content_type.to_string(),
        })
    }
}
