//! # demucs-bridge
//!
//! Two-stem audio source separation by shelling out to the demucs CLI:
//! one core invoker ([`separate_two_stems`]) fronted by a library call,
//! a load/predict wrapper ([`Predictor`]), and an HTTP service.

pub mod config;
pub mod error;
pub mod predictor;
pub mod separator;
pub mod server;
pub mod tool;

pub use crate::{
    config::{AppConfig, ConfigFile, SeparatorConfig},
    error::{PredictError, Result, SeparateError},
    predictor::{Predictor, SeparationRequest, SeparationResponse},
    separator::{separate_to_files, separate_two_stems, OutputFormat, SeparateOptions, Separation},
    server::run_server,
    tool::{probe, ProbeOutcome, ProbeReport},
};
