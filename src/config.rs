use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

/// Env var pointing at a config file, checked when no explicit path is given.
pub const CONFIG_ENV: &str = "DEMUCS_BRIDGE_CONFIG";

/// Config file picked up from the working directory when nothing else is set.
pub const CONFIG_FILE: &str = "demucs-bridge.json";

/// How the external separation tool is launched and supervised.
#[derive(Debug, Clone)]
pub struct SeparatorConfig {
    /// Leading argv of the tool; the invoker appends its own flags after it.
    pub command: Vec<String>,
    /// Kill a run that exceeds this. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Root for per-run scratch directories (system temp dir when unset).
    pub scratch_dir: Option<PathBuf>,
}

impl Default for SeparatorConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            timeout: None,
            scratch_dir: None,
        }
    }
}

fn default_command() -> Vec<String> {
    vec!["python3".into(), "-m".into(), "demucs.separate".into()]
}

/// On-disk configuration shape. Every field is optional; absent fields keep
/// their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub listen_addr: Option<String>,
    pub allow_any_origin: Option<bool>,
    pub max_request_bytes: Option<usize>,
    pub command: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
    pub scratch_dir: Option<PathBuf>,
}

/// Resolved runtime configuration for the service and the invoker.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    /// Answer cross-origin requests with a wildcard allow-origin.
    pub allow_any_origin: bool,
    /// Upper bound on request bodies. Base64-encoded audio is bulky, so the
    /// default is far above axum's built-in limit.
    pub max_request_bytes: usize,
    pub separator: SeparatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            allow_any_origin: true,
            max_request_bytes: 100 * 1024 * 1024,
            separator: SeparatorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration, trying in order: the explicit path, `$DEMUCS_BRIDGE_CONFIG`,
    /// `./demucs-bridge.json`, and finally built-in defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        if let Ok(p) = env::var(CONFIG_ENV) {
            return Self::load_from_path(Path::new(&p));
        }

        let local = Path::new(CONFIG_FILE);
        if local.exists() {
            return Self::load_from_path(local);
        }

        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Self::from_file(file).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_file(file: ConfigFile) -> anyhow::Result<Self> {
        if let Some(command) = &file.command {
            if command.is_empty() {
                bail!("command must not be empty");
            }
        }

        let defaults = Self::default();
        let mut separator = SeparatorConfig::default();
        if let Some(command) = file.command {
            separator.command = command;
        }
        separator.timeout = file.timeout_secs.map(Duration::from_secs);
        separator.scratch_dir = file.scratch_dir;

        Ok(Self {
            listen_addr: file.listen_addr.unwrap_or(defaults.listen_addr),
            allow_any_origin: file.allow_any_origin.unwrap_or(defaults.allow_any_origin),
            max_request_bytes: file.max_request_bytes.unwrap_or(defaults.max_request_bytes),
            separator,
        })
    }
}
