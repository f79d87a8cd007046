use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory (under `data_dir`) holding the managed script.
pub const SCRIPT_DIR_NAME: &str = "JellyfinShellExecutor";
/// File name of the managed script inside [`SCRIPT_DIR_NAME`].
pub const SCRIPT_FILE_NAME: &str = "script.sh";
/// Default audit trail location.
pub const DEFAULT_AUDIT_LOG: &str = "/tmp/executor.log";

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShellexecConfig {
    pub paths: PathsConfig,
    pub executor: ExecutorConfig,
    pub gateway: GatewayConfig,
}

impl ShellexecConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: ShellexecConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file is `Ok(None)` rather than
    /// an error. A file that exists and cannot be read or parsed is still an error.
    pub fn load_if_present<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        if !path.as_ref().exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    /// A file that exists but is invalid also falls back to defaults, with a warning.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_if_present(path.as_ref()) {
            Ok(Some(cfg)) => cfg,
            Ok(None) => {
                tracing::info!(
                    "Config file {} not found, using defaults",
                    path.as_ref().display()
                );
                Self::defaults_with_env()
            }
            Err(e) => {
                tracing::warn!("Ignoring invalid config file ({:#}), using defaults", e);
                Self::defaults_with_env()
            }
        }
    }

    fn defaults_with_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SHELLEXEC_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SHELLEXEC_AUDIT_LOG") {
            self.paths.audit_log = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("SHELLEXEC_INTERPRETER") {
            self.executor.interpreter = v;
        }
        if let Ok(v) = std::env::var("SHELLEXEC_MAX_OUTPUT_BYTES") {
            if let Ok(n) = v.parse() {
                self.executor.max_output_bytes = n;
            }
        }
        if let Ok(v) = std::env::var("SHELLEXEC_HOST") {
            self.gateway.host = v;
        }
        if let Ok(v) = std::env::var("SHELLEXEC_PORT") {
            if let Ok(n) = v.parse() {
                self.gateway.port = n;
            }
        }
        if let Ok(v) = std::env::var("SHELLEXEC_API_TOKEN") {
            if !v.is_empty() {
                self.gateway.api_token = Some(v);
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Base directory the host hands to the executor.
    pub data_dir: PathBuf,
    pub audit_log: PathBuf,
}

impl PathsConfig {
    /// `<data_dir>/JellyfinShellExecutor/script.sh`
    pub fn script_path(&self) -> PathBuf {
        self.data_dir.join(SCRIPT_DIR_NAME).join(SCRIPT_FILE_NAME)
    }

    /// `<data_dir>/JellyfinShellExecutor.toml`
    pub fn config_store_path(&self) -> PathBuf {
        self.data_dir.join(format!("{SCRIPT_DIR_NAME}.toml"))
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("shellexec"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Interpreter invoked with the script path as its only argument.
    pub interpreter: String,
    /// Per-stream capture limit in bytes. `0` disables the limit.
    pub max_output_bytes: usize,
    /// Execute the script once when the service starts.
    pub run_on_startup: bool,
}

impl ExecutorConfig {
    pub fn output_limit(&self) -> Option<usize> {
        (self.max_output_bytes > 0).then_some(self.max_output_bytes)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter().to_string(),
            max_output_bytes: 1024 * 1024,
            run_on_startup: true,
        }
    }
}

#[cfg(unix)]
fn default_interpreter() -> &'static str {
    "/bin/sh"
}

#[cfg(not(unix))]
fn default_interpreter() -> &'static str {
    "sh"
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for the elevated routes. Without one those routes reject every request.
    pub api_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8097,
            api_token: None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
