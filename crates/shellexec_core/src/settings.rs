//! Operator-editable script configuration and the stores that persist it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Script installed when nothing has been configured yet.
pub const DEFAULT_SCRIPT: &str = "#!/bin/sh
# Default script content
echo \"Shell Executor initialized at $(date)\"
";

/// Desired script text. The single source of truth the on-disk file mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfiguration {
    pub script_content: String,
}

impl Default for ScriptConfiguration {
    fn default() -> Self {
        Self {
            script_content: DEFAULT_SCRIPT.to_string(),
        }
    }
}

/// Persistence for [`ScriptConfiguration`], provided by the host.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Previously persisted configuration, or `None` on first run.
    async fn load(&self) -> Result<Option<ScriptConfiguration>>;

    async fn persist(&self, config: &ScriptConfiguration) -> Result<()>;
}

/// Stores the configuration as a TOML document on disk.
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for TomlConfigStore {
    async fn load(&self) -> Result<Option<ScriptConfiguration>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read configuration: {}", self.path.display())
                })
            }
        };
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration: {}", self.path.display()))?;
        Ok(Some(config))
    }

    async fn persist(&self, config: &ScriptConfiguration) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let body = toml::to_string(config).context("Failed to serialize configuration")?;
        tokio::fs::write(&self.path, body)
            .await
            .with_context(|| format!("Failed to write configuration: {}", self.path.display()))?;
        Ok(())
    }
}

/// Keeps the configuration in process memory. Used by tests and embedders
/// that persist elsewhere.
#[derive(Default)]
pub struct MemoryConfigStore {
    inner: Mutex<Option<ScriptConfiguration>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScriptConfiguration) -> Self {
        Self {
            inner: Mutex::new(Some(config)),
        }
    }

    /// Last persisted configuration.
    pub fn snapshot(&self) -> Option<ScriptConfiguration> {
        self.inner.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<Option<ScriptConfiguration>> {
        Ok(self.snapshot())
    }

    async fn persist(&self, config: &ScriptConfiguration) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("configuration lock poisoned"))?;
        *guard = Some(config.clone());
        Ok(())
    }
}
