use crate::audit::AuditLog;
use crate::settings::{ConfigStore, ScriptConfiguration};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create script directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write script {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to read script {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to persist configuration: {0:#}")]
    Persist(anyhow::Error),
}

// ============================================================================
// ScriptStore
// ============================================================================

/// Keeps the configured script text and the on-disk script file in step.
pub struct ScriptStore {
    script_path: PathBuf,
    config: ScriptConfiguration,
    config_store: Arc<dyn ConfigStore>,
    audit: AuditLog,
}

impl ScriptStore {
    /// Build a store around an already-known configuration. Performs no I/O.
    pub fn new(
        script_path: impl Into<PathBuf>,
        config: ScriptConfiguration,
        config_store: Arc<dyn ConfigStore>,
        audit: AuditLog,
    ) -> Self {
        Self {
            script_path: script_path.into(),
            config,
            config_store,
            audit,
        }
    }

    /// Build a store seeded from whatever `config_store` last persisted.
    /// An empty or unreadable config store yields the default script.
    pub async fn open(
        script_path: impl Into<PathBuf>,
        config_store: Arc<dyn ConfigStore>,
        audit: AuditLog,
    ) -> Self {
        let config = match config_store.load().await {
            Ok(Some(cfg)) => cfg,
            Ok(None) => ScriptConfiguration::default(),
            Err(e) => {
                tracing::warn!("Could not read stored configuration ({:#}), using default script", e);
                ScriptConfiguration::default()
            }
        };
        Self::new(script_path, config, config_store, audit)
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn config(&self) -> &ScriptConfiguration {
        &self.config
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub async fn script_exists(&self) -> bool {
        tokio::fs::try_exists(&self.script_path)
            .await
            .unwrap_or(false)
    }

    /// Write `content` to the script file, mark it executable and make it the
    /// configured script.
    ///
    /// On [`StoreError::Persist`] the file and the in-memory configuration
    /// already hold `content`; only the persisted copy is stale.
    pub async fn save(&mut self, content: &str) -> Result<(), StoreError> {
        match self.write_script(content).await {
            Ok(()) => {
                tracing::info!("Script saved to {}", self.script_path.display());
                self.audit
                    .append(&format!("SCRIPT SAVED: {}", self.script_path.display()));
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to save script: {}", e);
                self.audit.append(&format!("SAVE FAILED: {}", e));
                Err(e)
            }
        }
    }

    async fn write_script(&mut self, content: &str) -> Result<(), StoreError> {
        if let Some(dir) = self.script_path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&self.script_path, content)
            .await
            .map_err(|source| StoreError::Write {
                path: self.script_path.clone(),
                source,
            })?;

        mark_executable(&self.script_path).await;

        self.config.script_content = content.to_string();
        self.config_store
            .persist(&self.config)
            .await
            .map_err(StoreError::Persist)
    }

    /// Rewrite the script file if it is missing or differs from the
    /// configured content. Returns whether a write happened.
    pub async fn ensure_synced(&mut self) -> Result<bool, StoreError> {
        let matches = match tokio::fs::read(&self.script_path).await {
            Ok(on_disk) => on_disk == self.config.script_content.as_bytes(),
            Err(_) => false,
        };
        if matches {
            return Ok(false);
        }
        tracing::debug!("Script file out of sync, rewriting {}", self.script_path.display());
        let content = self.config.script_content.clone();
        self.save(&content).await?;
        Ok(true)
    }

    /// First-use initialization. A missing file is created from the configured
    /// content; an existing file is adopted as the configuration so hand edits
    /// on disk survive.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        if !self.script_exists().await {
            let content = self.config.script_content.clone();
            return self.save(&content).await;
        }

        let bytes = tokio::fs::read(&self.script_path)
            .await
            .map_err(|source| StoreError::Read {
                path: self.script_path.clone(),
                source,
            })?;
        let on_disk = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Script at {} is not valid UTF-8, adopting it with replacement characters",
                    self.script_path.display()
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        if on_disk != self.config.script_content {
            tracing::info!(
                "Adopting existing script at {} as configuration",
                self.script_path.display()
            );
        }
        self.config.script_content = on_disk;
        self.config_store
            .persist(&self.config)
            .await
            .map_err(StoreError::Persist)
    }
}

#[cfg(unix)]
async fn mark_executable(path: &Path) {
    match tokio::process::Command::new("chmod")
        .arg("+x")
        .arg(path)
        .status()
        .await
    {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::warn!("chmod +x {} exited with {}", path.display(), status),
        Err(e) => tracing::warn!("Failed to run chmod on {}: {}", path.display(), e),
    }
}

#[cfg(not(unix))]
async fn mark_executable(_path: &Path) {}
