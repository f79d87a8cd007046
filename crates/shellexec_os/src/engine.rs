use crate::{ExecutionResult, ScriptRunner};
use shellexec_core::{ScriptConfiguration, ScriptStore, StoreError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// What happened when the engine was asked to run the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// The interpreter ran to completion. Any exit code counts.
    Completed(ExecutionResult),
    /// Nothing to run: the script file is absent even after syncing.
    Skipped { reason: String },
    /// The script could not be brought in sync, or the interpreter could not
    /// be started. The runner was not invoked with the configured content.
    Failed { error: String },
}

impl Execution {
    pub fn is_completed(&self) -> bool {
        matches!(self, Execution::Completed(_))
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Execution::Completed(r) => Some(r),
            _ => None,
        }
    }
}

/// Runs the stored script and records what happened.
///
/// The store sits behind one lock that is held across sync and run, so saves
/// and executions never interleave.
pub struct ExecutionEngine {
    store: Mutex<ScriptStore>,
    runner: Arc<dyn ScriptRunner>,
}

impl ExecutionEngine {
    pub fn new(store: ScriptStore, runner: Arc<dyn ScriptRunner>) -> Self {
        Self {
            store: Mutex::new(store),
            runner,
        }
    }

    /// Startup hook: create or adopt the on-disk script.
    pub async fn load(&self) -> Result<(), StoreError> {
        self.store.lock().await.load().await
    }

    /// Configuration-updated hook: persist new script text. A successful save
    /// leaves the file in sync, so no separate resync follows.
    pub async fn save(&self, content: &str) -> Result<(), StoreError> {
        self.store.lock().await.save(content).await
    }

    pub async fn config(&self) -> ScriptConfiguration {
        self.store.lock().await.config().clone()
    }

    pub async fn script_path(&self) -> PathBuf {
        self.store.lock().await.script_path().to_path_buf()
    }

    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }

    /// Sync the script file and run it. Never returns an error: sync and
    /// spawn failures come back as [`Execution::Failed`].
    pub async fn execute(&self) -> Execution {
        let mut store = self.store.lock().await;

        // The file on disk must match the configured content before it runs
        if let Err(e) = store.ensure_synced().await {
            tracing::error!("Script sync failed, not executing: {}", e);
            return Execution::Failed {
                error: e.to_string(),
            };
        }

        let script = store.script_path().to_path_buf();
        if !store.script_exists().await {
            tracing::warn!("Script file not found at {}", script.display());
            return Execution::Skipped {
                reason: format!("Script file not found at {}", script.display()),
            };
        }

        let audit = store.audit().clone();
        let working_dir = script
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        audit.append(&format!("EXECUTING SCRIPT: {}", script.display()));
        tracing::info!("Executing {} via {}", script.display(), self.runner.name());

        let result = match self.runner.run(&script, &working_dir).await {
            Ok(r) => r,
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::error!("Failed to execute script: {}", error);
                audit.append(&format!("SPAWN FAILED: {}", error));
                audit.separator();
                return Execution::Failed { error };
            }
        };

        if !result.stdout.is_empty() {
            tracing::info!("Script output: {}", result.stdout);
            audit.append(&stream_entry("STDOUT", &result.stdout, result.stdout_truncated));
        }
        if !result.stderr.is_empty() {
            tracing::warn!("Script error output: {}", result.stderr);
            audit.append(&stream_entry("STDERR", &result.stderr, result.stderr_truncated));
        }
        tracing::info!("Script executed with exit code: {}", result.exit_code);
        audit.append(&format!("EXIT CODE: {}", result.exit_code));
        audit.append("EXECUTION COMPLETED");
        audit.separator();

        Execution::Completed(result)
    }
}

fn stream_entry(label: &str, text: &str, truncated: bool) -> String {
    let body = text.trim_end_matches('\n');
    if truncated {
        format!("{label} (truncated): {body}")
    } else {
        format!("{label}: {body}")
    }
}
