//! Host lifecycle hooks: what happens at startup and when the operator
//! changes the script.

use shellexec_core::{AuditLog, ScriptStore, ShellexecConfig, StoreError, TomlConfigStore};
use shellexec_os::{Execution, ExecutionEngine, LocalRunner};
use std::sync::Arc;
use tracing::{error, info};

/// Wire the store, runner and engine from configuration. Touches no files
/// besides reading the persisted script configuration.
pub async fn build_engine(config: &ShellexecConfig) -> Arc<ExecutionEngine> {
    let config_store = Arc::new(TomlConfigStore::new(config.paths.config_store_path()));
    let audit = AuditLog::new(&config.paths.audit_log);
    let store = ScriptStore::open(config.paths.script_path(), config_store, audit).await;
    let runner = Arc::new(LocalRunner::new(
        config.executor.interpreter.clone(),
        config.executor.output_limit(),
    ));
    Arc::new(ExecutionEngine::new(store, runner))
}

/// "On load": create or adopt the script file, then run it once if asked.
/// A persistence failure is logged and startup continues.
pub async fn on_load(engine: &ExecutionEngine, run_on_startup: bool) -> Option<Execution> {
    if let Err(e) = engine.load().await {
        error!("Failed to initialize script: {}", e);
    }
    if !run_on_startup {
        return None;
    }
    info!("Running script on startup");
    Some(engine.execute().await)
}

/// "On configuration updated": persist the new script text and resync.
pub async fn on_config_updated(engine: &ExecutionEngine, content: &str) -> Result<(), StoreError> {
    engine.save(content).await?;
    info!("Script configuration updated");
    Ok(())
}
