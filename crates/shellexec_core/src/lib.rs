pub mod audit;
pub mod config;
pub mod settings;
pub mod store;

pub use audit::AuditLog;
pub use config::ShellexecConfig;
pub use settings::{
    ConfigStore, MemoryConfigStore, ScriptConfiguration, TomlConfigStore, DEFAULT_SCRIPT,
};
pub use store::{ScriptStore, StoreError};
