pub mod engine;
pub mod local;

pub use engine::{Execution, ExecutionEngine};
pub use local::LocalRunner;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Captured outcome of one script run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Process exit code, `-1` when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

/// ScriptRunner 定义了运行脚本文件的能力
///
/// Implementors:
/// - `LocalRunner`: 用本地解释器运行
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` to completion from `working_dir`.
    ///
    /// An `Err` means the process could not be started or awaited. A non-zero
    /// exit is a successful run with `exit_code != 0`.
    async fn run(&self, script: &Path, working_dir: &Path) -> Result<ExecutionResult>;

    /// 获取 Runner 类型名称 (用于日志)
    fn name(&self) -> &str;
}
