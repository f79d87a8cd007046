use crate::{ExecutionResult, ScriptRunner};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Runs scripts with a local interpreter (`/bin/sh <script>` by default).
pub struct LocalRunner {
    interpreter: String,
    output_limit: Option<usize>,
}

impl LocalRunner {
    /// `output_limit` caps the bytes kept per stream; `None` keeps everything.
    pub fn new(interpreter: impl Into<String>, output_limit: Option<usize>) -> Self {
        Self {
            interpreter: interpreter.into(),
            output_limit,
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }
}

#[async_trait]
impl ScriptRunner for LocalRunner {
    async fn run(&self, script: &Path, working_dir: &Path) -> Result<ExecutionResult> {
        let mut child = Command::new(&self.interpreter)
            .arg(script)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start interpreter '{}'", self.interpreter))?;

        let stdout = child.stdout.take().context("stdout was not piped")?;
        let stderr = child.stderr.take().context("stderr was not piped")?;

        // 两个管道必须同时读取，否则子进程可能因缓冲区写满而阻塞
        let (status, out, err) = tokio::try_join!(
            child.wait(),
            read_capped(stdout, self.output_limit),
            read_capped(stderr, self.output_limit),
        )
        .context("Failed while waiting for script")?;

        let exit_code = match status.code() {
            Some(code) => code,
            None => {
                tracing::warn!("Script terminated without exit code: {}", status);
                -1
            }
        };

        Ok(ExecutionResult {
            exit_code,
            stdout: String::from_utf8_lossy(&out.bytes).into_owned(),
            stderr: String::from_utf8_lossy(&err.bytes).into_owned(),
            stdout_truncated: out.truncated,
            stderr_truncated: err.truncated,
        })
    }

    fn name(&self) -> &str {
        "LocalRunner"
    }
}

struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

/// Read `reader` to EOF, keeping at most `limit` bytes. Anything past the
/// limit is drained and dropped.
async fn read_capped<R>(mut reader: R, limit: Option<usize>) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        match limit {
            Some(max) if bytes.len() + n > max => {
                let room = max.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..room]);
                truncated = true;
            }
            _ => bytes.extend_from_slice(&chunk[..n]),
        }
    }
    Ok(Captured { bytes, truncated })
}
