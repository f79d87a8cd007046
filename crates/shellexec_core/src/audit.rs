//! Append-only audit trail of script activity.
//!
//! Independent of `tracing`: the audit file is a plain text log operators can
//! `tail`, and writing to it can never fail the caller.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `[YYYY-MM-DD HH:MM:SS] message`. Errors are swallowed.
    pub fn append(&self, message: &str) {
        self.write_raw(&format_line(message));
    }

    /// Append an empty line between executions.
    pub fn separator(&self) {
        self.write_raw("\n");
    }

    fn write_raw(&self, text: &str) {
        let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        else {
            return;
        };
        let _ = file.write_all(text.as_bytes());
    }
}

fn format_line(message: &str) -> String {
    let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{ts}] {message}\n")
}
