//! Errors raised while driving `cargo` and supervised child processes.
//!
//! I/O errors are wrapped in `Arc` to satisfy the `result_large_err` Clippy
//! lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from toolchain invocations.
#[derive(Debug, Error)]
pub enum CargoError {
    /// The requested program could not be found on `PATH`.
    #[error("required tool '{program}' was not found: {message}")]
    NotFound {
        /// Program that was looked up.
        program: String,
        /// Lookup failure description.
        message: String,
    },

    /// The process could not be spawned or waited on.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The process ran but exited unsuccessfully.
    #[error("`{command}` exited with status {status}{}", stderr_suffix(.stderr))]
    Failed {
        /// Rendered command line.
        command: String,
        /// Exit code, or `-1` when the process was terminated by a signal.
        status: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The process printed output that could not be parsed as JSON.
    #[error("`{command}` produced malformed JSON: {source}")]
    InvalidJson {
        /// Rendered command line.
        command: String,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl CargoError {
    /// Returns the captured standard error for failed invocations.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr.as_str()),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}
