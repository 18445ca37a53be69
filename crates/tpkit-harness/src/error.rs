//! Errors raised by the test runners.
//!
//! Component-level failures are outcomes, not errors. These enums cover the
//! conditions that abort a whole run.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tpkit_cargo::CargoError;

/// Errors that abort a runner before or between components.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Requested components do not exist.
    #[error("unknown component(s): {}; available: {}", names.join(", "), render_list(available))]
    UnknownComponents {
        /// Names that matched nothing.
        names: Vec<String>,
        /// Names that could have been used.
        available: Vec<String>,
    },

    /// The workspace manifest lists no members.
    #[error("no workspace members found in {}", manifest.display())]
    NoMembers {
        /// Manifest that was read.
        manifest: PathBuf,
    },

    /// A manifest could not be parsed.
    #[error("failed to parse {}: {source}", path.display())]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: toml::de::Error,
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

    /// Coverage collection failed.
    #[error(transparent)]
    Coverage(#[from] CoverageError),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

/// Errors raised while collecting coverage.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// `cargo llvm-cov show-env` failed.
    #[error("could not set up the coverage environment: {0}")]
    ShowEnv(#[source] CargoError),

    /// `cargo llvm-cov clean` failed.
    #[error("could not clean the coverage workspace: {0}")]
    Clean(#[source] CargoError),

    /// `cargo llvm-cov report` failed for a component.
    #[error("coverage report for '{component}' failed: {source}")]
    Report {
        /// Component name.
        component: String,
        /// Underlying toolchain failure.
        #[source]
        source: CargoError,
    },

    /// `cargo llvm-cov run` did not produce its LCOV file.
    #[error("no coverage file generated for '{member}' at {}{}", path.display(), detail_suffix(stderr))]
    MissingReport {
        /// Workspace member.
        member: String,
        /// Expected LCOV path.
        path: PathBuf,
        /// Captured standard error of the run.
        stderr: String,
    },

    /// No member produced coverage.
    #[error("no coverage files were generated from any validation fixture")]
    NothingCollected,

    /// A cargo query needed to set up the workspace failed.
    #[error("failed to run cargo: {0}")]
    Cargo(#[source] CargoError),
}

fn render_list(items: &[String]) -> String {
    if items.is_empty() {
        String::from("(none)")
    } else {
        items.join(", ")
    }
}

fn detail_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}
