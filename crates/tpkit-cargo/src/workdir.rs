//! Scoped changes of the process working directory.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::CargoError;

/// Tracing target for working directory changes.
const WORKDIR_TARGET: &str = "tpkit_cargo::workdir";

/// Restores the previous working directory when dropped.
///
/// The guard is the only place the tooling mutates the process-wide working
/// directory; subprocesses otherwise receive an explicit directory.
#[derive(Debug)]
pub struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    /// Changes into `dir`, remembering the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`CargoError::Io`] when the current directory cannot be read
    /// or `dir` cannot be entered.
    pub fn enter(dir: &Path) -> Result<Self, CargoError> {
        let previous = env::current_dir().map_err(|error| CargoError::io(".", error))?;
        env::set_current_dir(dir).map_err(|error| CargoError::io(dir, error))?;
        debug!(
            target: WORKDIR_TARGET,
            from = %previous.display(),
            to = %dir.display(),
            "changed working directory"
        );
        Ok(Self { previous })
    }

    /// Directory restored on drop.
    #[must_use]
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(error) = env::set_current_dir(&self.previous) {
            warn!(
                target: WORKDIR_TARGET,
                path = %self.previous.display(),
                %error,
                "failed to restore working directory"
            );
        }
    }
}
