//! Installs `.tpp` archives into the host's plugin directory.
//!
//! Archives are extracted into a scratch [`TempDir`] first. The destination
//! is only touched once the archive has been fully read and shown to hold
//! exactly one top-level directory, so a corrupt archive never leaves a
//! half-installed plugin behind.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::InstallError;

/// Tracing target for installation.
const INSTALL_TARGET: &str = "tpkit_package::installer";

/// Summary of a finished installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Directory the plugin was installed into.
    pub destination: PathBuf,
    /// Number of files copied.
    pub files: usize,
}

/// Installs `archive` into `destination`, replacing its previous contents.
///
/// # Errors
///
/// Returns [`InstallError::InvalidArchive`] for unreadable archives,
/// [`InstallError::NoDirectory`] or [`InstallError::MultipleDirectories`]
/// when the archive layout is wrong, and [`InstallError::Io`] for
/// filesystem failures.
pub fn install_archive(archive: &Path, destination: &Path) -> Result<InstallReport, InstallError> {
    let scratch = tempfile::Builder::new()
        .prefix("tpkit-install-")
        .tempdir()
        .map_err(|source| InstallError::io(std::env::temp_dir(), source))?;
    extract(archive, scratch.path())?;
    let plugin_dir = single_top_level_dir(archive, &scratch)?;

    if destination.exists() {
        debug!(
            target: INSTALL_TARGET,
            destination = %destination.display(),
            "removing previous installation"
        );
        fs::remove_dir_all(destination).map_err(|source| InstallError::io(destination, source))?;
    }
    fs::create_dir_all(destination).map_err(|source| InstallError::io(destination, source))?;
    let files = copy_tree(&plugin_dir, destination)?;

    info!(
        target: INSTALL_TARGET,
        destination = %destination.display(),
        files,
        "installed plugin"
    );
    Ok(InstallReport {
        destination: destination.to_path_buf(),
        files,
    })
}

fn extract(archive_path: &Path, scratch: &Path) -> Result<(), InstallError> {
    let invalid = |source| InstallError::InvalidArchive {
        path: archive_path.to_path_buf(),
        source,
    };
    let file = File::open(archive_path).map_err(|source| InstallError::io(archive_path, source))?;
    let mut archive = ZipArchive::new(file).map_err(invalid)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(invalid)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| InstallError::UnsafeEntry {
                name: entry.name().to_owned(),
            })?;
        let target = scratch.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|source| InstallError::io(&target, source))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| InstallError::io(parent, source))?;
        }
        let mut output =
            File::create(&target).map_err(|source| InstallError::io(&target, source))?;
        io::copy(&mut entry, &mut output).map_err(|source| invalid(source.into()))?;
        apply_mode(&target, entry.unix_mode())?;
    }
    Ok(())
}

fn single_top_level_dir(archive: &Path, scratch: &TempDir) -> Result<PathBuf, InstallError> {
    let read = fs::read_dir(scratch.path()).map_err(|source| InstallError::io(scratch.path(), source))?;
    let mut directories = Vec::new();
    for item in read {
        let entry = item.map_err(|source| InstallError::io(scratch.path(), source))?;
        if entry.path().is_dir() {
            directories.push(entry.path());
        }
    }
    directories.sort();

    match directories.as_slice() {
        [] => Err(InstallError::NoDirectory {
            path: archive.to_path_buf(),
        }),
        [only] => Ok(only.clone()),
        many => Err(InstallError::MultipleDirectories {
            path: archive.to_path_buf(),
            found: many
                .iter()
                .filter_map(|dir| dir.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect(),
        }),
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<usize, InstallError> {
    let mut files = 0;
    for walked in WalkDir::new(from).min_depth(1) {
        let entry = walked.map_err(|error| {
            let path = error.path().unwrap_or(from).to_path_buf();
            InstallError::io(path, io::Error::other(error))
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|source| InstallError::io(&target, source))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|source| InstallError::io(&target, source))?;
            files += 1;
        }
    }
    Ok(files)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> Result<(), InstallError> {
    use std::os::unix::fs::PermissionsExt;

    let Some(bits) = mode else {
        return Ok(());
    };
    fs::set_permissions(path, fs::Permissions::from_mode(bits & 0o777))
        .map_err(|source| InstallError::io(path, source))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> Result<(), InstallError> {
    Ok(())
}
