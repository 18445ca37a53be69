//! Writes `.tpp` archives.
//!
//! The archive mirrors a staging tree holding exactly
//! `<display_name>/<binary>` and `<display_name>/entry.tp`. The staging
//! directory is a [`TempDir`] removed when packaging returns, and the archive
//! is written beside its destination before being moved into place, so a
//! failure never leaves a truncated `.tpp` behind.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::{NamedTempFile, TempDir};
use tpkit_config::ComponentConfig;
use tpkit_config::defaults::DESCRIPTOR_FILE;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::builder::BuildArtifact;
use crate::error::PackageError;

/// Tracing target for archive creation.
const PACKAGE_TARGET: &str = "tpkit_package::packager";

/// Permissions recorded for files on platforms without Unix modes.
#[cfg(not(unix))]
const DEFAULT_MODE: u32 = 0o644;

/// Summary of a written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Final archive location.
    pub path: PathBuf,
    /// Archive-internal paths, in the order written.
    pub entries: Vec<String>,
}

/// Stages the artefact and writes the archive to `output`.
///
/// # Errors
///
/// Returns [`PackageError::Staging`] when files cannot be copied,
/// [`PackageError::Archive`] when the ZIP cannot be written, and
/// [`PackageError::Persist`] when the finished archive cannot be moved into
/// place.
pub fn create_archive(
    config: &ComponentConfig,
    artifact: &BuildArtifact,
    output: &Path,
) -> Result<ArchiveReport, PackageError> {
    let staging = stage(config, artifact)?;
    let entries = write_archive(staging.path(), output)?;
    info!(
        target: PACKAGE_TARGET,
        archive = %output.display(),
        entries = entries.len(),
        "created plugin archive"
    );
    Ok(ArchiveReport {
        path: output.to_path_buf(),
        entries,
    })
}

fn stage(config: &ComponentConfig, artifact: &BuildArtifact) -> Result<TempDir, PackageError> {
    let staging = tempfile::Builder::new()
        .prefix("tpkit-stage-")
        .tempdir()
        .map_err(|source| staging_error(std::env::temp_dir(), source))?;
    let plugin_dir = staging.path().join(config.display_name());
    fs::create_dir_all(&plugin_dir).map_err(|source| staging_error(&plugin_dir, source))?;

    let executable_name =
        artifact
            .executable()
            .file_name()
            .ok_or_else(|| PackageError::MissingFileName {
                path: artifact.executable().to_path_buf(),
            })?;
    copy_into(artifact.executable(), &plugin_dir.join(executable_name))?;
    copy_into(artifact.descriptor(), &plugin_dir.join(DESCRIPTOR_FILE))?;

    debug!(
        target: PACKAGE_TARGET,
        staging = %staging.path().display(),
        "staged plugin files"
    );
    Ok(staging)
}

fn copy_into(from: &Path, to: &Path) -> Result<(), PackageError> {
    fs::copy(from, to)
        .map(drop)
        .map_err(|source| staging_error(from, source))
}

fn write_archive(staging_root: &Path, output: &Path) -> Result<Vec<String>, PackageError> {
    let parent = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let temp = NamedTempFile::new_in(&parent).map_err(|source| persist_error(output, source))?;
    let file = temp
        .as_file()
        .try_clone()
        .map_err(|source| persist_error(output, source))?;
    let archive_error = |source| PackageError::Archive {
        path: output.to_path_buf(),
        source,
    };

    let mut writer = ZipWriter::new(file);
    let mut entries = Vec::new();
    for walked in WalkDir::new(staging_root).sort_by_file_name() {
        let entry = walked.map_err(|error| {
            let path = error.path().unwrap_or(staging_root).to_path_buf();
            staging_error(path, io::Error::other(error))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = archive_name(staging_root, entry.path());
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(file_mode(entry.path())?);
        writer
            .start_file(name.as_str(), options)
            .map_err(archive_error)?;
        let mut source =
            File::open(entry.path()).map_err(|error| staging_error(entry.path(), error))?;
        io::copy(&mut source, &mut writer).map_err(|error| archive_error(error.into()))?;
        entries.push(name);
    }
    writer.finish().map_err(archive_error)?;

    temp.persist(output)
        .map_err(|error| persist_error(output, error.error))?;
    Ok(entries)
}

/// Archive path of `path` relative to the staging root, `/`-separated.
fn archive_name(staging_root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(staging_root).unwrap_or(path);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn file_mode(path: &Path) -> Result<u32, PackageError> {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|metadata| metadata.permissions().mode() & 0o777)
        .map_err(|source| staging_error(path, source))
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> Result<u32, PackageError> {
    Ok(DEFAULT_MODE)
}

fn staging_error(path: impl Into<PathBuf>, source: io::Error) -> PackageError {
    PackageError::Staging {
        path: path.into(),
        source: Arc::new(source),
    }
}

fn persist_error(path: &Path, source: io::Error) -> PackageError {
    PackageError::Persist {
        path: path.to_path_buf(),
        source: Arc::new(source),
    }
}
