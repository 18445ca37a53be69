//! Timestamp-based staleness check for packaged archives.
//!
//! The newest modification time among the component's sources is compared
//! with the archive's. Missing files count as the Unix epoch, so a component
//! without an archive is always rebuilt while an empty tree never is.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Tracing target for the rebuild gate.
const GATE_TARGET: &str = "tpkit_package::gate";

/// Source patterns, relative to the component root, that trigger a rebuild.
pub const SOURCE_PATTERNS: [&str; 3] = ["**/*.rs", "**/Cargo.toml", "**/build.rs"];

/// Outcome of the staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Sources are newer than the archive.
    Stale,
    /// The archive is at least as new as every source.
    UpToDate,
}

/// Returns `true` iff `source` is strictly newer than `artifact`.
#[must_use]
pub fn needs_rebuild(source: SystemTime, artifact: SystemTime) -> bool {
    source > artifact
}

/// Newest modification time of any source under `root`.
#[must_use]
pub fn latest_source_time(root: &Path) -> SystemTime {
    let prefix = glob::Pattern::escape(&root.to_string_lossy());
    SOURCE_PATTERNS
        .iter()
        .filter_map(|pattern| glob::glob(&format!("{prefix}/{pattern}")).ok())
        .flat_map(|paths| paths.filter_map(Result::ok))
        .filter_map(|path| modified(&path))
        .max()
        .unwrap_or(UNIX_EPOCH)
}

/// Modification time of `path`, or the epoch when it does not exist.
#[must_use]
pub fn artifact_time(path: &Path) -> SystemTime {
    modified(path).unwrap_or(UNIX_EPOCH)
}

/// Compares the sources under `root` with the archive at `artifact`.
#[must_use]
pub fn check(root: &Path, artifact: &Path) -> Freshness {
    let source = latest_source_time(root);
    let packaged = artifact_time(artifact);
    let freshness = if needs_rebuild(source, packaged) {
        Freshness::Stale
    } else {
        Freshness::UpToDate
    };
    debug!(
        target: GATE_TARGET,
        root = %root.display(),
        artifact = %artifact.display(),
        ?freshness,
        "checked archive freshness"
    );
    freshness
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
}
