//! Typed view over `cargo metadata` and `cargo pkgid`.

use std::path::Path;

use camino::Utf8PathBuf;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::CargoError;
use crate::invocation::{CargoInvocation, Toolchain};

/// Tracing target for metadata queries.
const METADATA_TARGET: &str = "tpkit_cargo::metadata";

/// Arguments of the metadata query issued by every stage.
pub const METADATA_ARGS: [&str; 3] = ["metadata", "--format-version=1", "--no-deps"];

/// Subset of the `cargo metadata` document the tooling consumes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metadata {
    /// Workspace packages (dependencies are excluded by `--no-deps`).
    pub packages: Vec<Package>,
    /// Shared target directory of the workspace.
    #[serde(default)]
    pub target_directory: Option<Utf8PathBuf>,
}

impl Metadata {
    /// Parses the JSON printed by `cargo metadata`.
    ///
    /// # Errors
    ///
    /// Returns the decoding error when `json` is not a metadata document.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Looks up a package by its exact identifier.
    #[must_use]
    pub fn package_by_id(&self, id: &str) -> Option<&Package> {
        self.packages.iter().find(|package| package.id == id)
    }
}

/// One package entry of the metadata document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Package {
    /// Opaque package identifier, comparable with `cargo pkgid` output.
    pub id: String,
    /// Package name from the manifest.
    pub name: String,
    /// `package.default-run`, if declared.
    #[serde(default)]
    pub default_run: Option<String>,
    /// The free-form `[package.metadata]` table.
    #[serde(default)]
    pub metadata: Value,
}

impl Package {
    /// Reads a string from `[package.metadata.<table>]`.
    ///
    /// Empty strings are treated as absent.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tpkit_cargo::Package;
    ///
    /// let package: Package = serde_json::from_str(
    ///     r#"{"id":"x","name":"x","metadata":{"touchportal":{"plugin_name":"X"}}}"#,
    /// ).unwrap();
    /// assert_eq!(package.metadata_str("touchportal", "plugin_name"), Some("X"));
    /// ```
    #[must_use]
    pub fn metadata_str(&self, table: &str, key: &str) -> Option<&str> {
        self.metadata
            .get(table)
            .and_then(|section| section.get(key))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Runs `cargo metadata` in `dir` and decodes the result.
///
/// # Errors
///
/// Returns [`CargoError::Failed`] on a non-zero exit and
/// [`CargoError::InvalidJson`] when the output cannot be decoded.
pub fn query_metadata(toolchain: &impl Toolchain, dir: &Path) -> Result<Metadata, CargoError> {
    let invocation = CargoInvocation::new(dir, METADATA_ARGS);
    let output = toolchain.run_checked(&invocation)?;
    let metadata = Metadata::parse(&output.stdout).map_err(|source| CargoError::InvalidJson {
        command: invocation.describe(),
        source,
    })?;
    debug!(
        target: METADATA_TARGET,
        dir = %dir.display(),
        packages = metadata.packages.len(),
        "loaded cargo metadata"
    );
    Ok(metadata)
}

/// Runs `cargo pkgid` in `dir` and returns the trimmed identifier.
///
/// # Errors
///
/// Returns [`CargoError::Failed`] on a non-zero exit.
pub fn query_pkgid(toolchain: &impl Toolchain, dir: &Path) -> Result<String, CargoError> {
    let invocation = CargoInvocation::new(dir, ["pkgid"]);
    let output = toolchain.run_checked(&invocation)?;
    Ok(output.stdout.trim().to_owned())
}

#[cfg(test)]
mod tests;
