//! Reads a component's identity from `cargo metadata`.
//!
//! The display name is mandatory and lives in the component manifest:
//!
//! ```toml
//! [package.metadata.touchportal]
//! plugin_name = "Demo"
//! plugin_binary = "demo-plugin" # optional
//! ```
//!
//! The binary falls back from `plugin_binary` to `default-run` and finally to
//! the package name.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tpkit_cargo::metadata::{query_metadata, query_pkgid};
use tpkit_cargo::{CargoError, Metadata, Package, Toolchain};
use tracing::debug;

use crate::defaults::{ARCHIVE_EXTENSION, METADATA_TABLE, PLUGIN_BINARY_KEY, PLUGIN_NAME_KEY};

/// Tracing target for component configuration.
const CONFIG_TARGET: &str = "tpkit_config::component";

/// Errors raised while reading component configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `cargo metadata` or `cargo pkgid` failed.
    #[error("failed to read cargo metadata in {}: {source}", dir.display())]
    Cargo {
        /// Directory the query ran in.
        dir: PathBuf,
        /// Underlying toolchain failure, including captured stderr.
        #[source]
        source: CargoError,
    },

    /// No package in the metadata matches the current package id.
    #[error("package '{pkgid}' not found in cargo metadata")]
    PackageNotFound {
        /// Identifier reported by `cargo pkgid`.
        pkgid: String,
    },

    /// The manifest does not declare a display name.
    #[error(
        "package '{package}' does not declare a plugin name; add the following to its Cargo.toml:\n\n[package.metadata.touchportal]\nplugin_name = \"Your Plugin Name\""
    )]
    MissingPluginName {
        /// Package name from the manifest.
        package: String,
    },

    /// The user's home directory could not be determined.
    #[error("could not determine the home directory for the plugin install path")]
    HomeDirectory,
}

/// Identity of a component, derived once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentConfig {
    display_name: String,
    binary_name: String,
    output_filename: String,
}

impl ComponentConfig {
    /// Builds a configuration from explicit names.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tpkit_config::ComponentConfig;
    ///
    /// let config = ComponentConfig::new("Demo", "demo-plugin");
    /// assert_eq!(config.output_filename(), "Demo.tpp");
    /// ```
    pub fn new(display_name: impl Into<String>, binary_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let output_filename = format!("{display_name}.{ARCHIVE_EXTENSION}");
        Self {
            display_name,
            binary_name: binary_name.into(),
            output_filename,
        }
    }

    /// Reads the configuration of the package built in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Cargo`] when either cargo query fails, and the
    /// errors of [`ComponentConfig::from_metadata`] otherwise.
    pub fn load(toolchain: &impl Toolchain, dir: &Path) -> Result<Self, ConfigError> {
        let wrap = |source| ConfigError::Cargo {
            dir: dir.to_path_buf(),
            source,
        };
        let metadata = query_metadata(toolchain, dir).map_err(wrap)?;
        let pkgid = query_pkgid(toolchain, dir).map_err(wrap)?;
        let config = Self::from_metadata(&metadata, &pkgid)?;
        debug!(
            target: CONFIG_TARGET,
            display_name = config.display_name(),
            binary_name = config.binary_name(),
            "loaded component configuration"
        );
        Ok(config)
    }

    /// Derives the configuration for the package identified by `pkgid`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PackageNotFound`] when no package matches and
    /// [`ConfigError::MissingPluginName`] when the display name is absent.
    pub fn from_metadata(metadata: &Metadata, pkgid: &str) -> Result<Self, ConfigError> {
        let package = metadata
            .package_by_id(pkgid)
            .ok_or_else(|| ConfigError::PackageNotFound {
                pkgid: pkgid.to_owned(),
            })?;
        let display_name = package
            .metadata_str(METADATA_TABLE, PLUGIN_NAME_KEY)
            .ok_or_else(|| ConfigError::MissingPluginName {
                package: package.name.clone(),
            })?;
        Ok(Self::new(display_name, resolve_binary_name(package)))
    }

    /// Human-facing plugin name used in paths and archive layout.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Name of the binary target to build.
    #[must_use]
    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    /// File name of the packaged archive, `<display_name>.tpp`.
    #[must_use]
    pub fn output_filename(&self) -> &str {
        &self.output_filename
    }
}

/// Picks the binary target: `plugin_binary`, then `default-run`, then the
/// package name.
#[must_use]
pub fn resolve_binary_name(package: &Package) -> String {
    package
        .metadata_str(METADATA_TABLE, PLUGIN_BINARY_KEY)
        .or_else(|| package.default_run.as_deref().filter(|name| !name.is_empty()))
        .unwrap_or(package.name.as_str())
        .to_owned()
}
