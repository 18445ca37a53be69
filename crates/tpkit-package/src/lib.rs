//! Build, validate, package, and install TouchPortal plugins.
//!
//! The pipeline runs in a fixed order. [`ComponentConfig`] is read from
//! `cargo metadata`, the [`gate`] decides whether the archive is stale, the
//! [`builder`] compiles a release binary and locates the generated
//! `entry.tp`, the [`descriptor`] validator checks its start commands, and
//! the [`packager`] writes the `.tpp` archive. The [`installer`] unpacks an
//! archive into the host's plugin directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tpkit_cargo::SystemToolchain;
//! use tpkit_package::pipeline::package_component;
//!
//! let toolchain = SystemToolchain::locate()?;
//! let report = package_component(&toolchain, Path::new("."), false)?;
//! println!("{}", report.outcome.archive().display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`ComponentConfig`]: tpkit_config::ComponentConfig

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod gate;
pub mod installer;
pub mod packager;
pub mod pipeline;

#[cfg(test)]
mod tests;

pub use self::builder::BuildArtifact;
pub use self::error::{BuildError, InstallError, PackageError, PipelineError, ValidationError};
pub use self::installer::InstallReport;
pub use self::pipeline::{PackageOutcome, PackageReport};
