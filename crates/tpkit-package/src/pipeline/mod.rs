//! End-to-end package and install flows.

use std::path::{Path, PathBuf};

use tpkit_cargo::Toolchain;
use tpkit_config::{ComponentConfig, InstallLayout};
use tracing::info;

use crate::builder::build_release;
use crate::descriptor::StartCommandValidator;
use crate::error::{PackageError, PipelineError};
use crate::gate::{self, Freshness};
use crate::installer::{InstallReport, install_archive};
use crate::packager::create_archive;

/// Tracing target for pipeline orchestration.
const PIPELINE_TARGET: &str = "tpkit_package::pipeline";

/// What packaging did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// The archive was already newer than every source.
    UpToDate {
        /// Existing archive.
        archive: PathBuf,
    },
    /// The component was rebuilt and packaged.
    Packaged {
        /// Freshly written archive.
        archive: PathBuf,
        /// Archive-internal paths.
        entries: Vec<String>,
    },
}

impl PackageOutcome {
    /// Archive path in either case.
    #[must_use]
    pub fn archive(&self) -> &Path {
        match self {
            Self::UpToDate { archive } | Self::Packaged { archive, .. } => archive,
        }
    }
}

/// Result of [`package_component`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    /// Configuration of the packaged component.
    pub config: ComponentConfig,
    /// What packaging did.
    pub outcome: PackageOutcome,
}

/// Result of [`install_component`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallSummary {
    /// Packaging step that preceded installation.
    pub package: PackageReport,
    /// Installation details.
    pub install: InstallReport,
}

/// Packages the component at `root` into `<root>/<display_name>.tpp`.
///
/// The rebuild gate short-circuits when the archive is current unless
/// `force` is set.
///
/// # Errors
///
/// Returns the first stage error encountered.
pub fn package_component(
    toolchain: &impl Toolchain,
    root: &Path,
    force: bool,
) -> Result<PackageReport, PipelineError> {
    let config = ComponentConfig::load(toolchain, root)?;
    let archive = root.join(config.output_filename());

    if !force && gate::check(root, &archive) == Freshness::UpToDate {
        info!(
            target: PIPELINE_TARGET,
            archive = %archive.display(),
            "archive is up to date, skipping build"
        );
        return Ok(PackageReport {
            config,
            outcome: PackageOutcome::UpToDate { archive },
        });
    }

    let artifact = build_release(toolchain, root, config.binary_name())?;
    let executable_name = artifact
        .executable()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PackageError::MissingFileName {
            path: artifact.executable().to_path_buf(),
        })?;
    StartCommandValidator::new(config.display_name(), executable_name)?
        .validate_file(artifact.descriptor())?;
    let report = create_archive(&config, &artifact, &archive)?;

    Ok(PackageReport {
        config,
        outcome: PackageOutcome::Packaged {
            archive: report.path,
            entries: report.entries,
        },
    })
}

/// Packages the component at `root` if needed, then installs it.
///
/// # Errors
///
/// Returns the first stage error encountered.
pub fn install_component(
    toolchain: &impl Toolchain,
    root: &Path,
    layout: &InstallLayout,
    force: bool,
) -> Result<InstallSummary, PipelineError> {
    let package = package_component(toolchain, root, force)?;
    let destination = layout.destination(package.config.display_name());
    info!(
        target: PIPELINE_TARGET,
        archive = %package.outcome.archive().display(),
        destination = %destination.display(),
        "installing plugin"
    );
    let install = install_archive(package.outcome.archive(), &destination)?;
    Ok(InstallSummary { package, install })
}
