//! Release builds and artefact discovery.
//!
//! The SDK's build script writes `entry.tp` next to its `OUT_DIR`, so the
//! descriptor is found at `<out_dir>/../out/entry.tp` of the build script
//! reported for the component's own package id.

use std::path::{Path, PathBuf};

use tpkit_cargo::message::{self, Message};
use tpkit_cargo::metadata::query_pkgid;
use tpkit_cargo::{CargoInvocation, Toolchain};
use tpkit_config::defaults::DESCRIPTOR_FILE;
use tracing::{debug, info};

use crate::error::BuildError;

/// Tracing target for builds.
const BUILD_TARGET: &str = "tpkit_package::builder";

/// Paths produced by a successful build. Both exist on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    executable: PathBuf,
    descriptor: PathBuf,
}

impl BuildArtifact {
    /// Pairs an executable with its descriptor.
    pub fn new(executable: impl Into<PathBuf>, descriptor: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            descriptor: descriptor.into(),
        }
    }

    /// The linked plugin executable.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The generated `entry.tp`.
    #[must_use]
    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }
}

/// Arguments of the release build for `binary`.
#[must_use]
pub fn release_build_args(binary: &str) -> Vec<String> {
    ["build", "--release", "--bin", binary, "--message-format=json"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Descriptor location derived from a build script's `OUT_DIR`.
#[must_use]
pub fn descriptor_path(out_dir: &Path) -> PathBuf {
    out_dir
        .parent()
        .unwrap_or(out_dir)
        .join("out")
        .join(DESCRIPTOR_FILE)
}

/// Builds `binary` in release mode inside `root` and locates its artefacts.
///
/// # Errors
///
/// Returns [`BuildError::Failed`] when cargo exits unsuccessfully and a
/// distinct variant for each artefact that cannot be located.
pub fn build_release(
    toolchain: &impl Toolchain,
    root: &Path,
    binary: &str,
) -> Result<BuildArtifact, BuildError> {
    info!(target: BUILD_TARGET, binary, "building release binary");
    let invocation = CargoInvocation::new(root, release_build_args(binary));
    let output = toolchain.run(&invocation).map_err(BuildError::Cargo)?;
    if !output.success() {
        return Err(BuildError::Failed {
            binary: binary.to_owned(),
            status: output.status_code(),
            stderr: output.stderr,
        });
    }

    let package_id = query_pkgid(toolchain, root).map_err(BuildError::Cargo)?;
    let messages: Vec<Message> = message::parse_stream(&output.stdout).collect();
    debug!(
        target: BUILD_TARGET,
        binary,
        messages = messages.len(),
        "parsed build messages"
    );

    let executable = message::find_executable(&messages, binary).ok_or_else(|| {
        BuildError::MissingExecutable {
            binary: binary.to_owned(),
        }
    })?;
    let out_dir = message::find_out_dir(&messages, &package_id).ok_or_else(|| {
        BuildError::MissingBuildScriptOutput {
            package_id: package_id.clone(),
        }
    })?;

    if !executable.is_file() {
        return Err(BuildError::ExecutableNotFound { path: executable });
    }
    let descriptor = descriptor_path(&out_dir);
    if !descriptor.is_file() {
        return Err(BuildError::MissingDescriptor { path: descriptor });
    }

    info!(
        target: BUILD_TARGET,
        executable = %executable.display(),
        descriptor = %descriptor.display(),
        "build complete"
    );
    Ok(BuildArtifact::new(executable, descriptor))
}
