//! Collects coverage from validation fixtures by running them as binaries.
//!
//! Validation fixtures only exercise the SDK from their build scripts, which
//! `cargo llvm-cov` does not instrument. This module mirrors the workspace
//! into a scratch directory where each fixture's `plugin.rs` becomes a module
//! of an ordinary binary, runs every binary under `cargo llvm-cov run`, and
//! moves the normalised LCOV reports next to the real workspace.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tpkit_cargo::metadata::query_metadata;
use tpkit_cargo::{CargoInvocation, Toolchain};
use tracing::{debug, info, warn};

use crate::error::{CoverageError, HarnessError};
use crate::lcov;
use crate::validation::{package_name, workspace_members};

/// Tracing target for validation coverage.
const VALIDATION_COVERAGE_TARGET: &str = "tpkit_harness::validation_coverage";

/// Prefix of the scratch workspace directory.
pub const SCRATCH_PREFIX: &str = "validation-coverage-";

/// SDK dependency path used by fixture manifests.
const SDK_RELATIVE_DEPENDENCY: &str = "path = \"../../sdk\"";

/// Entry point wrapping a fixture's `plugin()` definition.
///
/// Validation panics are expected; the binary exits zero either way so the
/// profile is always written.
pub const MAIN_TEMPLATE: &str = r#"mod plugin;

fn main() {
    let result = std::panic::catch_unwind(|| {
        plugin::plugin()
    });

    match result {
        Ok(_plugin) => println!("Plugin generated successfully"),
        Err(e) => {
            println!("Plugin validation failed as expected: {:?}", e);
            std::process::exit(0);
        }
    }
}
"#;

/// Locations used by a coverage collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPaths {
    /// Validation workspace holding the fixtures.
    pub workspace: PathBuf,
    /// SDK crate the fixtures depend on.
    pub sdk: PathBuf,
    /// Directory receiving `validation-<member>.lcov` files.
    pub output: PathBuf,
}

impl CollectionPaths {
    /// Defaults for `workspace`: the SDK is its sibling `sdk` directory and
    /// reports land in the workspace itself.
    #[must_use]
    pub fn for_workspace(dir: impl Into<PathBuf>) -> Self {
        let workspace = dir.into();
        let sdk = workspace
            .parent()
            .map_or_else(|| PathBuf::from("../sdk"), |parent| parent.join("sdk"));
        Self {
            output: workspace.clone(),
            sdk,
            workspace,
        }
    }

    /// Directory source paths are made relative to.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        self.workspace.parent().unwrap_or(&self.workspace)
    }
}

/// Rewrites a fixture manifest for the scratch workspace.
///
/// The relative SDK dependency becomes `sdk_dir` and build dependencies
/// become ordinary dependencies, since the fixture now runs as a binary.
#[must_use]
pub fn rewrite_manifest(manifest: &str, sdk_dir: &Path) -> String {
    let sdk = sdk_dir.to_string_lossy().replace('\\', "/");
    manifest
        .replace(SDK_RELATIVE_DEPENDENCY, &format!("path = \"{sdk}\""))
        .replace("[build-dependencies]", "[dependencies]")
}

/// A scratch copy of the validation workspace, removed on drop.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: TempDir,
    prepared: Vec<String>,
}

impl ScratchWorkspace {
    /// Mirrors `paths.workspace` into a new scratch directory.
    ///
    /// The scratch workspace shares the real workspace's target directory so
    /// dependencies are not rebuilt.
    ///
    /// # Errors
    ///
    /// Returns the manifest errors of [`workspace_members`] and
    /// [`HarnessError::Io`] when files cannot be copied or written.
    pub fn prepare(toolchain: &impl Toolchain, paths: &CollectionPaths) -> Result<Self, HarnessError> {
        let members = workspace_members(&paths.workspace)?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(|error| HarnessError::io(std::env::temp_dir(), error))?;
        let root = dir.path();
        info!(
            target: VALIDATION_COVERAGE_TARGET,
            scratch = %root.display(),
            "creating scratch workspace"
        );

        copy_file(&paths.workspace.join("Cargo.toml"), &root.join("Cargo.toml"))?;
        let lock = paths.workspace.join("Cargo.lock");
        if lock.is_file() {
            copy_file(&lock, &root.join("Cargo.lock"))?;
        }
        write_cargo_config(root, &target_directory(toolchain, &paths.workspace))?;

        let mut prepared = Vec::new();
        for member in members {
            if prepare_member(&paths.workspace.join(&member), &root.join(&member), &paths.sdk)? {
                prepared.push(member);
            }
        }
        Ok(Self { dir, prepared })
    }

    /// Root of the scratch workspace.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Members that received a generated `main.rs`.
    #[must_use]
    pub fn prepared(&self) -> &[String] {
        &self.prepared
    }

    /// Runs `cargo llvm-cov run` for each prepared member and collects the
    /// reports.
    ///
    /// Members without a generated `main.rs` or a readable package name are
    /// skipped. Reports are moved to `paths.output` and normalised against the
    /// project root.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::MissingReport`] when a run leaves no LCOV file
    /// and [`CoverageError::NothingCollected`] when no member produced one.
    pub fn collect(
        &self,
        toolchain: &impl Toolchain,
        paths: &CollectionPaths,
    ) -> Result<Vec<PathBuf>, HarnessError> {
        let mut collected = Vec::new();
        for member in self.prepared() {
            let Some(package) = package_name(&paths.workspace.join(member)) else {
                warn!(
                    target: VALIDATION_COVERAGE_TARGET,
                    member = member.as_str(),
                    "skipping member without a package name"
                );
                continue;
            };
            collected.push(self.collect_member(toolchain, paths, member, &package)?);
        }
        info!(
            target: VALIDATION_COVERAGE_TARGET,
            files = collected.len(),
            "validation coverage collected"
        );
        if collected.is_empty() {
            return Err(CoverageError::NothingCollected.into());
        }
        Ok(collected)
    }

    fn collect_member(
        &self,
        toolchain: &impl Toolchain,
        paths: &CollectionPaths,
        member: &str,
        package: &str,
    ) -> Result<PathBuf, HarnessError> {
        let file_name = format!("validation-{member}.lcov");
        let scratch_report = self.root().join(&file_name);
        let scratch_arg = scratch_report.to_string_lossy().into_owned();
        let invocation = CargoInvocation::new(
            self.root(),
            ["llvm-cov", "run", "--lcov", "--output-path", scratch_arg.as_str(), "-p", package],
        );
        debug!(
            target: VALIDATION_COVERAGE_TARGET,
            member,
            package,
            "collecting coverage"
        );
        let output = toolchain
            .run(&invocation)
            .map_err(CoverageError::Cargo)?;
        if !scratch_report.is_file() {
            return Err(CoverageError::MissingReport {
                member: member.to_owned(),
                path: scratch_report,
                stderr: output.stderr,
            }
            .into());
        }

        let destination = paths.output.join(&file_name);
        move_file(&scratch_report, &destination)?;
        let contents =
            fs::read_to_string(&destination).map_err(|error| HarnessError::io(&destination, error))?;
        fs::write(&destination, lcov::normalize(&contents, paths.project_root()))
            .map_err(|error| HarnessError::io(&destination, error))?;
        Ok(destination)
    }
}

/// Prepares and collects in one step.
///
/// # Errors
///
/// Propagates failures of [`ScratchWorkspace::prepare`] and
/// [`ScratchWorkspace::collect`].
pub fn collect_validation_coverage(
    toolchain: &impl Toolchain,
    paths: &CollectionPaths,
) -> Result<Vec<PathBuf>, HarnessError> {
    fs::create_dir_all(&paths.output).map_err(|error| HarnessError::io(&paths.output, error))?;
    let scratch = ScratchWorkspace::prepare(toolchain, paths)?;
    scratch.collect(toolchain, paths)
}

/// Target directory of `workspace`, falling back to `<workspace>/target`.
fn target_directory(toolchain: &impl Toolchain, workspace: &Path) -> PathBuf {
    match query_metadata(toolchain, workspace) {
        Ok(metadata) => metadata
            .target_directory
            .map_or_else(|| workspace.join("target"), PathBuf::from),
        Err(error) => {
            warn!(
                target: VALIDATION_COVERAGE_TARGET,
                %error,
                "could not query the target directory, using the default"
            );
            workspace.join("target")
        }
    }
}

fn write_cargo_config(root: &Path, target_dir: &Path) -> Result<(), HarnessError> {
    let cargo_dir = root.join(".cargo");
    fs::create_dir_all(&cargo_dir).map_err(|error| HarnessError::io(&cargo_dir, error))?;
    let config = cargo_dir.join("config.toml");
    let target = target_dir.to_string_lossy().replace('\\', "/");
    fs::write(&config, format!("[build]\ntarget-dir = \"{target}\"\n"))
        .map_err(|error| HarnessError::io(&config, error))
}

/// Mirrors one member; returns `false` when it has nothing to run.
fn prepare_member(source: &Path, scratch: &Path, sdk_dir: &Path) -> Result<bool, HarnessError> {
    if !source.is_dir() {
        warn!(
            target: VALIDATION_COVERAGE_TARGET,
            member = %source.display(),
            "member directory does not exist"
        );
        return Ok(false);
    }
    let src = scratch.join("src");
    fs::create_dir_all(&src).map_err(|error| HarnessError::io(&src, error))?;

    let manifest = source.join("Cargo.toml");
    if manifest.is_file() {
        let contents =
            fs::read_to_string(&manifest).map_err(|error| HarnessError::io(&manifest, error))?;
        let rewritten = scratch.join("Cargo.toml");
        fs::write(&rewritten, rewrite_manifest(&contents, sdk_dir))
            .map_err(|error| HarnessError::io(&rewritten, error))?;
    }

    let plugin = source.join("plugin.rs");
    if !plugin.is_file() {
        warn!(
            target: VALIDATION_COVERAGE_TARGET,
            member = %source.display(),
            "no plugin.rs found"
        );
        return Ok(false);
    }
    copy_file(&plugin, &src.join("plugin.rs"))?;
    let main = src.join("main.rs");
    fs::write(&main, MAIN_TEMPLATE).map_err(|error| HarnessError::io(&main, error))?;
    Ok(true)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), HarnessError> {
    fs::copy(from, to)
        .map(drop)
        .map_err(|error| HarnessError::io(from, error))
}

/// Renames, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<(), HarnessError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_file(from, to)?;
    fs::remove_file(from).map_err(|error| HarnessError::io(from, error))
}
