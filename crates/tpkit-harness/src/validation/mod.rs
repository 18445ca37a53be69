//! Runs "should fail to compile" fixtures and checks their errors.
//!
//! Each workspace member is a plugin whose build script feeds the SDK an
//! invalid definition. A member with `expected-error.txt` must fail
//! `cargo check` with that text somewhere in its diagnostics. A member
//! without one documents a known gap in the SDK's validation: it must
//! still compile, and a failure means the gap may have been closed.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tpkit_cargo::{CargoInvocation, CommandOutput, Toolchain};
use tpkit_config::defaults::EXPECTED_ERROR_FILE;
use tracing::{debug, info, warn};

use crate::discovery::unknown_names;
use crate::error::HarnessError;

/// Tracing target for the validation runner.
const VALIDATION_TARGET: &str = "tpkit_harness::validation";

#[derive(Debug, Default, Deserialize)]
struct WorkspaceManifest {
    #[serde(default)]
    workspace: Option<WorkspaceTable>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkspaceTable {
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    package: Option<PackageTable>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageTable {
    #[serde(default)]
    name: Option<String>,
}

/// Reads `[workspace] members` from `<workspace>/Cargo.toml`.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] or [`HarnessError::Manifest`] when the
/// manifest cannot be read or parsed, and [`HarnessError::NoMembers`] when it
/// lists no members.
pub fn workspace_members(workspace: &Path) -> Result<Vec<String>, HarnessError> {
    let manifest = workspace.join("Cargo.toml");
    let contents = fs::read_to_string(&manifest).map_err(|error| HarnessError::io(&manifest, error))?;
    let parsed: WorkspaceManifest =
        toml::from_str(&contents).map_err(|source| HarnessError::Manifest {
            path: manifest.clone(),
            source,
        })?;
    let members = parsed.workspace.map(|table| table.members).unwrap_or_default();
    if members.is_empty() {
        return Err(HarnessError::NoMembers { manifest });
    }
    Ok(members)
}

/// Reads `[package].name` from `<member_dir>/Cargo.toml`.
///
/// Returns `None` when the manifest is missing, unparsable, or unnamed.
#[must_use]
pub fn package_name(member_dir: &Path) -> Option<String> {
    let contents = fs::read_to_string(member_dir.join("Cargo.toml")).ok()?;
    let parsed: PackageManifest = toml::from_str(&contents).ok()?;
    parsed.package.and_then(|table| table.name)
}

/// Reads and trims `<member_dir>/expected-error.txt`, if present.
#[must_use]
pub fn expected_error(member_dir: &Path) -> Option<String> {
    fs::read_to_string(member_dir.join(EXPECTED_ERROR_FILE))
        .ok()
        .map(|text| text.trim().to_owned())
}

/// Classification of one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Failed with the recorded error.
    ExpectedFailure,
    /// Compiled, as a documented gap should.
    KnownGap,
    /// Compiled although an error was recorded.
    UnexpectedSuccess,
    /// Failed with some other error.
    UnexpectedError {
        /// Recorded error text.
        expected: String,
        /// Captured diagnostics.
        actual: String,
    },
    /// A documented gap no longer compiles.
    GapClosed {
        /// Captured diagnostics.
        stderr: String,
    },
    /// The fixture could not be checked at all.
    Invalid {
        /// What was wrong with it.
        reason: String,
    },
}

impl ValidationOutcome {
    /// Decides the outcome of a finished `cargo check`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tpkit_cargo::CommandOutput;
    /// use tpkit_harness::validation::ValidationOutcome;
    ///
    /// let output = CommandOutput::failed(101, "error[E0502]: cannot borrow");
    /// assert_eq!(
    ///     ValidationOutcome::classify(Some("E0502"), &output),
    ///     ValidationOutcome::ExpectedFailure,
    /// );
    /// ```
    #[must_use]
    pub fn classify(expected: Option<&str>, output: &CommandOutput) -> Self {
        match (expected, output.success()) {
            (Some(_), true) => Self::UnexpectedSuccess,
            (Some(text), false) if output.stderr.contains(text) => Self::ExpectedFailure,
            (Some(text), false) => Self::UnexpectedError {
                expected: text.to_owned(),
                actual: output.stderr.clone(),
            },
            (None, true) => Self::KnownGap,
            (None, false) => Self::GapClosed {
                stderr: output.stderr.clone(),
            },
        }
    }

    /// Returns `true` for outcomes counted as failures.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !matches!(self, Self::ExpectedFailure | Self::KnownGap)
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedFailure => f.write_str("failed with expected error"),
            Self::KnownGap => f.write_str("compiled successfully (expected - validation gap)"),
            Self::UnexpectedSuccess => {
                f.write_str("compiled successfully, but it should have failed!")
            }
            Self::UnexpectedError { expected, actual } => write!(
                f,
                "failed with unexpected error:\nActual error: {}\nExpected error: {expected}",
                actual.trim_end()
            ),
            Self::GapClosed { .. } => f.write_str(
                "failed compilation - validation may have been implemented!\n\
                 This uncaught test should be moved to proper validation test with \
                 expected-error.txt",
            ),
            Self::Invalid { reason } => write!(f, "could not be checked: {reason}"),
        }
    }
}

/// Outcome of one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberReport {
    /// Workspace member path as listed in the manifest.
    pub member: String,
    /// What happened.
    pub outcome: ValidationOutcome,
}

impl fmt::Display for MemberReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.member, self.outcome)
    }
}

/// Totals across a validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Members checked.
    pub total: usize,
    /// Members that failed with their recorded error.
    pub passed: usize,
    /// Documented gaps that still compile.
    pub uncaught: usize,
    /// Everything else.
    pub failed: usize,
}

impl ValidationSummary {
    /// Accounts for one outcome.
    pub fn record(&mut self, outcome: &ValidationOutcome) {
        self.total += 1;
        match outcome {
            ValidationOutcome::ExpectedFailure => self.passed += 1,
            ValidationOutcome::KnownGap => self.uncaught += 1,
            _ => self.failed += 1,
        }
    }

    /// Returns `true` when nothing failed.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}, Passed: {}, Uncaught: {}, Failed: {}",
            self.total, self.passed, self.uncaught, self.failed
        )
    }
}

/// Member reports plus totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Reports in manifest order.
    pub members: Vec<MemberReport>,
    /// Aggregated counts.
    pub summary: ValidationSummary,
}

/// Checks every selected member of a validation workspace.
#[derive(Debug)]
pub struct ValidationRunner<T> {
    toolchain: T,
    workspace: PathBuf,
}

impl<T: Toolchain> ValidationRunner<T> {
    /// Creates a runner over the workspace rooted at `workspace`.
    #[must_use]
    pub fn new(toolchain: T, workspace: impl Into<PathBuf>) -> Self {
        Self {
            toolchain,
            workspace: workspace.into(),
        }
    }

    /// Checks the members named in `filters`, or all members when empty.
    ///
    /// # Errors
    ///
    /// Returns the manifest errors of [`workspace_members`] and
    /// [`HarnessError::UnknownComponents`] when a filter is not a member.
    pub fn run<F>(&self, filters: &[String], mut observer: F) -> Result<ValidationReport, HarnessError>
    where
        F: FnMut(&MemberReport),
    {
        let members = workspace_members(&self.workspace)?;
        let unknown = unknown_names(members.iter().map(String::as_str), filters);
        if !unknown.is_empty() {
            return Err(HarnessError::UnknownComponents {
                names: unknown,
                available: members,
            });
        }

        let mut report = ValidationReport::default();
        for member in members
            .iter()
            .filter(|member| filters.is_empty() || filters.contains(member))
        {
            let outcome = self.check_member(member);
            let entry = MemberReport {
                member: member.clone(),
                outcome,
            };
            observer(&entry);
            report.summary.record(&entry.outcome);
            report.members.push(entry);
        }
        info!(
            target: VALIDATION_TARGET,
            total = report.summary.total,
            failed = report.summary.failed,
            uncaught = report.summary.uncaught,
            "validation run finished"
        );
        Ok(report)
    }

    /// Runs `cargo check` for one member and classifies the result.
    #[must_use]
    pub fn check_member(&self, member: &str) -> ValidationOutcome {
        let dir = self.workspace.join(member);
        if !dir.is_dir() {
            return ValidationOutcome::Invalid {
                reason: format!("directory {} does not exist", dir.display()),
            };
        }
        let Some(package) = package_name(&dir) else {
            return ValidationOutcome::Invalid {
                reason: format!("{member}/Cargo.toml not found or invalid"),
            };
        };
        let expected = expected_error(&dir);
        if expected.is_none() {
            debug!(
                target: VALIDATION_TARGET,
                member,
                "no expected error recorded, treating as a known validation gap"
            );
        }

        let invocation = CargoInvocation::new(&self.workspace, ["check", "-p", package.as_str()]);
        match self.toolchain.run(&invocation) {
            Ok(output) => {
                let outcome = ValidationOutcome::classify(expected.as_deref(), &output);
                if outcome.is_failure() {
                    warn!(target: VALIDATION_TARGET, member, %outcome, "validation fixture failed");
                }
                outcome
            }
            Err(error) => ValidationOutcome::Invalid {
                reason: error.to_string(),
            },
        }
    }
}
