//! `cargo llvm-cov` integration for the feature runner.
//!
//! A [`CoverageSession`] captures the instrumentation environment once,
//! clears stale profiles, and afterwards writes one LCOV report per passing
//! component.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tpkit_cargo::{CargoInvocation, Toolchain};
use tracing::{debug, info, warn};

use crate::discovery::Component;
use crate::error::CoverageError;
use crate::outcome::RunReport;

/// Tracing target for coverage collection.
const COVERAGE_TARGET: &str = "tpkit_harness::coverage";

/// Arguments printing the instrumentation environment as shell exports.
pub const SHOW_ENV_ARGS: [&str; 3] = ["llvm-cov", "show-env", "--export-prefix"];

/// Arguments clearing previously collected profiles.
pub const CLEAN_ARGS: [&str; 3] = ["llvm-cov", "clean", "--workspace"];

static EXPORT_LINE: Lazy<Regex> = Lazy::new(export_line_pattern);

#[expect(clippy::expect_used, reason = "the pattern is a valid literal")]
fn export_line_pattern() -> Regex {
    Regex::new(r"^export\s+([^=]+)=(.*)$").expect("export pattern compiles")
}

/// Parses `export KEY=VALUE` lines printed by `cargo llvm-cov show-env`.
///
/// Values are unquoted with shell-word rules; a value that does not split
/// cleanly is kept verbatim. Other lines are ignored.
///
/// # Example
///
/// ```rust
/// use tpkit_harness::coverage::parse_show_env;
///
/// let env = parse_show_env("export RUSTFLAGS='-C instrument-coverage'\n");
/// assert_eq!(env, [("RUSTFLAGS".to_owned(), "-C instrument-coverage".to_owned())]);
/// ```
#[must_use]
pub fn parse_show_env(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| EXPORT_LINE.captures(line.trim()))
        .filter_map(|captures| {
            let key = captures.get(1)?.as_str().trim();
            let raw = captures.get(2)?.as_str();
            let value = shell_words::split(raw)
                .ok()
                .and_then(|words| words.into_iter().next())
                .unwrap_or_else(|| raw.to_owned());
            Some((key.to_owned(), value))
        })
        .collect()
}

/// File name of the LCOV report written for `component`.
#[must_use]
pub fn report_file_name(component: &str) -> String {
    format!("coverage-{component}.lcov")
}

/// An active coverage collection over one workspace directory.
#[derive(Debug)]
pub struct CoverageSession<T> {
    toolchain: T,
    env: Vec<(String, String)>,
}

impl<T: Toolchain> CoverageSession<T> {
    /// Captures the coverage environment and cleans old profiles in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::ShowEnv`] or [`CoverageError::Clean`] when
    /// either preparatory command fails.
    pub fn start(toolchain: T, dir: &Path) -> Result<Self, CoverageError> {
        let show_env = CargoInvocation::new(dir, SHOW_ENV_ARGS);
        let output = toolchain
            .run_checked(&show_env)
            .map_err(CoverageError::ShowEnv)?;
        let env = parse_show_env(&output.stdout);
        debug!(
            target: COVERAGE_TARGET,
            variables = env.len(),
            "captured coverage environment"
        );

        let clean = CargoInvocation::new(dir, CLEAN_ARGS).with_envs(&env);
        toolchain.run_checked(&clean).map_err(CoverageError::Clean)?;
        info!(target: COVERAGE_TARGET, dir = %dir.display(), "coverage session started");
        Ok(Self { toolchain, env })
    }

    /// Environment applied to instrumented builds and runs.
    #[must_use]
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Writes `../coverage-<name>.lcov` relative to the component directory.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::Report`] when `cargo llvm-cov report` fails.
    pub fn report(&self, component: &Component) -> Result<PathBuf, CoverageError> {
        let file_name = report_file_name(component.name());
        let relative = format!("../{file_name}");
        let invocation = CargoInvocation::new(
            component.path(),
            ["llvm-cov", "report", "--lcov", "--output-path", relative.as_str()],
        )
        .with_envs(&self.env);
        self.toolchain
            .run_checked(&invocation)
            .map_err(|source| CoverageError::Report {
                component: component.name().to_owned(),
                source,
            })?;
        let written = component
            .path()
            .parent()
            .map_or_else(|| PathBuf::from(&file_name), |parent| parent.join(&file_name));
        debug!(
            target: COVERAGE_TARGET,
            component = component.name(),
            path = %written.display(),
            "coverage report written"
        );
        Ok(written)
    }

    /// Generates reports for every passing component once the run is clean.
    ///
    /// Nothing happens when the run had failures or nothing passed. If any
    /// report fails, exactly one failure is added to the run summary.
    #[must_use]
    pub fn report_run(&self, components: &[Component], run: &mut RunReport) -> ReportStatus {
        if !run.summary.success() || run.passed().next().is_none() {
            return ReportStatus::NotAttempted;
        }
        let mut written = Vec::new();
        let mut errors = Vec::new();
        for passed in run.passed() {
            let Some(component) = components.iter().find(|c| c.name() == passed.name) else {
                continue;
            };
            match self.report(component) {
                Ok(path) => written.push(path),
                Err(error) => {
                    warn!(target: COVERAGE_TARGET, %error, "coverage report failed");
                    errors.push(error);
                }
            }
        }
        if errors.is_empty() {
            ReportStatus::Written(written)
        } else {
            run.summary.failed += 1;
            ReportStatus::Failed(errors)
        }
    }
}

/// Result of the post-run reporting step.
#[derive(Debug)]
pub enum ReportStatus {
    /// Skipped because the run failed or nothing passed.
    NotAttempted,
    /// Every passing component produced a report.
    Written(Vec<PathBuf>),
    /// At least one report failed.
    Failed(Vec<CoverageError>),
}
