//! Builds each component and runs its binary against the mock host.
//!
//! The build step has no time limit because a cold dependency build can be
//! slow. The run step executes the produced binary directly rather than
//! through `cargo run`, so a timeout kills the plugin itself instead of an
//! intermediate `cargo` process.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tpkit_cargo::message::{find_executable, parse_stream};
use tpkit_cargo::metadata::{query_metadata, query_pkgid};
use tpkit_cargo::{CargoError, CargoInvocation, Message, TimedRun, Toolchain, run_with_timeout};
use tpkit_config::component::resolve_binary_name;
use tpkit_config::defaults::DEFAULT_TEST_TIMEOUT;
use tracing::{debug, info, warn};

use crate::discovery::Component;
use crate::outcome::{ComponentReport, RunReport, TestOutcome};

/// Tracing target for the runtime runner.
const RUNTIME_TARGET: &str = "tpkit_harness::runtime";

/// Arguments of the build step.
pub const BUILD_ARGS: [&str; 2] = ["build", "--message-format=json"];

/// Runs components one at a time under a wall-clock budget.
#[derive(Debug)]
pub struct RuntimeRunner<T> {
    toolchain: T,
    timeout: Duration,
    env: Vec<(String, String)>,
    coverage: bool,
}

impl<T: Toolchain> RuntimeRunner<T> {
    /// Creates a runner with the default time budget.
    #[must_use]
    pub fn new(toolchain: T) -> Self {
        Self {
            toolchain,
            timeout: DEFAULT_TEST_TIMEOUT,
            env: Vec::new(),
            coverage: false,
        }
    }

    /// Overrides the per-component time budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Applies the coverage environment to every build and run.
    #[must_use]
    pub fn with_coverage_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self.coverage = true;
        self
    }

    /// Time budget applied to each binary.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs every component in order, reporting each as it finishes.
    #[must_use]
    pub fn run_all<F>(&self, components: &[Component], mut observer: F) -> RunReport
    where
        F: FnMut(&ComponentReport),
    {
        let mut report = RunReport::default();
        for component in components {
            let outcome = self.run_component(component);
            let entry = ComponentReport {
                name: component.name().to_owned(),
                outcome,
            };
            observer(&entry);
            report.push(entry);
        }
        info!(
            target: RUNTIME_TARGET,
            total = report.summary.total,
            failed = report.summary.failed,
            "runtime run finished"
        );
        report
    }

    /// Builds and runs one component.
    #[must_use]
    pub fn run_component(&self, component: &Component) -> TestOutcome {
        if !component.has_mock_support() {
            debug!(
                target: RUNTIME_TARGET,
                component = component.name(),
                "no mock host support, skipping"
            );
            return TestOutcome::no_mock_support();
        }

        let executable = match self.build(component) {
            Ok(path) => path,
            Err(outcome) => return outcome,
        };

        let mut command = Command::new(&executable);
        command.current_dir(component.path());
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let outcome = match run_with_timeout(command, self.timeout) {
            Ok(TimedRun::Exited(output)) => match output.status {
                Some(0) if self.coverage => TestOutcome::PassedWithCoverage,
                Some(0) => TestOutcome::Passed,
                Some(code) => TestOutcome::exit_code(code),
                None => TestOutcome::signalled(),
            },
            Ok(TimedRun::TimedOut { .. }) => TestOutcome::TimedOut {
                timeout: self.timeout,
            },
            Err(error) => TestOutcome::Failed {
                detail: format!("execution failed: {error}"),
            },
        };
        if outcome.is_failure() {
            warn!(
                target: RUNTIME_TARGET,
                component = component.name(),
                %outcome,
                "component failed"
            );
        }
        outcome
    }

    fn build(&self, component: &Component) -> Result<PathBuf, TestOutcome> {
        let dir = component.path();
        let binary = self.binary_name(component).map_err(|error| TestOutcome::Failed {
            detail: format!("could not resolve binary: {error}"),
        })?;

        let invocation = CargoInvocation::new(dir, BUILD_ARGS).with_envs(&self.env);
        let output = self
            .toolchain
            .run(&invocation)
            .map_err(|error| TestOutcome::build_failed(&error.to_string()))?;
        if !output.success() {
            return Err(TestOutcome::build_failed(&output.stderr));
        }

        let messages: Vec<Message> = parse_stream(&output.stdout).collect();
        find_executable(&messages, &binary).ok_or_else(|| TestOutcome::Failed {
            detail: format!("build produced no executable for '{binary}'"),
        })
    }

    fn binary_name(&self, component: &Component) -> Result<String, String> {
        let dir = component.path();
        let query = |error: CargoError| error.to_string();
        let metadata = query_metadata(&self.toolchain, dir).map_err(query)?;
        let pkgid = query_pkgid(&self.toolchain, dir).map_err(query)?;
        metadata
            .package_by_id(&pkgid)
            .map(resolve_binary_name)
            .ok_or_else(|| format!("package '{pkgid}' not found in cargo metadata"))
    }
}
