//! Per-component outcomes and run summaries for the runtime runners.

use std::fmt;
use std::time::Duration;

/// Classified result of testing one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The binary exited with status zero.
    Passed,
    /// Passed and left coverage data behind.
    PassedWithCoverage,
    /// Build or run failed.
    Failed {
        /// Human-readable cause.
        detail: String,
    },
    /// The component cannot run unattended.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
    /// The binary outlived its time budget and was killed.
    TimedOut {
        /// Budget that was exceeded.
        timeout: Duration,
    },
}

impl TestOutcome {
    /// Failure with a non-zero exit code.
    #[must_use]
    pub fn exit_code(code: i32) -> Self {
        Self::Failed {
            detail: format!("exit code {code}"),
        }
    }

    /// Failure caused by a process killed from outside.
    #[must_use]
    pub fn signalled() -> Self {
        Self::Failed {
            detail: String::from("terminated by signal"),
        }
    }

    /// Failure during the build step.
    #[must_use]
    pub fn build_failed(stderr: &str) -> Self {
        Self::Failed {
            detail: format!("build failed: {}", stderr.trim()),
        }
    }

    /// Skip for a component without mock host support.
    #[must_use]
    pub fn no_mock_support() -> Self {
        Self::Skipped {
            reason: String::from("no mock support"),
        }
    }

    /// Returns `true` for both passing variants.
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Passed | Self::PassedWithCoverage)
    }

    /// Returns `true` for failures and timeouts.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::TimedOut { .. })
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::PassedWithCoverage => f.write_str("PASSED (coverage data collected)"),
            Self::Failed { detail } => write!(f, "FAILED ({detail})"),
            Self::Skipped { reason } => write!(f, "SKIPPED ({reason})"),
            Self::TimedOut { .. } => {
                f.write_str("FAILED (timed out - plugin should exit gracefully)")
            }
        }
    }
}

/// Outcome of one component, keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentReport {
    /// Component directory name.
    pub name: String,
    /// What happened.
    pub outcome: TestOutcome,
}

impl fmt::Display for ComponentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.outcome)
    }
}

/// Totals across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Components considered.
    pub total: usize,
    /// Components that ran and passed.
    pub tested: usize,
    /// Components skipped without running.
    pub skipped: usize,
    /// Failures, including timeouts and post-run coverage failures.
    pub failed: usize,
}

impl RunSummary {
    /// Accounts for one component outcome.
    pub fn record(&mut self, outcome: &TestOutcome) {
        self.total += 1;
        match outcome {
            TestOutcome::Skipped { .. } => self.skipped += 1,
            _ if outcome.is_pass() => self.tested += 1,
            _ => self.failed += 1,
        }
    }

    /// Returns `true` when nothing failed.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}, Tested: {}, Skipped: {}, Failed: {}",
            self.total, self.tested, self.skipped, self.failed
        )
    }
}

/// Every component report from a run plus the totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Reports in execution order.
    pub components: Vec<ComponentReport>,
    /// Aggregated counts.
    pub summary: RunSummary,
}

impl RunReport {
    /// Appends a report and updates the summary.
    pub fn push(&mut self, report: ComponentReport) {
        self.summary.record(&report.outcome);
        self.components.push(report);
    }

    /// Reports of components that passed.
    pub fn passed(&self) -> impl Iterator<Item = &ComponentReport> {
        self.components
            .iter()
            .filter(|report| report.outcome.is_pass())
    }
}
