//! Test runners for TouchPortal plugin workspaces.
//!
//! Three runners share the same shape: discover component directories, run
//! each one, classify the result, and aggregate a summary whose failure
//! count decides the exit status.
//!
//! - [`runtime::RuntimeRunner`] builds each component and runs its binary
//!   under a time budget. Components that cannot run unattended are skipped.
//!   The feature-test flow wraps the same runner with an optional
//!   [`coverage::CoverageSession`].
//! - [`validation::ValidationRunner`] checks that "should fail to compile"
//!   fixtures fail with their recorded error.
//! - [`validation_coverage`] rebuilds validation fixtures as binaries to
//!   collect LCOV coverage, normalised by [`lcov::normalize`].

pub mod coverage;
pub mod discovery;
pub mod error;
pub mod lcov;
pub mod outcome;
pub mod runtime;
pub mod validation;
pub mod validation_coverage;

#[cfg(test)]
mod tests;

pub use self::discovery::Component;
pub use self::error::{CoverageError, HarnessError};
pub use self::outcome::{ComponentReport, RunReport, RunSummary, TestOutcome};
