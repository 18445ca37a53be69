//! Error types for the CLI runtime.

use std::io;

use thiserror::Error;
use tpkit_cargo::CargoError;
use tpkit_config::ConfigError;
use tpkit_harness::HarnessError;
use tpkit_package::PipelineError;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to enter the requested directory: {0}")]
    Directory(CargoError),
    #[error("failed to determine the working directory: {0}")]
    CurrentDir(io::Error),
    #[error("cargo is unavailable: {0}")]
    Toolchain(CargoError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Harness(#[from] HarnessError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl AppError {
    /// Whether the error names components that do not exist.
    pub(crate) const fn is_unknown_component(&self) -> bool {
        matches!(self, Self::Harness(HarnessError::UnknownComponents { .. }))
    }
}
