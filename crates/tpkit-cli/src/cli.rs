//! CLI argument definitions for the `tpkit` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tpkit_config::LogFormat;
use tpkit_config::defaults::{DEFAULT_LOG_FILTER, DEFAULT_TEST_TIMEOUT, default_log_format};

/// Build, package, install, and test TouchPortal plugins.
#[derive(Parser, Debug)]
#[command(name = "tpkit", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Runs as if started in DIR.
    #[arg(short = 'C', long, value_name = "DIR", global = true)]
    pub(crate) directory: Option<PathBuf>,
    /// Tracing filter expression, for example `tpkit_package=debug`.
    #[arg(
        long,
        value_name = "FILTER",
        env = "TPKIT_LOG",
        default_value = DEFAULT_LOG_FILTER,
        global = true
    )]
    pub(crate) log_filter: String,
    /// Log output format.
    #[arg(
        long,
        value_name = "FORMAT",
        env = "TPKIT_LOG_FORMAT",
        default_value_t = default_log_format(),
        global = true
    )]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Operations offered by `tpkit`.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Builds, validates, and packages the component into a `.tpp` archive.
    Package {
        /// Rebuilds even when the archive is newer than every source.
        #[arg(long)]
        force: bool,
    },
    /// Packages the component if needed and installs it for the current user.
    Install {
        /// Plugin directory to install into instead of the user's default.
        #[arg(long, value_name = "DIR")]
        plugins_dir: Option<PathBuf>,
    },
    /// Runs each mock-enabled component to completion under a time budget.
    TestRuntime(RunArgs),
    /// Runs components like `test-runtime`, optionally collecting coverage.
    TestFeatures {
        #[command(flatten)]
        run: RunArgs,
        /// Collects per-component LCOV reports with `cargo llvm-cov`.
        #[arg(long)]
        coverage: bool,
    },
    /// Checks that every validation fixture fails to compile as recorded.
    TestValidation {
        /// Fixtures to check; all workspace members when empty.
        #[arg(value_name = "NAME")]
        names: Vec<String>,
    },
    /// Runs validation fixtures as binaries to collect SDK coverage.
    ValidationCoverage {
        /// SDK crate the fixtures depend on. Defaults to `../sdk`.
        #[arg(long, value_name = "DIR")]
        sdk_dir: Option<PathBuf>,
        /// Directory receiving the LCOV files. Defaults to the workspace.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
}

impl CliCommand {
    /// Name of the subcommand as typed on the command line.
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Package { .. } => "package",
            Self::Install { .. } => "install",
            Self::TestRuntime(_) => "test-runtime",
            Self::TestFeatures { .. } => "test-features",
            Self::TestValidation { .. } => "test-validation",
            Self::ValidationCoverage { .. } => "validation-coverage",
        }
    }
}

/// Arguments shared by the component runners.
#[derive(Args, Debug, Clone)]
pub(crate) struct RunArgs {
    /// Seconds a component binary may run before it is stopped.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TEST_TIMEOUT.as_secs())]
    pub(crate) timeout: u64,
    /// Components to run; every discovered component when empty.
    #[arg(value_name = "NAME")]
    pub(crate) names: Vec<String>,
}
