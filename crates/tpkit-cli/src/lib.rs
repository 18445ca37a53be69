//! Command-line front end for the tpkit plugin tooling.
//!
//! [`run`] parses arguments, installs the tracing subscriber, enters the
//! directory given with `-C`, and dispatches the subcommand against the
//! `cargo` found on `PATH`. Reports are written to the supplied stdout;
//! errors go to stderr and produce a failing exit code.

mod cli;
mod commands;
mod errors;
mod telemetry;

#[cfg(test)]
mod tests;

use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tpkit_cargo::{CargoError, SystemToolchain, Toolchain, WorkingDirGuard};

use crate::cli::Cli;
use crate::errors::AppError;

/// Runs the CLI with the provided arguments and output streams.
///
/// Returns [`ExitCode::SUCCESS`] when the command succeeds (including
/// `--help` and `--version`) and [`ExitCode::FAILURE`] otherwise.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_toolchain(args, stdout, stderr, SystemToolchain::locate)
}

pub(crate) fn run_with_toolchain<I, W, E, T, F>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    locate: F,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    T: Toolchain,
    F: FnOnce() -> Result<T, CargoError>,
{
    let cli = match Cli::try_parse_from(args).map_err(AppError::CliUsage) {
        Ok(cli) => cli,
        Err(error) => return report_error(&error, None, stdout, stderr),
    };
    match execute(&cli, stdout, locate) {
        Ok(code) => code,
        Err(error) => report_error(&error, Some(cli.command.name()), stdout, stderr),
    }
}

fn execute<W, T, F>(cli: &Cli, stdout: &mut W, locate: F) -> Result<ExitCode, AppError>
where
    W: Write,
    T: Toolchain,
    F: FnOnce() -> Result<T, CargoError>,
{
    let _telemetry = telemetry::initialise(&cli.log_filter, cli.log_format)?;
    // Held until dispatch returns; dropping it restores the original directory.
    let _directory = cli
        .directory
        .as_deref()
        .map(WorkingDirGuard::enter)
        .transpose()
        .map_err(AppError::Directory)?;
    let root = env::current_dir().map_err(AppError::CurrentDir)?;
    let toolchain = locate().map_err(AppError::Toolchain)?;
    commands::dispatch(&cli.command, &toolchain, &root, stdout)
}

fn report_error<W, E>(
    error: &AppError,
    command: Option<&str>,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    W: Write,
    E: Write,
{
    if let AppError::CliUsage(usage) = error {
        let rendered = usage.render();
        if usage.use_stderr() {
            let _ = write!(stderr, "{rendered}");
            return ExitCode::FAILURE;
        }
        // Help and version output are successful results.
        let _ = write!(stdout, "{rendered}");
        return ExitCode::SUCCESS;
    }

    let _ = writeln!(stderr, "{error}");
    if error.is_unknown_component()
        && let Some(usage) = command.and_then(subcommand_usage)
    {
        let _ = writeln!(stderr, "\n{usage}");
    }
    ExitCode::FAILURE
}

fn subcommand_usage(name: &str) -> Option<String> {
    let mut command = Cli::command();
    command.build();
    command
        .find_subcommand_mut(name)
        .map(|subcommand| subcommand.render_usage().to_string())
}
