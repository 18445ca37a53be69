//! Subcommand handlers.
//!
//! Handlers receive the resolved working directory and a borrowed
//! [`Toolchain`], write human-readable progress to `out`, and return the
//! exit code the run deserves. Hard errors propagate as [`AppError`].

mod package;
mod testing;

use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use tpkit_cargo::Toolchain;

use crate::cli::CliCommand;
use crate::errors::AppError;

pub(crate) fn dispatch<T, W>(
    command: &CliCommand,
    toolchain: &T,
    root: &Path,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    T: Toolchain,
    W: Write,
{
    match command {
        CliCommand::Package { force } => package::package(toolchain, root, *force, out),
        CliCommand::Install { plugins_dir } => {
            package::install(toolchain, root, plugins_dir.as_deref(), out)
        }
        CliCommand::TestRuntime(run) => testing::runtime(toolchain, root, run, out),
        CliCommand::TestFeatures { run, coverage } => {
            testing::features(toolchain, root, run, *coverage, out)
        }
        CliCommand::TestValidation { names } => testing::validation(toolchain, root, names, out),
        CliCommand::ValidationCoverage {
            sdk_dir,
            output_dir,
        } => testing::validation_coverage(
            toolchain,
            root,
            sdk_dir.as_deref(),
            output_dir.as_deref(),
            out,
        ),
    }
}

/// Line writer for observer callbacks, which cannot return errors.
///
/// The first write error is kept and surfaced by [`Transcript::finish`];
/// later lines are dropped.
struct Transcript<'a, W> {
    out: &'a mut W,
    error: Option<io::Error>,
}

impl<'a, W: Write> Transcript<'a, W> {
    const fn new(out: &'a mut W) -> Self {
        Self { out, error: None }
    }

    fn line(&mut self, line: &impl fmt::Display) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = writeln!(self.out, "{line}") {
            self.error = Some(error);
        }
    }

    fn finish(self) -> io::Result<()> {
        self.error.map_or(Ok(()), Err)
    }
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
