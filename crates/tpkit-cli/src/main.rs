//! CLI entrypoint for the `tpkit` plugin tooling.
//!
//! The binary delegates to [`tpkit_cli::run`], which parses arguments,
//! configures logging, and dispatches the requested subcommand.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    tpkit_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
