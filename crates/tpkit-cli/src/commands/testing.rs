//! Component, validation, and coverage runners.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use tpkit_cargo::Toolchain;
use tpkit_harness::coverage::{CoverageSession, ReportStatus};
use tpkit_harness::discovery::{discover, select};
use tpkit_harness::runtime::RuntimeRunner;
use tpkit_harness::validation::ValidationRunner;
use tpkit_harness::validation_coverage::{CollectionPaths, collect_validation_coverage};
use tpkit_harness::{Component, HarnessError, RunReport, RunSummary};

use super::{Transcript, exit_code};
use crate::cli::RunArgs;
use crate::errors::AppError;

pub(super) fn runtime<T, W>(
    toolchain: &T,
    root: &Path,
    args: &RunArgs,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    T: Toolchain,
    W: Write,
{
    let components = selected_components(root, args, out)?;
    let runner = RuntimeRunner::new(toolchain).with_timeout(Duration::from_secs(args.timeout));
    let report = run_components(&runner, &components, out)?;
    finish_run(&report.summary, out)
}

pub(super) fn features<T, W>(
    toolchain: &T,
    root: &Path,
    args: &RunArgs,
    coverage: bool,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    T: Toolchain,
    W: Write,
{
    let components = selected_components(root, args, out)?;
    let runner = RuntimeRunner::new(toolchain).with_timeout(Duration::from_secs(args.timeout));
    if !coverage {
        let report = run_components(&runner, &components, out)?;
        return finish_run(&report.summary, out);
    }

    write!(out, "Setting up coverage environment... ")?;
    let session = match CoverageSession::start(toolchain, root) {
        Ok(session) => {
            writeln!(out, "DONE")?;
            session
        }
        Err(error) => {
            writeln!(out, "FAILED")?;
            return Err(HarnessError::from(error).into());
        }
    };
    let instrumented = runner.with_coverage_env(session.env().to_vec());
    let mut report = run_components(&instrumented, &components, out)?;
    match session.report_run(&components, &mut report) {
        ReportStatus::NotAttempted => {
            writeln!(out, "Coverage reports skipped: no clean run to report on")?;
        }
        ReportStatus::Written(paths) => {
            for path in paths {
                writeln!(out, "Coverage report written to {}", path.display())?;
            }
        }
        ReportStatus::Failed(errors) => {
            writeln!(out, "Generating coverage reports... FAILED")?;
            for error in errors {
                writeln!(out, "  {error}")?;
            }
        }
    }
    finish_run(&report.summary, out)
}

pub(super) fn validation<T, W>(
    toolchain: &T,
    root: &Path,
    names: &[String],
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    T: Toolchain,
    W: Write,
{
    let runner = ValidationRunner::new(toolchain, root);
    let mut transcript = Transcript::new(out);
    let outcome = runner.run(names, |member| transcript.line(member));
    transcript.finish()?;
    let report = outcome?;

    writeln!(out, "{}", report.summary)?;
    if report.summary.uncaught > 0 {
        writeln!(
            out,
            "{} known validation gap(s) still compile; record an {} once they are caught",
            report.summary.uncaught,
            tpkit_config::defaults::EXPECTED_ERROR_FILE
        )?;
    }
    Ok(exit_code(report.summary.success()))
}

pub(super) fn validation_coverage<T, W>(
    toolchain: &T,
    root: &Path,
    sdk_dir: Option<&Path>,
    output_dir: Option<&Path>,
    out: &mut W,
) -> Result<ExitCode, AppError>
where
    T: Toolchain,
    W: Write,
{
    let mut paths = CollectionPaths::for_workspace(root);
    if let Some(dir) = sdk_dir {
        paths.sdk = root.join(dir);
    }
    if let Some(dir) = output_dir {
        paths.output = root.join(dir);
    }
    let collected = collect_validation_coverage(toolchain, &paths)?;
    for path in &collected {
        writeln!(out, "Collected {}", path.display())?;
    }
    writeln!(
        out,
        "Validation coverage collected for {} fixture(s)",
        collected.len()
    )?;
    Ok(ExitCode::SUCCESS)
}

fn selected_components<W: Write>(
    root: &Path,
    args: &RunArgs,
    out: &mut W,
) -> Result<Vec<Component>, AppError> {
    let components = select(discover(root)?, &args.names)?;
    writeln!(out, "Running {} component(s)", components.len())?;
    Ok(components)
}

fn run_components<T, W>(
    runner: &RuntimeRunner<T>,
    components: &[Component],
    out: &mut W,
) -> Result<RunReport, AppError>
where
    T: Toolchain,
    W: Write,
{
    let mut transcript = Transcript::new(out);
    let report = runner.run_all(components, |component| transcript.line(component));
    transcript.finish()?;
    Ok(report)
}

fn finish_run<W: Write>(summary: &RunSummary, out: &mut W) -> Result<ExitCode, AppError> {
    writeln!(out, "{summary}")?;
    Ok(exit_code(summary.success()))
}
