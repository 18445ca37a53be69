//! Unit tests for argument handling and subcommand dispatch.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use tpkit_cargo::scripted::ScriptedToolchain;
use tpkit_cargo::{CargoError, CommandOutput};

use crate::cli::{Cli, CliCommand};
use crate::commands::dispatch;
use crate::errors::AppError;
use crate::run_with_toolchain;

struct Captured {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn invoke(args: &[&str]) -> Captured {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let argv = std::iter::once("tpkit")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit = run_with_toolchain(argv, &mut stdout, &mut stderr, || {
        Ok(ScriptedToolchain::new())
    });
    Captured {
        exit,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

fn command(args: &[&str]) -> CliCommand {
    Cli::try_parse_from(std::iter::once("tpkit").chain(args.iter().copied()))
        .expect("arguments parse")
        .command
}

fn execute(
    args: &[&str],
    toolchain: &ScriptedToolchain,
    root: &Path,
) -> (Result<ExitCode, AppError>, String) {
    let mut out = Vec::new();
    let result = dispatch(&command(args), toolchain, root, &mut out);
    (result, String::from_utf8(out).expect("utf-8 output"))
}

#[fixture]
fn workspace() -> TempDir {
    TempDir::new().expect("temp dir")
}

fn component(root: &Path, name: &str, main: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(dir.join("src")).expect("component src");
    fs::write(
        dir.join("Cargo.toml"),
        format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n"),
    )
    .expect("component manifest");
    fs::write(dir.join("src/main.rs"), main).expect("component main");
    dir
}

#[rstest]
#[case::help(&["--help"], "Usage: tpkit")]
#[case::subcommand_help(&["test-runtime", "--help"], "--timeout <SECS>")]
#[case::version(&["--version"], "tpkit")]
fn help_and_version_succeed_on_stdout(#[case] args: &[&str], #[case] expected: &str) {
    let captured = invoke(args);
    assert_eq!(captured.exit, ExitCode::SUCCESS);
    assert!(captured.stdout.contains(expected), "{}", captured.stdout);
    assert!(captured.stderr.is_empty(), "{}", captured.stderr);
}

#[test]
fn missing_subcommand_prints_help_and_fails() {
    let captured = invoke(&[]);
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stdout.is_empty(), "{}", captured.stdout);
    assert!(captured.stderr.contains("Usage: tpkit"), "{}", captured.stderr);
}

#[rstest]
#[case::unknown_subcommand(&["publish"])]
#[case::unknown_flag(&["package", "--quiet"])]
#[case::bad_log_format(&["--log-format", "pretty", "package"])]
#[case::bad_timeout(&["test-runtime", "--timeout", "soon"])]
fn usage_errors_fail_on_stderr(#[case] args: &[&str]) {
    let captured = invoke(args);
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(captured.stderr.starts_with("error:"), "{}", captured.stderr);
    assert!(captured.stdout.is_empty(), "{}", captured.stdout);
}

#[test]
fn runner_defaults_follow_configuration() {
    let cli = Cli::try_parse_from(["tpkit", "test-features", "a", "b"]).expect("parse");
    let CliCommand::TestFeatures { run, coverage } = &cli.command else {
        panic!("unexpected command: {:?}", cli.command);
    };
    assert!(!*coverage);
    assert_eq!(run.timeout, 30);
    assert_eq!(run.names, ["a", "b"]);
}

#[test]
fn global_options_are_accepted_after_the_subcommand() {
    let cli = Cli::try_parse_from(["tpkit", "package", "-C", "plugin", "--log-format", "json"])
        .expect("parse");
    assert_eq!(cli.directory.as_deref(), Some(Path::new("plugin")));
    assert_eq!(cli.log_format, tpkit_config::LogFormat::Json);
}

#[test]
fn missing_directory_is_reported() {
    let captured = invoke(&["-C", "/definitely/not/a/tpkit/dir", "package"]);
    assert_eq!(captured.exit, ExitCode::FAILURE);
    assert!(
        captured
            .stderr
            .contains("failed to enter the requested directory"),
        "{}",
        captured.stderr
    );
}

#[test]
fn unavailable_cargo_is_reported() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let args = ["tpkit", "package"].map(OsString::from);
    let exit = run_with_toolchain(args, &mut stdout, &mut stderr, || {
        Err::<ScriptedToolchain, _>(CargoError::NotFound {
            program: "cargo".to_owned(),
            message: "not on PATH".to_owned(),
        })
    });
    assert_eq!(exit, ExitCode::FAILURE);
    let stderr = String::from_utf8(stderr).expect("utf-8 stderr");
    assert!(stderr.contains("cargo is unavailable"), "{stderr}");
}

#[rstest]
fn unknown_components_are_flagged(workspace: TempDir) {
    component(workspace.path(), "alpha", "fn main() {}\n");
    let toolchain = ScriptedToolchain::new();

    let (result, _) = execute(&["test-runtime", "ghost"], &toolchain, workspace.path());

    let error = result.expect_err("unknown component");
    assert!(error.is_unknown_component(), "{error:?}");
    assert!(error.to_string().contains("ghost"), "{error}");
    assert!(toolchain.calls().is_empty());
}

#[test]
fn unknown_component_usage_names_the_subcommand() {
    let usage = crate::subcommand_usage("test-validation").expect("usage");
    assert!(usage.contains("tpkit test-validation"), "{usage}");
}

#[rstest]
fn components_without_mock_support_are_skipped(workspace: TempDir) {
    component(workspace.path(), "legacy", "fn main() {}\n");
    let toolchain = ScriptedToolchain::new();

    let (result, output) = execute(&["test-runtime"], &toolchain, workspace.path());

    assert_eq!(result.expect("run"), ExitCode::SUCCESS);
    assert!(output.contains("Running 1 component(s)"), "{output}");
    assert!(output.contains("legacy: SKIPPED (no mock support)"), "{output}");
    assert!(
        output.contains("Total: 1, Tested: 0, Skipped: 1, Failed: 0"),
        "{output}"
    );
    assert!(!toolchain.invoked(&["build"]));
}

#[rstest]
fn coverage_setup_failure_aborts_the_run(workspace: TempDir) {
    let toolchain = ScriptedToolchain::new().respond(
        &["llvm-cov", "show-env"],
        CommandOutput::failed(101, "error: no such command: `llvm-cov`"),
    );

    let (result, output) = execute(&["test-features", "--coverage"], &toolchain, workspace.path());

    assert!(result.is_err());
    assert!(
        output.contains("Setting up coverage environment... FAILED"),
        "{output}"
    );
    assert!(!toolchain.invoked(&["llvm-cov", "clean"]));
}

#[rstest]
fn validation_prints_members_and_summary(workspace: TempDir) {
    let root = workspace.path();
    fs::write(
        root.join("Cargo.toml"),
        "[workspace]\nmembers = [\"borrow\"]\n",
    )
    .expect("workspace manifest");
    let member = root.join("borrow");
    fs::create_dir_all(&member).expect("member dir");
    fs::write(member.join("Cargo.toml"), "[package]\nname = \"borrow\"\n").expect("manifest");
    fs::write(member.join("expected-error.txt"), "E0502\n").expect("expected error");
    let toolchain = ScriptedToolchain::new().respond(
        &["check", "-p", "borrow"],
        CommandOutput::failed(101, "error[E0502]: cannot borrow `x` as mutable"),
    );

    let (result, output) = execute(&["test-validation"], &toolchain, root);

    assert_eq!(result.expect("validation"), ExitCode::SUCCESS);
    assert!(output.starts_with("borrow: "), "{output}");
    assert!(
        output.contains("Total: 1, Passed: 1, Uncaught: 0, Failed: 0"),
        "{output}"
    );
}

#[rstest]
fn install_reports_missing_metadata(workspace: TempDir) {
    let plugins = workspace.path().join("plugins");
    let plugins_arg = plugins.to_string_lossy().into_owned();
    let toolchain = ScriptedToolchain::new().respond(
        &["metadata"],
        CommandOutput::failed(101, "error: could not find `Cargo.toml`"),
    );

    let (result, output) = execute(
        &["install", "--plugins-dir", plugins_arg.as_str()],
        &toolchain,
        workspace.path(),
    );

    let error = result.expect_err("metadata failure");
    assert!(matches!(error, AppError::Pipeline(_)), "{error:?}");
    assert!(output.is_empty(), "{output}");
    assert!(!plugins.exists());
}
