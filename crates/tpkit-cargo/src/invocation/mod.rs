//! Describes `cargo` invocations and runs them through a [`Toolchain`].
//!
//! [`Toolchain`] is the seam every pipeline stage depends on. The production
//! implementation, [`SystemToolchain`], spawns the real `cargo` binary; test
//! code substitutes a scripted double so stages can be driven without a
//! compiler.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use tracing::debug;

use crate::error::CargoError;

/// Tracing target for toolchain invocations.
const INVOCATION_TARGET: &str = "tpkit_cargo::invocation";

/// Name of the toolchain driver looked up on `PATH`.
const CARGO_PROGRAM: &str = "cargo";

/// Environment variable cargo sets for its subcommands.
const CARGO_ENV: &str = "CARGO";

/// A single `cargo` command line plus the context it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoInvocation {
    working_dir: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CargoInvocation {
    /// Builds an invocation running `cargo <args>` inside `working_dir`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tpkit_cargo::CargoInvocation;
    ///
    /// let invocation = CargoInvocation::new("plugin", ["pkgid"]);
    /// assert_eq!(invocation.describe(), "cargo pkgid");
    /// ```
    pub fn new<I, S>(working_dir: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            working_dir: working_dir.into(),
            args: args.into_iter().map(Into::into).collect(),
            envs: Vec::new(),
        }
    }

    /// Adds environment variables applied on top of the inherited ones.
    #[must_use]
    pub fn with_envs<'a, I>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        self.envs.extend(envs.into_iter().cloned());
        self
    }

    /// Directory the command runs in.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Arguments passed after `cargo`.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Extra environment variables.
    #[must_use]
    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Renders the command line for logs and error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut rendered = String::from(CARGO_PROGRAM);
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(arg);
        }
        rendered
    }

    /// Returns `true` when the arguments start with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        prefix.len() <= self.args.len()
            && self
                .args
                .iter()
                .zip(prefix)
                .all(|(arg, expected)| arg == expected)
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Builds an output record.
    pub fn new(status: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// A successful run that printed `stdout`.
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self::new(Some(0), stdout, String::new())
    }

    /// A failed run with exit code `status` that printed `stderr`.
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self::new(Some(status), String::new(), stderr)
    }

    /// Returns `true` when the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }

    /// Exit status rendered as an integer, `-1` for signal termination.
    #[must_use]
    pub fn status_code(&self) -> i32 {
        self.status.unwrap_or(-1)
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Runs `cargo` commands on behalf of the pipeline.
pub trait Toolchain {
    /// Runs the invocation to completion and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`CargoError::Spawn`] when the process cannot be started.
    /// A non-zero exit is *not* an error at this level.
    fn run(&self, invocation: &CargoInvocation) -> Result<CommandOutput, CargoError>;

    /// Runs the invocation and converts a non-zero exit into an error.
    ///
    /// # Errors
    ///
    /// Returns [`CargoError::Failed`] carrying the captured standard error
    /// when the process exits unsuccessfully.
    fn run_checked(&self, invocation: &CargoInvocation) -> Result<CommandOutput, CargoError> {
        let output = self.run(invocation)?;
        if output.success() {
            Ok(output)
        } else {
            Err(CargoError::Failed {
                command: invocation.describe(),
                status: output.status_code(),
                stderr: output.stderr,
            })
        }
    }
}

impl<T: Toolchain + ?Sized> Toolchain for &T {
    fn run(&self, invocation: &CargoInvocation) -> Result<CommandOutput, CargoError> {
        (**self).run(invocation)
    }
}

/// Spawns the `cargo` binary installed on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemToolchain {
    program: PathBuf,
}

impl SystemToolchain {
    /// Locates `cargo`, preferring the `CARGO` variable set for subcommands.
    ///
    /// # Errors
    ///
    /// Returns [`CargoError::NotFound`] when `cargo` is not on `PATH`.
    pub fn locate() -> Result<Self, CargoError> {
        if let Some(program) = env::var_os(CARGO_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::with_program(program));
        }
        which::which(CARGO_PROGRAM)
            .map(Self::with_program)
            .map_err(|error| CargoError::NotFound {
                program: CARGO_PROGRAM.to_owned(),
                message: error.to_string(),
            })
    }

    /// Uses an explicit `cargo` executable.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: PathBuf::from(program.into()),
        }
    }

    /// Path of the executable this toolchain spawns.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Builds a [`Command`] for the invocation without running it.
    #[must_use]
    pub fn command(&self, invocation: &CargoInvocation) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(invocation.args())
            .current_dir(invocation.working_dir());
        for (key, value) in invocation.envs() {
            command.env(key, value);
        }
        command
    }
}

impl Toolchain for SystemToolchain {
    fn run(&self, invocation: &CargoInvocation) -> Result<CommandOutput, CargoError> {
        debug!(
            target: INVOCATION_TARGET,
            command = %invocation.describe(),
            working_dir = %invocation.working_dir().display(),
            "running cargo"
        );
        let output = self
            .command(invocation)
            .output()
            .map_err(|error| CargoError::Spawn {
                command: invocation.describe(),
                source: Arc::new(error),
            })?;
        let captured = CommandOutput::from(output);
        debug!(
            target: INVOCATION_TARGET,
            command = %invocation.describe(),
            status = captured.status_code(),
            "cargo finished"
        );
        Ok(captured)
    }
}
