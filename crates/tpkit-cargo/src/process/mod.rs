//! Runs produced binaries under a wall-clock budget.
//!
//! Standard output and standard error are redirected into anonymous temporary
//! files rather than pipes, so a chatty child can never block on a full pipe
//! buffer while the supervisor is polling. A child that outlives its budget
//! is killed and reaped before returning.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::CargoError;
use crate::invocation::CommandOutput;

/// Tracing target for supervised processes.
const PROCESS_TARGET: &str = "tpkit_cargo::process";

/// Interval between exit-status polls.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a supervised run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimedRun {
    /// The process exited on its own within the budget.
    Exited(CommandOutput),
    /// The process exceeded the budget and was killed.
    TimedOut {
        /// Time spent before the process was killed.
        elapsed: Duration,
    },
}

/// Spawns `command` and waits at most `timeout` for it to exit.
///
/// # Errors
///
/// Returns [`CargoError::Spawn`] when the process cannot be started or
/// waited on, and [`CargoError::Io`] when captured output cannot be read.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<TimedRun, CargoError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let spawn_error = |error: std::io::Error| CargoError::Spawn {
        command: program.clone(),
        source: Arc::new(error),
    };

    let stdout = tempfile::tempfile().map_err(spawn_error)?;
    let stderr = tempfile::tempfile().map_err(spawn_error)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout.try_clone().map_err(spawn_error)?))
        .stderr(Stdio::from(stderr.try_clone().map_err(spawn_error)?));

    debug!(
        target: PROCESS_TARGET,
        program = %program,
        timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        "spawning supervised process"
    );

    let mut child = command.spawn().map_err(spawn_error)?;
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(
                    target: PROCESS_TARGET,
                    program = %program,
                    ?status,
                    "supervised process exited"
                );
                return Ok(TimedRun::Exited(CommandOutput {
                    status: status.code(),
                    stdout: read_captured(stdout, &program)?,
                    stderr: read_captured(stderr, &program)?,
                }));
            }
            Ok(None) => {
                let elapsed = start.elapsed();
                if elapsed > timeout {
                    warn!(
                        target: PROCESS_TARGET,
                        program = %program,
                        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        "process exceeded its time budget, killing it"
                    );
                    drop(child.kill());
                    drop(child.wait());
                    return Ok(TimedRun::TimedOut { elapsed });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(error) => {
                drop(child.kill());
                drop(child.wait());
                return Err(spawn_error(error));
            }
        }
    }
}

fn read_captured(mut file: File, program: &str) -> Result<String, CargoError> {
    let mut buffer = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut buffer))
        .map_err(|error| CargoError::io(program, error))?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
