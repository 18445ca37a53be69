//! Scripted [`Toolchain`] double for tests.
//!
//! Responses are registered against argument prefixes and, optionally, a
//! working directory. The most specific registration wins: a directory match
//! beats a generic one, then the longest argument prefix, then the most
//! recent registration. Every call is recorded for later assertions.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CargoError;
use crate::invocation::{CargoInvocation, CommandOutput, Toolchain};

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    SpawnFailure(String),
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: Vec<String>,
    working_dir: Option<PathBuf>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, invocation: &CargoInvocation) -> bool {
        let prefix: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
        invocation.starts_with(&prefix)
            && self
                .working_dir
                .as_deref()
                .is_none_or(|dir| dir == invocation.working_dir())
    }

    fn specificity(&self) -> (bool, usize) {
        (self.working_dir.is_some(), self.prefix.len())
    }
}

/// A toolchain that replays canned outputs instead of spawning `cargo`.
#[derive(Debug, Default)]
pub struct ScriptedToolchain {
    rules: Vec<Rule>,
    calls: RefCell<Vec<CargoInvocation>>,
}

impl ScriptedToolchain {
    /// Creates a toolchain with no registered responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies with `output` to any invocation starting with `prefix`.
    #[must_use]
    pub fn respond(self, prefix: &[&str], output: CommandOutput) -> Self {
        self.push(prefix, None, Reply::Output(output))
    }

    /// Replies with `output` to matching invocations run inside `dir`.
    #[must_use]
    pub fn respond_in(self, dir: &Path, prefix: &[&str], output: CommandOutput) -> Self {
        self.push(prefix, Some(dir.to_path_buf()), Reply::Output(output))
    }

    /// Simulates a spawn failure for invocations starting with `prefix`.
    #[must_use]
    pub fn fail_to_spawn(self, prefix: &[&str], message: &str) -> Self {
        self.push(prefix, None, Reply::SpawnFailure(message.to_owned()))
    }

    fn push(mut self, prefix: &[&str], working_dir: Option<PathBuf>, reply: Reply) -> Self {
        self.rules.push(Rule {
            prefix: prefix.iter().map(|arg| (*arg).to_owned()).collect(),
            working_dir,
            reply,
        });
        self
    }

    /// Invocations received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CargoInvocation> {
        self.calls.borrow().clone()
    }

    /// Returns `true` when some recorded call starts with `prefix`.
    #[must_use]
    pub fn invoked(&self, prefix: &[&str]) -> bool {
        self.calls.borrow().iter().any(|call| call.starts_with(prefix))
    }

    fn select(&self, invocation: &CargoInvocation) -> Option<&Rule> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.matches(invocation))
            .max_by_key(|(index, rule)| (rule.specificity(), *index))
            .map(|(_, rule)| rule)
    }
}

impl Toolchain for ScriptedToolchain {
    fn run(&self, invocation: &CargoInvocation) -> Result<CommandOutput, CargoError> {
        self.calls.borrow_mut().push(invocation.clone());
        let reply = self.select(invocation).map(|rule| rule.reply.clone());
        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::SpawnFailure(message)) => Err(spawn_error(invocation, message)),
            None => Err(spawn_error(
                invocation,
                format!("no scripted response for `{}`", invocation.describe()),
            )),
        }
    }
}

fn spawn_error(invocation: &CargoInvocation, message: String) -> CargoError {
    CargoError::Spawn {
        command: invocation.describe(),
        source: Arc::new(io::Error::new(io::ErrorKind::NotFound, message)),
    }
}
