//! Tolerant parsing of `cargo --message-format=json` output.
//!
//! Cargo interleaves JSON messages with anything a build script prints, so
//! each line is parsed independently and lines that do not decode into a
//! known [`Message`] shape are skipped rather than treated as errors.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::trace;

/// Tracing target for message stream parsing.
const MESSAGE_TARGET: &str = "tpkit_cargo::message";

/// One line of cargo's JSON message stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum Message {
    /// A compilation unit finished and produced artefacts.
    CompilerArtifact(Artifact),
    /// A build script ran and recorded its output directory.
    BuildScriptExecuted(BuildScript),
    /// Any other reason, such as diagnostics or `build-finished`.
    #[serde(other)]
    Other,
}

/// Payload of a `compiler-artifact` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artifact {
    /// Package identifier of the unit.
    pub package_id: String,
    /// The target that was compiled.
    pub target: ArtifactTarget,
    /// Path of the linked executable, when the target is a binary.
    #[serde(default)]
    pub executable: Option<PathBuf>,
}

/// Target description inside a `compiler-artifact` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactTarget {
    /// Target name, e.g. the binary name.
    pub name: String,
    /// Target kinds such as `bin` or `lib`.
    #[serde(default)]
    pub kind: Vec<String>,
}

/// Payload of a `build-script-executed` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildScript {
    /// Package identifier owning the build script.
    pub package_id: String,
    /// The script's `OUT_DIR`.
    pub out_dir: PathBuf,
}

/// Parses every decodable message in `stdout`, skipping the rest.
pub fn parse_stream(stdout: &str) -> impl Iterator<Item = Message> + '_ {
    stdout.lines().filter_map(parse_line)
}

fn parse_line(line: &str) -> Option<Message> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(message) => Some(message),
        Err(error) => {
            trace!(
                target: MESSAGE_TARGET,
                %error,
                "skipping undecodable message line"
            );
            None
        }
    }
}

/// Finds the executable produced for the binary target named `binary`.
///
/// When several artefacts match, the last one wins.
pub fn find_executable<'a, I>(messages: I, binary: &str) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Message>,
{
    messages
        .into_iter()
        .filter_map(|message| match message {
            Message::CompilerArtifact(artifact) if artifact.target.name == binary => {
                artifact.executable.clone()
            }
            _ => None,
        })
        .last()
}

/// Finds the build-script output directory recorded for `package_id`.
pub fn find_out_dir<'a, I>(messages: I, package_id: &str) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Message>,
{
    messages
        .into_iter()
        .filter_map(|message| match message {
            Message::BuildScriptExecuted(script) if script.package_id == package_id => {
                Some(script.out_dir.clone())
            }
            _ => None,
        })
        .last()
}
