//! Validation of the start commands in a generated `entry.tp`.
//!
//! Every start command must have the shape
//! `%TP_PLUGIN_FOLDER%<display name>/<binary>[ args...]`. The primary command
//! is required and must name the built executable exactly. Platform variants
//! are optional and describe binaries built elsewhere, so their binary names
//! are compared without a trailing `.exe`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tpkit_config::defaults::PLUGIN_FOLDER_TOKEN;
use tracing::debug;

use crate::error::ValidationError;

/// Tracing target for descriptor validation.
const DESCRIPTOR_TARGET: &str = "tpkit_package::descriptor";

/// Windows executable suffix ignored when comparing platform variants.
const EXE_SUFFIX: &str = ".exe";

/// Value the SDK writes for platform variants it does not generate.
const NULL_LITERAL: &str = "null";

/// Descriptor keys holding start commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartCommandField {
    /// `plugin_start_cmd`, required.
    Primary,
    /// `plugin_start_cmd_windows`.
    Windows,
    /// `plugin_start_cmd_mac`.
    Mac,
    /// `plugin_start_cmd_linux`.
    Linux,
}

impl StartCommandField {
    /// All fields in validation order.
    pub const ALL: [Self; 4] = [Self::Primary, Self::Windows, Self::Mac, Self::Linux];

    /// JSON key of the field.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Primary => "plugin_start_cmd",
            Self::Windows => "plugin_start_cmd_windows",
            Self::Mac => "plugin_start_cmd_mac",
            Self::Linux => "plugin_start_cmd_linux",
        }
    }

    const fn is_primary(self) -> bool {
        matches!(self, Self::Primary)
    }
}

/// Checks start commands against a plugin's display name and executable.
#[derive(Debug, Clone)]
pub struct StartCommandValidator {
    pattern: Regex,
    display_name: String,
    executable_name: String,
}

impl StartCommandValidator {
    /// Builds a validator for the plugin `display_name` whose built
    /// executable file is called `executable_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Pattern`] if the command pattern fails to
    /// compile.
    pub fn new(
        display_name: impl Into<String>,
        executable_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let source = format!("^{}([^/]+)/(.+)$", regex::escape(PLUGIN_FOLDER_TOKEN));
        let pattern = Regex::new(&source).map_err(ValidationError::Pattern)?;
        Ok(Self {
            pattern,
            display_name: display_name.into(),
            executable_name: executable_name.into(),
        })
    }

    /// Validates the descriptor file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Read`] or [`ValidationError::Parse`] when
    /// the file cannot be loaded, and the errors of
    /// [`StartCommandValidator::validate`] otherwise.
    pub fn validate_file(&self, path: &Path) -> Result<(), ValidationError> {
        let text = fs::read_to_string(path).map_err(|source| ValidationError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        let descriptor: Value =
            serde_json::from_str(&text).map_err(|source| ValidationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        self.validate(&descriptor)
    }

    /// Validates every start command in a parsed descriptor.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, checking the primary command
    /// before the platform variants.
    pub fn validate(&self, descriptor: &Value) -> Result<(), ValidationError> {
        for field in StartCommandField::ALL {
            match command_value(descriptor, field) {
                Some(command) => self.validate_command(field, command)?,
                None if field.is_primary() => return Err(ValidationError::MissingStartCommand),
                None => {}
            }
        }
        Ok(())
    }

    /// Validates one start command string for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFormat`],
    /// [`ValidationError::DirectoryMismatch`] or
    /// [`ValidationError::BinaryMismatch`].
    pub fn validate_command(
        &self,
        field: StartCommandField,
        command: &str,
    ) -> Result<(), ValidationError> {
        let path = command.split(' ').next().unwrap_or(command);
        let captures = self
            .pattern
            .captures(path)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: field.key().to_owned(),
                value: command.to_owned(),
            })?;
        let directory = captures.get(1).map_or("", |segment| segment.as_str());
        let binary = captures.get(2).map_or("", |segment| segment.as_str());

        if directory != self.display_name {
            return Err(ValidationError::DirectoryMismatch {
                field: field.key().to_owned(),
                expected: self.display_name.clone(),
                found: directory.to_owned(),
            });
        }

        let matches = if field.is_primary() {
            binary == self.executable_name
        } else {
            strip_exe(binary) == strip_exe(&self.executable_name)
        };
        if !matches {
            return Err(ValidationError::BinaryMismatch {
                field: field.key().to_owned(),
                expected: self.executable_name.clone(),
                found: binary.to_owned(),
            });
        }

        debug!(
            target: DESCRIPTOR_TARGET,
            field = field.key(),
            command,
            "start command validated"
        );
        Ok(())
    }
}

/// Reads a start command, treating absent, `null`, empty and `"null"` values
/// as missing. Non-string values read as empty and fail the shape check.
fn command_value(descriptor: &Value, field: StartCommandField) -> Option<&str> {
    match descriptor.get(field.key()) {
        None | Some(Value::Null) => None,
        Some(Value::String(command)) if command.is_empty() || command == NULL_LITERAL => None,
        Some(Value::String(command)) => Some(command.as_str()),
        Some(_) => Some(""),
    }
}

fn strip_exe(name: &str) -> &str {
    name.strip_suffix(EXE_SUFFIX).unwrap_or(name)
}
