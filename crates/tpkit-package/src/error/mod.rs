//! Errors raised by the packaging pipeline.
//!
//! Each stage owns an enum with structured context. I/O errors are wrapped in
//! `Arc` to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tpkit_cargo::CargoError;
use tpkit_config::ConfigError;
use tpkit_config::defaults::PLUGIN_FOLDER_TOKEN;

/// Errors raised while building a component.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The build command exited unsuccessfully.
    #[error("build of '{binary}' failed with status {status}:\n{stderr}")]
    Failed {
        /// Binary target being built.
        binary: String,
        /// Exit status, `-1` for signal termination.
        status: i32,
        /// Captured standard error of the build.
        stderr: String,
    },

    /// The build or package id query could not be run.
    #[error("failed to run cargo: {0}")]
    Cargo(#[source] CargoError),

    /// No artefact message named the requested binary.
    #[error("could not find the executable for binary '{binary}' in the build output")]
    MissingExecutable {
        /// Binary target being built.
        binary: String,
    },

    /// No build script output directory was reported for the package.
    #[error("could not find the build script output for package '{package_id}'")]
    MissingBuildScriptOutput {
        /// Package identifier that was searched for.
        package_id: String,
    },

    /// The reported executable does not exist.
    #[error("built executable not found at {}", path.display())]
    ExecutableNotFound {
        /// Path reported by cargo.
        path: PathBuf,
    },

    /// The generated descriptor does not exist.
    #[error("generated descriptor not found at {}", path.display())]
    MissingDescriptor {
        /// Path where the descriptor was expected.
        path: PathBuf,
    },
}

/// Errors raised while validating the generated descriptor.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The descriptor could not be read.
    #[error("failed to read descriptor {}: {source}", path.display())]
    Read {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The descriptor is not valid JSON.
    #[error("failed to parse descriptor {}: {source}", path.display())]
    Parse {
        /// Descriptor path.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The start-command pattern could not be compiled.
    #[error("invalid start command pattern: {0}")]
    Pattern(#[source] regex::Error),

    /// The required primary start command is absent.
    #[error("descriptor is missing the required 'plugin_start_cmd' field")]
    MissingStartCommand,

    /// A start command does not have the expected shape.
    #[error(
        "{field} has an invalid format: '{value}'; expected '{}<plugin name>/<binary>[ args...]'",
        PLUGIN_FOLDER_TOKEN
    )]
    InvalidFormat {
        /// Descriptor key holding the command.
        field: String,
        /// Offending value.
        value: String,
    },

    /// The plugin folder segment does not name this plugin.
    #[error("{field} directory mismatch: expected '{expected}', found '{found}'")]
    DirectoryMismatch {
        /// Descriptor key holding the command.
        field: String,
        /// Display name of the plugin.
        expected: String,
        /// Directory named in the command.
        found: String,
    },

    /// The binary segment does not name the built executable.
    #[error("{field} binary mismatch: expected '{expected}', found '{found}'")]
    BinaryMismatch {
        /// Descriptor key holding the command.
        field: String,
        /// File name of the built executable.
        expected: String,
        /// Binary named in the command.
        found: String,
    },
}

/// Errors raised while writing the archive.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Staging the archive contents failed.
    #[error("failed to stage {}: {source}", path.display())]
    Staging {
        /// Path being staged.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The executable path has no file name.
    #[error("executable path {} has no file name", path.display())]
    MissingFileName {
        /// Offending path.
        path: PathBuf,
    },

    /// Writing the ZIP archive failed.
    #[error("failed to write archive {}: {source}", path.display())]
    Archive {
        /// Archive path.
        path: PathBuf,
        /// Underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Moving the finished archive into place failed.
    #[error("failed to save archive {}: {source}", path.display())]
    Persist {
        /// Archive path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Errors raised while installing an archive.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The archive is not a readable ZIP file.
    #[error("invalid .tpp file {}: {source}", path.display())]
    InvalidArchive {
        /// Archive path.
        path: PathBuf,
        /// Underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// An entry would extract outside the scratch directory.
    #[error("archive entry '{name}' has an unsafe path")]
    UnsafeEntry {
        /// Entry name as stored in the archive.
        name: String,
    },

    /// The archive holds no top-level directory.
    #[error("no directory found in archive {}", path.display())]
    NoDirectory {
        /// Archive path.
        path: PathBuf,
    },

    /// The archive holds more than one top-level directory.
    #[error("multiple directories found in archive {}: {}", path.display(), found.join(", "))]
    MultipleDirectories {
        /// Archive path.
        path: PathBuf,
        /// Names of the top-level directories.
        found: Vec<String>,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl InstallError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

/// Errors raised by the end-to-end package and install pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading the component configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Building the component failed.
    #[error(transparent)]
    Build(#[from] BuildError),
    /// The descriptor failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Writing the archive failed.
    #[error(transparent)]
    Package(#[from] PackageError),
    /// Installing the archive failed.
    #[error(transparent)]
    Install(#[from] InstallError),
}
