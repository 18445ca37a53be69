//! Cargo process plumbing shared by the tpkit tooling.
//!
//! Every stage of the plugin pipeline talks to `cargo` as an opaque
//! subprocess. This crate owns that boundary: it describes invocations,
//! runs them through the [`Toolchain`] seam, parses the JSON that `cargo`
//! prints, and supervises produced binaries under a wall-clock budget.
//!
//! # Architecture
//!
//! Callers build a [`CargoInvocation`] and hand it to a [`Toolchain`].
//! [`SystemToolchain`] spawns the real `cargo` found on `PATH`; tests inject
//! a scripted double instead (behind the `test-support` feature) so the
//! pipeline can be exercised without compiling anything.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tpkit_cargo::{SystemToolchain, metadata};
//!
//! let toolchain = SystemToolchain::locate()?;
//! let metadata = metadata::query_metadata(&toolchain, Path::new("."))?;
//! for package in &metadata.packages {
//!     println!("{}", package.name);
//! }
//! # Ok::<(), tpkit_cargo::CargoError>(())
//! ```

pub mod error;
pub mod invocation;
pub mod message;
pub mod metadata;
pub mod process;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;
pub mod workdir;

#[cfg(test)]
mod tests;

pub use self::error::CargoError;
pub use self::invocation::{CargoInvocation, CommandOutput, SystemToolchain, Toolchain};
pub use self::message::Message;
pub use self::metadata::{Metadata, Package};
pub use self::process::{TimedRun, run_with_timeout};
pub use self::workdir::WorkingDirGuard;
