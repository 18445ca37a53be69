//! Configuration shared by the tpkit packaging and test tooling.
//!
//! A component's identity comes from its own manifest: the
//! `[package.metadata.touchportal]` table read through `cargo metadata`.
//! Tool-level settings (log filter, timeouts, install root) are plain values
//! with defaults in [`defaults`], overridden by command-line flags.

pub mod component;
pub mod defaults;
pub mod layout;
pub mod logging;

pub use self::component::{ComponentConfig, ConfigError};
pub use self::layout::InstallLayout;
pub use self::logging::{LogFormat, LogFormatParseError};
