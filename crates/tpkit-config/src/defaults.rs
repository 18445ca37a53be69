use std::time::Duration;

use crate::logging::LogFormat;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Wall-clock budget for a component's test binary.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Metadata table holding component settings.
pub const METADATA_TABLE: &str = "touchportal";

/// Key naming the display name inside [`METADATA_TABLE`].
pub const PLUGIN_NAME_KEY: &str = "plugin_name";

/// Key overriding the binary name inside [`METADATA_TABLE`].
pub const PLUGIN_BINARY_KEY: &str = "plugin_binary";

/// Extension of packaged plugin archives.
pub const ARCHIVE_EXTENSION: &str = "tpp";

/// File name of the generated plugin descriptor.
pub const DESCRIPTOR_FILE: &str = "entry.tp";

/// Placeholder the host expands to its plugin folder.
pub const PLUGIN_FOLDER_TOKEN: &str = "%TP_PLUGIN_FOLDER%";

/// Application directory under the user's configuration directory.
pub const APPLICATION_NAME: &str = "TouchPortal";

/// Directory holding installed plugins under [`APPLICATION_NAME`].
pub const PLUGINS_DIR: &str = "plugins";

/// Marker in `src/main.rs` identifying components that can run unattended.
pub const MOCK_SERVER_MARKER: &str = "MockTouchPortalServer";

/// File recording the error a validation fixture must produce.
pub const EXPECTED_ERROR_FILE: &str = "expected-error.txt";

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
