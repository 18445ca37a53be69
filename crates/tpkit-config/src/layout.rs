//! Where installed plugins live.
//!
//! The host application loads plugins from
//! `<home>/.config/TouchPortal/plugins/<display_name>/`. Tests and unusual
//! setups can point the layout at a different plugins root.

use std::path::{Path, PathBuf};

use crate::component::ConfigError;
use crate::defaults::{APPLICATION_NAME, PLUGINS_DIR};

/// Directory under the home directory holding application settings.
const CONFIG_DIR: &str = ".config";

/// Resolves install destinations for components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    plugins_root: PathBuf,
}

impl InstallLayout {
    /// Uses the current user's plugin directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HomeDirectory`] when the home directory is
    /// unknown.
    pub fn for_user() -> Result<Self, ConfigError> {
        dirs::home_dir()
            .map(|home| Self::under_home(&home))
            .ok_or(ConfigError::HomeDirectory)
    }

    /// Uses the plugin directory below an explicit home directory.
    #[must_use]
    pub fn under_home(home: &Path) -> Self {
        Self::with_plugins_root(
            home.join(CONFIG_DIR)
                .join(APPLICATION_NAME)
                .join(PLUGINS_DIR),
        )
    }

    /// Uses `plugins_root` directly.
    pub fn with_plugins_root(plugins_root: impl Into<PathBuf>) -> Self {
        Self {
            plugins_root: plugins_root.into(),
        }
    }

    /// Directory holding every installed plugin.
    #[must_use]
    pub fn plugins_root(&self) -> &Path {
        &self.plugins_root
    }

    /// Install destination for the plugin called `display_name`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::path::Path;
    /// use tpkit_config::InstallLayout;
    ///
    /// let layout = InstallLayout::under_home(Path::new("/home/ada"));
    /// assert_eq!(
    ///     layout.destination("Demo"),
    ///     Path::new("/home/ada/.config/TouchPortal/plugins/Demo"),
    /// );
    /// ```
    #[must_use]
    pub fn destination(&self, display_name: &str) -> PathBuf {
        self.plugins_root.join(display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_is_used_verbatim() {
        let layout = InstallLayout::with_plugins_root("/tmp/plugins");
        assert_eq!(layout.destination("Demo"), Path::new("/tmp/plugins/Demo"));
    }

    #[test]
    fn user_layout_ends_with_application_segments() {
        let Ok(layout) = InstallLayout::for_user() else {
            return;
        };
        assert!(
            layout
                .plugins_root()
                .ends_with(Path::new(".config/TouchPortal/plugins")),
            "unexpected root {}",
            layout.plugins_root().display()
        );
    }
}
