//! Locates component directories and applies name filters.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tpkit_config::defaults::MOCK_SERVER_MARKER;
use tracing::debug;

use crate::error::HarnessError;

/// Tracing target for component discovery.
const DISCOVERY_TARGET: &str = "tpkit_harness::discovery";

/// A buildable project directory under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    name: String,
    path: PathBuf,
}

impl Component {
    /// Creates a component rooted at `path`.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Directory name of the component.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute or caller-relative path of the component directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` when `src/main.rs` wires up the mock host server.
    ///
    /// An unreadable or missing `main.rs` counts as no support.
    #[must_use]
    pub fn has_mock_support(&self) -> bool {
        fs::read_to_string(self.path.join("src").join("main.rs"))
            .is_ok_and(|source| source.contains(MOCK_SERVER_MARKER))
    }
}

/// Lists immediate subdirectories of `dir` containing a `Cargo.toml`.
///
/// Results are sorted by directory name.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] when `dir` cannot be listed.
pub fn discover(dir: &Path) -> Result<Vec<Component>, HarnessError> {
    let entries = fs::read_dir(dir).map_err(|error| HarnessError::io(dir, error))?;
    let mut components = Vec::new();
    for item in entries {
        let entry = item.map_err(|error| HarnessError::io(dir, error))?;
        let path = entry.path();
        if !path.is_dir() || !path.join("Cargo.toml").is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        components.push(Component::new(name, path.clone()));
    }
    components.sort_by(|left, right| left.name.cmp(&right.name));
    debug!(
        target: DISCOVERY_TARGET,
        dir = %dir.display(),
        count = components.len(),
        "discovered components"
    );
    Ok(components)
}

/// Narrows `components` to the names in `filters`, keeping discovery order.
///
/// An empty filter list selects everything.
///
/// # Errors
///
/// Returns [`HarnessError::UnknownComponents`] naming every filter that does
/// not match a discovered component.
pub fn select(components: Vec<Component>, filters: &[String]) -> Result<Vec<Component>, HarnessError> {
    if filters.is_empty() {
        return Ok(components);
    }
    let unknown = unknown_names(components.iter().map(Component::name), filters);
    if !unknown.is_empty() {
        return Err(HarnessError::UnknownComponents {
            names: unknown,
            available: components.iter().map(|c| c.name.clone()).collect(),
        });
    }
    let wanted: BTreeSet<&str> = filters.iter().map(String::as_str).collect();
    Ok(components
        .into_iter()
        .filter(|component| wanted.contains(component.name()))
        .collect())
}

/// Filters that name nothing in `known`, in the order they were given.
pub(crate) fn unknown_names<'a>(
    known: impl IntoIterator<Item = &'a str>,
    filters: &[String],
) -> Vec<String> {
    let known: BTreeSet<&str> = known.into_iter().collect();
    let mut seen = BTreeSet::new();
    filters
        .iter()
        .filter(|name| !known.contains(name.as_str()))
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}
