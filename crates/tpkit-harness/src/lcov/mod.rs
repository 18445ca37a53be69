//! Rewrites LCOV source paths so reports from scratch workspaces merge.
//!
//! Only `SF:` records are touched. Paths under the project root become
//! relative to it; paths inside a temporary validation workspace map back to
//! the fixture sources; SDK paths collapse to `sdk/...`.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of LCOV source-file records.
const SOURCE_RECORD: &str = "SF:";

/// Directory the validation fixtures live in, relative to the project root.
pub const VALIDATION_WORKSPACE_DIR: &str = "validation-failures-workspace";

/// Marker of a temporary validation coverage workspace in a path.
pub const SCRATCH_MARKER: &str = "/validation-coverage-";

static SCRATCH_SOURCE: Lazy<Regex> =
    Lazy::new(|| pattern(r"/validation-coverage-[^/]+/([^/]+/src/.+)$"));
static SDK_SOURCE: Lazy<Regex> = Lazy::new(|| pattern(r".*/sdk/src/(.+)$"));
static SDK_OTHER: Lazy<Regex> = Lazy::new(|| pattern(r".*/sdk/(.+)$"));

#[expect(clippy::expect_used, reason = "patterns are valid literals")]
fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("LCOV pattern compiles")
}

/// Rewrites every `SF:` line of `content`; other lines pass through.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use tpkit_harness::lcov::normalize;
///
/// let report = "TN:\nSF:/home/ci/project/sdk/src/lib.rs\nDA:1,1\n";
/// assert_eq!(
///     normalize(report, Path::new("/home/ci/project")),
///     "TN:\nSF:sdk/src/lib.rs\nDA:1,1\n",
/// );
/// ```
#[must_use]
pub fn normalize(content: &str, project_root: &Path) -> String {
    content
        .split('\n')
        .map(|line| match line.strip_prefix(SOURCE_RECORD) {
            Some(path) => format!("{SOURCE_RECORD}{}", normalize_path(path, project_root)),
            None => line.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Maps one source path to its normalised form.
#[must_use]
pub fn normalize_path(path: &str, project_root: &Path) -> String {
    if project_root.is_absolute()
        && let Ok(relative) = Path::new(path).strip_prefix(project_root)
    {
        return relative.to_string_lossy().into_owned();
    }
    if path.contains(SCRATCH_MARKER) {
        return capture(&SCRATCH_SOURCE, path).map_or_else(
            || path.to_owned(),
            |relative| format!("{VALIDATION_WORKSPACE_DIR}/{relative}"),
        );
    }
    if path.contains("/sdk/") {
        if path.contains("/sdk/src/")
            && let Some(relative) = capture(&SDK_SOURCE, path)
        {
            return format!("sdk/src/{relative}");
        }
        return capture(&SDK_OTHER, path)
            .map_or_else(|| path.to_owned(), |relative| format!("sdk/{relative}"));
    }
    path.to_owned()
}

fn capture<'a>(pattern: &Regex, path: &'a str) -> Option<&'a str> {
    pattern
        .captures(path)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
}
