//! Crate-level tests and shared fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;
use tpkit_cargo::CommandOutput;
use tpkit_cargo::scripted::ScriptedToolchain;

use crate::discovery::Component;

#[cfg(unix)]
mod behaviour;

/// `main.rs` body that wires up the mock host.
pub(crate) const MOCK_MAIN: &str =
    "use touchportal_sdk::mock::MockTouchPortalServer;\n\nfn main() {}\n";

/// `main.rs` body without mock support.
pub(crate) const PLAIN_MAIN: &str = "fn main() {}\n";

/// A directory of component projects plus helper executables.
pub(crate) struct PluginWorkspace {
    dir: TempDir,
}

impl PluginWorkspace {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().expect("workspace dir"),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Creates `<root>/<name>` with a manifest and the given `main.rs`.
    pub(crate) fn component(&self, name: &str, main_source: &str) -> Component {
        let path = self.root().join(name);
        fs::create_dir_all(path.join("src")).expect("component src");
        fs::write(
            path.join("Cargo.toml"),
            format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n"),
        )
        .expect("component manifest");
        fs::write(path.join("src/main.rs"), main_source).expect("main.rs");
        Component::new(name, path)
    }

    /// Writes an executable shell script standing in for a built plugin.
    #[cfg(unix)]
    pub(crate) fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let bin = self.root().join("bin");
        fs::create_dir_all(&bin).expect("bin dir");
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        path
    }
}

pub(crate) fn pkgid(component: &Component) -> String {
    format!(
        "path+file://{}#{}@0.1.0",
        component.path().display(),
        component.name()
    )
}

/// Registers metadata, pkgid, and build replies for `component`.
pub(crate) fn answer_build(
    toolchain: ScriptedToolchain,
    component: &Component,
    executable: &Path,
) -> ScriptedToolchain {
    let id = pkgid(component);
    let metadata = json!({
        "packages": [{
            "id": id,
            "name": component.name(),
            "default_run": null,
            "metadata": null,
        }]
    });
    let messages = [
        json!({
            "reason": "compiler-artifact",
            "package_id": id,
            "target": {"name": component.name(), "kind": ["bin"]},
            "executable": executable,
        }),
        json!({"reason": "build-finished", "success": true}),
    ]
    .iter()
    .map(Value::to_string)
    .collect::<Vec<_>>()
    .join("\n");

    let dir = component.path();
    toolchain
        .respond_in(dir, &["metadata"], CommandOutput::succeeded(metadata.to_string()))
        .respond_in(dir, &["pkgid"], CommandOutput::succeeded(format!("{id}\n")))
        .respond_in(dir, &["build"], CommandOutput::succeeded(messages))
}

/// A validation workspace whose members are listed in the root manifest.
pub(crate) struct ValidationWorkspace {
    dir: TempDir,
}

impl ValidationWorkspace {
    /// Creates `<tmp>/validation-failures-workspace` listing `members`.
    pub(crate) fn new(members: &[&str]) -> Self {
        let dir = TempDir::new().expect("project dir");
        let this = Self { dir };
        let root = this.root();
        fs::create_dir_all(&root).expect("workspace dir");
        let listed: Vec<String> = members.iter().map(|m| format!("\"{m}\"")).collect();
        fs::write(
            root.join("Cargo.toml"),
            format!(
                "[workspace]\nresolver = \"2\"\nmembers = [{}]\n",
                listed.join(", ")
            ),
        )
        .expect("workspace manifest");
        this
    }

    /// Directory above the workspace, standing in for the project root.
    pub(crate) fn project_root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn root(&self) -> PathBuf {
        self.dir.path().join("validation-failures-workspace")
    }

    /// Adds a member with a package manifest and optional expected error.
    pub(crate) fn member(&self, name: &str, expected_error: Option<&str>) -> PathBuf {
        let path = self.root().join(name);
        fs::create_dir_all(&path).expect("member dir");
        fs::write(
            path.join("Cargo.toml"),
            format!(
                "[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n\n\
                 [build-dependencies]\ntouchportal-sdk = {{ path = \"../../sdk\" }}\n"
            ),
        )
        .expect("member manifest");
        fs::write(path.join("plugin.rs"), "pub fn plugin() {}\n").expect("plugin.rs");
        if let Some(text) = expected_error {
            fs::write(path.join("expected-error.txt"), format!("{text}\n"))
                .expect("expected error");
        }
        path
    }
}
