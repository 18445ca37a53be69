//! Crate-level tests and shared fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;
use tpkit_cargo::CommandOutput;
use tpkit_cargo::scripted::ScriptedToolchain;

mod behaviour;

pub(crate) const PKGID: &str = "path+file:///work/demo#0.1.0";

/// A component tree whose "build" has already produced artefacts on disk.
pub(crate) struct FakeBuild {
    pub(crate) dir: TempDir,
    pub(crate) executable: PathBuf,
    pub(crate) out_dir: PathBuf,
}

impl FakeBuild {
    pub(crate) fn new(binary: &str, descriptor: &Value) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path();
        fs::write(root.join("Cargo.toml"), "[package]\nname = \"demo\"\n").expect("manifest");
        fs::create_dir_all(root.join("src")).expect("src dir");
        fs::write(root.join("src/main.rs"), "fn main() {}\n").expect("main.rs");

        let release = root.join("target/release");
        let out_dir = release.join("build/demo-0123/out");
        fs::create_dir_all(&out_dir).expect("out dir");
        fs::write(out_dir.join("entry.tp"), descriptor.to_string()).expect("descriptor");
        let executable = release.join(binary);
        fs::write(&executable, b"#!/bin/sh\nexit 0\n").expect("executable");

        Self {
            dir,
            executable,
            out_dir,
        }
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn messages(&self, binary: &str) -> String {
        [
            json!({
                "reason": "build-script-executed",
                "package_id": PKGID,
                "out_dir": self.out_dir,
            }),
            json!({
                "reason": "compiler-artifact",
                "package_id": PKGID,
                "target": {"name": binary, "kind": ["bin"]},
                "executable": self.executable,
            }),
            json!({"reason": "build-finished", "success": true}),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n")
    }

    /// Toolchain answering metadata, pkgid, and build queries for this tree.
    pub(crate) fn toolchain(&self, display_name: &str, binary: &str) -> ScriptedToolchain {
        ScriptedToolchain::new()
            .respond(
                &["metadata"],
                CommandOutput::succeeded(metadata_json(display_name, binary)),
            )
            .respond(&["pkgid"], CommandOutput::succeeded(format!("{PKGID}\n")))
            .respond(&["build"], CommandOutput::succeeded(self.messages(binary)))
    }
}

pub(crate) fn metadata_json(display_name: &str, binary: &str) -> String {
    json!({
        "packages": [{
            "id": PKGID,
            "name": "demo",
            "default_run": binary,
            "metadata": {"touchportal": {"plugin_name": display_name}},
        }]
    })
    .to_string()
}

pub(crate) fn descriptor_for(display_name: &str, binary: &str) -> Value {
    json!({
        "sdk": 7,
        "name": display_name,
        "plugin_start_cmd": format!("%TP_PLUGIN_FOLDER%{display_name}/{binary}"),
        "plugin_start_cmd_windows": format!("%TP_PLUGIN_FOLDER%{display_name}/{binary}.exe --log"),
        "plugin_start_cmd_mac": "null",
    })
}
