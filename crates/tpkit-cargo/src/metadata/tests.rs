//! Unit tests for metadata decoding and queries.

use std::path::Path;

use rstest::{fixture, rstest};

use super::*;
use crate::invocation::CommandOutput;
use crate::scripted::ScriptedToolchain;

#[fixture]
fn metadata_json() -> String {
    serde_json::json!({
        "packages": [
            {
                "id": "path+file:///work/demo#0.1.0",
                "name": "demo",
                "default_run": "demo-main",
                "manifest_path": "/work/demo/Cargo.toml",
                "metadata": {"touchportal": {"plugin_name": "Demo", "plugin_binary": ""}},
                "targets": []
            },
            {
                "id": "path+file:///work/other#0.2.0",
                "name": "other",
                "default_run": null,
                "metadata": null
            }
        ],
        "target_directory": "/work/target",
        "workspace_root": "/work",
        "version": 1
    })
    .to_string()
}

#[rstest]
fn parse_reads_packages_and_directories(metadata_json: String) {
    let metadata = Metadata::parse(&metadata_json).expect("parse metadata");
    assert_eq!(metadata.packages.len(), 2);
    assert_eq!(
        metadata.target_directory.as_deref(),
        Some(camino::Utf8Path::new("/work/target"))
    );
    let other = metadata
        .package_by_id("path+file:///work/other#0.2.0")
        .expect("other package");
    assert_eq!(other.name, "other");
    assert_eq!(other.default_run, None);
}

#[rstest]
fn package_lookup_requires_exact_id(metadata_json: String) {
    let metadata = Metadata::parse(&metadata_json).expect("parse metadata");
    assert!(metadata.package_by_id("path+file:///work/demo").is_none());
}

#[rstest]
#[case::present("plugin_name", Some("Demo"))]
#[case::empty("plugin_binary", None)]
#[case::absent("missing", None)]
fn metadata_str_ignores_empty_values(
    metadata_json: String,
    #[case] key: &str,
    #[case] expected: Option<&str>,
) {
    let metadata = Metadata::parse(&metadata_json).expect("parse metadata");
    let demo = metadata
        .package_by_id("path+file:///work/demo#0.1.0")
        .expect("demo package");
    assert_eq!(demo.metadata_str("touchportal", key), expected);
}

#[rstest]
fn null_metadata_table_reads_as_absent(metadata_json: String) {
    let metadata = Metadata::parse(&metadata_json).expect("parse metadata");
    let other = metadata
        .package_by_id("path+file:///work/other#0.2.0")
        .expect("other package");
    assert_eq!(other.metadata_str("touchportal", "plugin_name"), None);
}

#[rstest]
fn query_metadata_runs_in_requested_directory(metadata_json: String) {
    let toolchain =
        ScriptedToolchain::new().respond(&["metadata"], CommandOutput::succeeded(metadata_json));

    let metadata = query_metadata(&toolchain, Path::new("/work/demo")).expect("query");

    assert_eq!(metadata.packages.len(), 2);
    let calls = toolchain.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].working_dir(), Path::new("/work/demo"));
    assert_eq!(calls[0].args(), METADATA_ARGS);
}

#[test]
fn query_metadata_rejects_malformed_json() {
    let toolchain =
        ScriptedToolchain::new().respond(&["metadata"], CommandOutput::succeeded("{oops"));
    let error = query_metadata(&toolchain, Path::new("/work")).expect_err("malformed JSON");
    assert!(matches!(error, CargoError::InvalidJson { .. }), "{error:?}");
}

#[test]
fn query_pkgid_trims_output() {
    let toolchain = ScriptedToolchain::new().respond(
        &["pkgid"],
        CommandOutput::succeeded("path+file:///work/demo#0.1.0\n"),
    );
    let pkgid = query_pkgid(&toolchain, Path::new("/work/demo")).expect("pkgid");
    assert_eq!(pkgid, "path+file:///work/demo#0.1.0");
}
