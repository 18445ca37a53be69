//! Behaviour-driven tests for packaging and installation.

use std::fs::{self, File};
use std::path::PathBuf;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::{FakeBuild, descriptor_for};
use crate::error::{InstallError, PipelineError};
use crate::installer::{InstallReport, install_archive};
use crate::pipeline::{PackageReport, package_component};

#[derive(Default)]
struct TestWorld {
    build: Option<FakeBuild>,
    display_name: String,
    binary: String,
    package: Option<Result<PackageReport, PipelineError>>,
    scratch: Option<TempDir>,
    archive: Option<PathBuf>,
    install: Option<Result<InstallReport, InstallError>>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn scratch(world: &mut TestWorld) -> PathBuf {
    world
        .scratch
        .get_or_insert_with(|| TempDir::new().expect("scratch dir"))
        .path()
        .to_path_buf()
}

fn destination(world: &mut TestWorld) -> PathBuf {
    scratch(world).join("plugins").join("Demo")
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a component {display} with binary {binary}")]
fn given_component(world: &mut TestWorld, display: String, binary: String) {
    world.display_name = display.trim_matches('"').to_owned();
    world.binary = binary.trim_matches('"').to_owned();
}

#[given("its descriptor names the plugin folder {folder}")]
fn given_descriptor(world: &mut TestWorld, folder: String) {
    let descriptor = descriptor_for(folder.trim_matches('"'), &world.binary);
    world.build = Some(FakeBuild::new(&world.binary, &descriptor));
}

#[given("an archive with top-level directories {first} and {second}")]
fn given_two_directory_archive(world: &mut TestWorld, first: String, second: String) {
    let path = scratch(world).join("Demo.tpp");
    let mut writer = ZipWriter::new(File::create(&path).expect("create archive"));
    for dir in [first.trim_matches('"'), second.trim_matches('"')] {
        writer
            .start_file(format!("{dir}/entry.tp"), SimpleFileOptions::default())
            .expect("start entry");
    }
    writer.finish().expect("finish archive");
    world.archive = Some(path);
}

#[given("an existing installation containing {file}")]
fn given_existing_install(world: &mut TestWorld, file: String) {
    let destination = destination(world);
    fs::create_dir_all(&destination).expect("destination");
    fs::write(destination.join(file.trim_matches('"')), b"keep").expect("existing file");
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the component is packaged")]
fn when_packaged(world: &mut TestWorld) {
    let build = world.build.as_ref().expect("component prepared");
    let toolchain = build.toolchain(&world.display_name, &world.binary);
    world.package = Some(package_component(&toolchain, build.root(), false));
}

#[when("the archive is installed")]
fn when_installed(world: &mut TestWorld) {
    let archive = world.archive.clone().expect("archive prepared");
    let destination = destination(world);
    world.install = Some(install_archive(&archive, &destination));
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the archive contains exactly {first} and {second}")]
fn then_archive_entries(world: &mut TestWorld, first: String, second: String) {
    let report = world
        .package
        .as_ref()
        .expect("packaging attempted")
        .as_ref()
        .expect("packaging succeeded");
    let file = File::open(report.outcome.archive()).expect("open archive");
    let archive = ZipArchive::new(file).expect("read archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_owned).collect();
    names.sort_unstable();
    let mut expected = vec![
        first.trim_matches('"').to_owned(),
        second.trim_matches('"').to_owned(),
    ];
    expected.sort_unstable();
    assert_eq!(names, expected);
}

#[then("packaging fails with a directory mismatch")]
fn then_directory_mismatch(world: &mut TestWorld) {
    let result = world.package.as_ref().expect("packaging attempted");
    let Err(error) = result else {
        panic!("expected packaging to fail");
    };
    let message = error.to_string();
    assert!(message.contains("directory mismatch"), "message: {message}");
}

#[then("no archive is written")]
fn then_no_archive(world: &mut TestWorld) {
    let build = world.build.as_ref().expect("component prepared");
    let archive = build.root().join(format!("{}.tpp", world.display_name));
    assert!(!archive.exists());
}

#[then("installation fails with multiple directories")]
fn then_multiple_directories(world: &mut TestWorld) {
    let result = world.install.as_ref().expect("install attempted");
    assert!(
        matches!(result, Err(InstallError::MultipleDirectories { .. })),
        "unexpected result: {result:?}"
    );
}

#[then("the installation still contains {file}")]
fn then_install_untouched(world: &mut TestWorld, file: String) {
    let path = destination(world).join(file.trim_matches('"'));
    assert_eq!(fs::read(path).expect("existing file"), b"keep");
}

#[scenario(path = "tests/features/packaging.feature")]
fn packaging_behaviour(world: TestWorld) {
    let _ = world;
}
