//! Behaviour-driven tests for the runtime and validation runners.

use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tpkit_cargo::CommandOutput;
use tpkit_cargo::scripted::ScriptedToolchain;

use super::{MOCK_MAIN, PLAIN_MAIN, PluginWorkspace, ValidationWorkspace, answer_build};
use crate::discovery::{Component, discover};
use crate::outcome::RunReport;
use crate::runtime::RuntimeRunner;
use crate::validation::{ValidationReport, ValidationRunner};

#[derive(Default)]
struct TestWorld {
    plugins: Option<PluginWorkspace>,
    validation: Option<ValidationWorkspace>,
    toolchain: ScriptedToolchain,
    timeout: Option<Duration>,
    run: Option<RunReport>,
    validation_report: Option<ValidationReport>,
}

impl TestWorld {
    fn plugins(&mut self) -> &PluginWorkspace {
        self.plugins.get_or_insert_with(PluginWorkspace::new)
    }

    fn register(&mut self, component: &Component, script_body: &str) {
        let script = self.plugins().script(component.name(), script_body);
        let toolchain = std::mem::take(&mut self.toolchain);
        self.toolchain = answer_build(toolchain, component, &script);
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a mock-enabled component {name} whose binary runs {body}")]
fn given_mock_component(world: &mut TestWorld, name: String, body: String) {
    let component = world.plugins().component(unquote(&name), MOCK_MAIN);
    world.register(&component, unquote(&body));
}

#[given("a component {name} without mock support")]
fn given_plain_component(world: &mut TestWorld, name: String) {
    world.plugins().component(unquote(&name), PLAIN_MAIN);
}

#[given("a time budget of {millis} milliseconds")]
fn given_time_budget(world: &mut TestWorld, millis: u64) {
    world.timeout = Some(Duration::from_millis(millis));
}

#[given("a validation fixture {name} expecting {error}")]
fn given_expecting_fixture(world: &mut TestWorld, name: String, error: String) {
    let member = unquote(&name).to_owned();
    let workspace = world
        .validation
        .get_or_insert_with(|| ValidationWorkspace::new(&[member.as_str()]));
    workspace.member(&member, Some(unquote(&error)));
}

#[given("a validation fixture {name} with no recorded error")]
fn given_gap_fixture(world: &mut TestWorld, name: String) {
    let member = unquote(&name).to_owned();
    let workspace = world
        .validation
        .get_or_insert_with(|| ValidationWorkspace::new(&[member.as_str()]));
    workspace.member(&member, None);
}

#[given("cargo check of {name} fails with {stderr}")]
fn given_check_failure(world: &mut TestWorld, name: String, stderr: String) {
    let toolchain = std::mem::take(&mut world.toolchain);
    world.toolchain = toolchain.respond(
        &["check", "-p", unquote(&name)],
        CommandOutput::failed(101, unquote(&stderr)),
    );
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the runtime tests run")]
fn when_runtime_runs(world: &mut TestWorld) {
    let components = discover(world.plugins().root()).expect("discover components");
    let timeout = world.timeout.unwrap_or(Duration::from_secs(5));
    let runner = RuntimeRunner::new(&world.toolchain).with_timeout(timeout);
    world.run = Some(runner.run_all(&components, |_| {}));
}

#[when("the validation tests run")]
fn when_validation_runs(world: &mut TestWorld) {
    let workspace = world.validation.as_ref().expect("validation workspace");
    let runner = ValidationRunner::new(&world.toolchain, workspace.root());
    world.validation_report = Some(runner.run(&[], |_| {}).expect("validation run"));
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("{name} is reported as {status}")]
fn then_component_status(world: &mut TestWorld, name: String, status: String) {
    let run = world.run.as_ref().expect("runtime run");
    let report = run
        .components
        .iter()
        .find(|report| report.name == unquote(&name))
        .expect("component report");
    assert_eq!(report.outcome.to_string(), unquote(&status));
}

#[then("the run has {count} failures")]
fn then_failures_plural(world: &mut TestWorld, count: usize) {
    assert_failures(world, count);
}

#[then("the run has {count} failure")]
fn then_failures_singular(world: &mut TestWorld, count: usize) {
    assert_failures(world, count);
}

fn assert_failures(world: &TestWorld, count: usize) {
    let run = world.run.as_ref().expect("runtime run");
    assert_eq!(
        run.summary.failed, count,
        "expected {count} failures in {}",
        run.summary
    );
}

#[then("the validation summary is {summary}")]
fn then_validation_summary(world: &mut TestWorld, summary: String) {
    let report = world.validation_report.as_ref().expect("validation run");
    assert_eq!(report.summary.to_string(), unquote(&summary));
}

#[scenario(path = "tests/features/runners.feature")]
fn runners_behaviour(world: TestWorld) {
    let _ = world;
}
