//! Behaviour-driven tests for spec validation.

use std::cell::RefCell;

use camino::Utf8PathBuf;
use configfile::{parse, parse_value, save_file};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use crate::{Spec, Violations};

const EXEC_SPEC: &str = r#"
type = dictionary
doc = "Commands to run in sequence."
dictionary_keys = {
    commands = { type = list, list_members = { type = string } }
    retries = { type = int, optional = true }
}
"#;

#[derive(Default)]
struct TestWorld {
    spec: Option<Spec>,
    spec_file: Option<(TempDir, Utf8PathBuf)>,
    violations: Option<Violations>,
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

#[given("the exec parameter spec")]
fn given_spec(world: &RefCell<TestWorld>) {
    world.borrow_mut().spec = Some(Spec::from_text(EXEC_SPEC).expect("spec compiles"));
}

#[given("a spec file holding the exec parameter spec")]
fn given_spec_file(world: &RefCell<TestWorld>) {
    let dir = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("exec.spec")).expect("utf8 temp path");
    let document = parse(EXEC_SPEC).expect("spec parses");
    save_file(&path, &document).expect("spec saves");
    world.borrow_mut().spec_file = Some((dir, path));
}

#[when("the spec file is loaded")]
fn when_spec_loaded(world: &RefCell<TestWorld>) {
    let mut state = world.borrow_mut();
    let (_, path) = state.spec_file.as_ref().expect("spec file written");
    let spec = Spec::load(path).expect("spec loads");
    state.spec = Some(spec);
}

#[when("the value {text} is verified")]
fn when_verified(world: &RefCell<TestWorld>, text: String) {
    let mut state = world.borrow_mut();
    let value = parse_value(strip_quotes(&text)).expect("value parses");
    let violations = state.spec.as_ref().expect("spec available").verify(&value);
    state.violations = Some(violations);
}

#[then("there are {count} violations")]
fn then_count(world: &RefCell<TestWorld>, count: usize) {
    let state = world.borrow();
    let violations = state.violations.as_ref().expect("value verified");
    assert_eq!(violations.len(), count, "{violations}");
}

#[then("a violation mentions {fragment}")]
fn then_mentions(world: &RefCell<TestWorld>, fragment: String) {
    let state = world.borrow();
    let violations = state.violations.as_ref().expect("value verified");
    let fragment = strip_quotes(&fragment);
    assert!(
        violations
            .iter()
            .any(|violation| violation.to_string().contains(fragment)),
        "no violation mentions {fragment}: {violations}"
    );
}

#[scenario(path = "tests/features/configspec.feature")]
fn configspec_behaviour(world: RefCell<TestWorld>) {
    let _ = world;
}
