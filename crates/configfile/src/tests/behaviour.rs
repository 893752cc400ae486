//! Behaviour-driven tests for configuration documents.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::{Dict, ParseError, Value, ValuePath, deserialize, parse, serialize, to_text};

const DAEMON_DOCUMENT: &str = r#"
# Phases exposed by a tracing daemon.
daemon = "tracer"
buffer_bytes = 4194304
budget = 12000000000L
phases = [
    { name = "configure", spec = { type = dictionary } },
    { name = "exec", spec = { type = dictionary, dictionary_keys = { commands = { type = list } } } },
]
start = launch(path = "/usr/sbin/tracer", verbose = true, ratio = 0.5)
"#;

const BROKEN_DOCUMENT: &str = r#"
daemon = "tracer"
phases = [ { name = "exec" } } ]
"#;

#[derive(Default)]
struct TestWorld {
    text: String,
    document: Option<Dict>,
    parsed: Option<Result<Dict, ParseError>>,
    encoded: Vec<u8>,
    printed: String,
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}

fn strip_quotes(value: &str) -> &str {
    value.trim_matches('"')
}

#[given("the {name} sample document")]
fn given_sample(world: &RefCell<TestWorld>, name: String) {
    let text = match strip_quotes(&name) {
        "daemon" => DAEMON_DOCUMENT,
        "broken" => BROKEN_DOCUMENT,
        other => panic!("unknown sample document: {other}"),
    };
    let mut state = world.borrow_mut();
    state.text = text.to_owned();
    state.document = parse(text).ok();
}

#[when("the document is parsed")]
fn when_parsed(world: &RefCell<TestWorld>) {
    let mut state = world.borrow_mut();
    let result = parse(&state.text);
    state.parsed = Some(result);
}

#[when("the document is encoded for the wire")]
fn when_encoded(world: &RefCell<TestWorld>) {
    let mut state = world.borrow_mut();
    let document = state.document.clone().expect("sample document should parse");
    state.encoded = serialize(&Value::Dict(document));
}

#[when("the document is printed as text")]
fn when_printed(world: &RefCell<TestWorld>) {
    let mut state = world.borrow_mut();
    let document = state.document.as_ref().expect("sample document should parse");
    state.printed = to_text(document);
}

#[then("decoding the bytes reproduces the document")]
fn then_decoded_matches(world: &RefCell<TestWorld>) {
    let state = world.borrow();
    let decoded = deserialize(&state.encoded).expect("bytes should decode");
    let expected = state.document.clone().expect("document");
    assert_eq!(decoded, Value::Dict(expected));
}

#[then("parsing the printed text reproduces the document")]
fn then_printed_matches(world: &RefCell<TestWorld>) {
    let state = world.borrow();
    let reparsed = parse(&state.printed)
        .unwrap_or_else(|error| panic!("printed text should parse: {error}\n{}", state.printed));
    assert_eq!(Some(reparsed), state.document);
}

#[then("parsing fails on line {line}")]
fn then_fails_on_line(world: &RefCell<TestWorld>, line: usize) {
    let state = world.borrow();
    let result = state.parsed.as_ref().expect("document should have been parsed");
    let error = result.as_ref().expect_err("document should be rejected");
    assert_eq!(error.line, line, "unexpected error: {error}");
}

#[then("the member {path} is the string {expected}")]
fn then_member_is_string(world: &RefCell<TestWorld>, path: String, expected: String) {
    let state = world.borrow();
    let result = state.parsed.as_ref().expect("document should have been parsed");
    let document = result.as_ref().expect("document should parse");
    let path: ValuePath = strip_quotes(&path).parse().expect("valid path");
    let root = Value::Dict(document.clone());
    assert_eq!(
        root.get_path(&path).and_then(Value::as_str),
        Some(strip_quotes(&expected))
    );
}

#[scenario(path = "tests/features/configfile.feature")]
fn configfile_behaviour(world: RefCell<TestWorld>) {
    let _ = world;
}
