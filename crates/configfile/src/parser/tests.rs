//! Unit tests for the configuration text parser.

use rstest::rstest;

use super::*;

fn single(text: &str) -> Value {
    parse_value(text).unwrap_or_else(|error| panic!("'{text}' should parse: {error}"))
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

#[rstest]
#[case("0", Value::Int(0))]
#[case("-17", Value::Int(-17))]
#[case("+5", Value::Int(5))]
#[case("2147483647", Value::Int(i32::MAX))]
#[case("2147483648", Value::Long(2_147_483_648))]
#[case("7L", Value::Long(7))]
#[case("-9l", Value::Long(-9))]
#[case("1.5", Value::Double(1.5))]
#[case("-0.25", Value::Double(-0.25))]
#[case("1e3", Value::Double(1000.0))]
#[case("2.5E-1", Value::Double(0.25))]
#[case("inf", Value::Double(f64::INFINITY))]
#[case("-inf", Value::Double(f64::NEG_INFINITY))]
#[case("true", Value::Boolean(true))]
#[case("false", Value::Boolean(false))]
#[case("\"hello\"", Value::String("hello".into()))]
#[case("dictionary", Value::String("dictionary".into()))]
fn parses_scalars(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(single(text), expected);
}

#[test]
fn parses_nan() {
    let value = single("nan");
    assert!(value.as_double().is_some_and(f64::is_nan));
}

#[rstest]
#[case(r#""a\"b""#, "a\"b")]
#[case(r#""line\nbreak""#, "line\nbreak")]
#[case(r#""tab\there""#, "tab\there")]
#[case(r#""back\\slash""#, "back\\slash")]
fn decodes_string_escapes(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(single(text), Value::String(expected.into()));
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

#[test]
fn parses_document_with_nested_containers() {
    let text = r#"
        # daemon settings
        name = "tracer"
        limits = { cpu = 2, memory = 4096L }
        commands = ["echo hi", "true"]
        mixed = [1 "two" 3.0]
    "#;
    let dict = parse(text).expect("valid document");

    assert_eq!(dict.len(), 4);
    assert_eq!(dict.get("name"), Some(&Value::from("tracer")));
    let limits = dict.get("limits").and_then(Value::as_dict).expect("limits");
    assert_eq!(limits.get("cpu"), Some(&Value::Int(2)));
    assert_eq!(limits.get("memory"), Some(&Value::Long(4096)));
    assert_eq!(
        dict.get("commands").and_then(Value::as_string_list),
        Some(vec!["echo hi", "true"])
    );
    assert_eq!(
        dict.get("mixed"),
        Some(&Value::List(vec![
            Value::Int(1),
            Value::from("two"),
            Value::Double(3.0)
        ]))
    );
}

#[test]
fn parses_quoted_keys() {
    let dict = parse(r#""odd key" = 1; plain = 2"#).expect("valid document");
    assert_eq!(dict.get("odd key"), Some(&Value::Int(1)));
    assert_eq!(dict.get("plain"), Some(&Value::Int(2)));
}

#[test]
fn parses_empty_document_and_containers() {
    assert!(parse("").expect("empty").is_empty());
    assert!(parse("  # only a comment\n").expect("comment").is_empty());
    assert_eq!(single("{}"), Value::Dict(Dict::new()));
    assert_eq!(single("[]"), Value::List(Vec::new()));
}

#[test]
fn parses_invocations() {
    let value = single(r#"launch(path = "/bin/true", retries = 3)"#);
    let invocation = value.as_invocation().expect("invocation");
    assert_eq!(invocation.name(), "launch");
    assert_eq!(invocation.args().get("retries"), Some(&Value::Int(3)));
    assert_eq!(
        invocation.args().get("path"),
        Some(&Value::from("/bin/true"))
    );
}

#[test]
fn parses_invocation_without_arguments() {
    let value = single("reset()");
    let invocation = value.as_invocation().expect("invocation");
    assert_eq!(invocation.name(), "reset");
    assert!(invocation.args().is_empty());
}

#[test]
fn parses_invocation_inside_list() {
    let value = single("[start(id = 1) stop(id = 1)]");
    let names: Vec<&str> = value
        .as_list()
        .expect("list")
        .iter()
        .filter_map(Value::as_invocation)
        .map(Invocation::name)
        .collect();
    assert_eq!(names, vec!["start", "stop"]);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[rstest]
#[case("a = ", 1, 5)]
#[case("a 1", 1, 3)]
#[case("a = \"open", 1, 5)]
#[case("a = [1, 2", 1, 5)]
#[case("a = {b = 1", 1, 5)]
#[case("a = 1\nb = 12x", 2, 7)]
#[case("a = 1\na = 2", 2, 1)]
#[case("a = 99999999999999999999", 1, 5)]
#[case("a = \"bad \\q\"", 1, 12)]
#[case("= 1", 1, 1)]
fn reports_error_positions(#[case] text: &str, #[case] line: usize, #[case] column: usize) {
    let error = parse(text).expect_err("text should be rejected");
    assert_eq!(
        (error.line, error.column),
        (line, column),
        "unexpected position for {text:?}: {error}"
    );
}

#[test]
fn duplicate_key_message_names_key() {
    let error = parse("retries = 1\nretries = 2").expect_err("duplicate");
    assert!(error.message.contains("retries"), "{error}");
}

#[test]
fn rejects_duplicate_invocation_arguments() {
    assert!(parse_value("f(a = 1, a = 2)").is_err());
}

#[test]
fn rejects_trailing_text_after_single_value() {
    assert!(parse_value("1 2").is_err());
}

#[test]
fn rejects_excessive_nesting() {
    let text = format!("a = {}{}", "[".repeat(MAX_NESTING + 1), "]".repeat(MAX_NESTING + 1));
    let error = parse(&text).expect_err("too deep");
    assert!(error.message.contains("nesting"), "{error}");
}
