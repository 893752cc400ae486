//! Pretty-printer producing configuration text accepted by [`crate::parse`].
//!
//! Output is canonical: keys appear in dictionary order, strings are always
//! quoted, longs carry an `L` suffix and doubles always contain a decimal
//! point or exponent, so `parse(&to_text(&dict))` reproduces `dict`.

use crate::parser::is_identifier_continue;
use crate::value::{Dict, Invocation, Value};

const INDENT: &str = "    ";

/// Renders a dictionary as a configuration document.
///
/// ```
/// use configfile::{parse, to_text};
///
/// let dict = parse("b = [1, 2]\na = { x = true }").expect("parse");
/// let text = to_text(&dict);
/// assert_eq!(parse(&text).expect("reparse"), dict);
/// ```
#[must_use]
pub fn to_text(dict: &Dict) -> String {
    let mut out = String::new();
    for (key, value) in dict {
        write_entry(&mut out, key, value, 0);
        out.push('\n');
    }
    out
}

/// Renders a single value on one line.
pub(crate) fn value_to_inline_text(value: &Value) -> String {
    let mut out = String::new();
    write_inline(&mut out, value);
    out
}

/// Returns `true` if `key` can be written without quotes.
pub(crate) fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
        && chars.all(is_identifier_continue)
}

/// Quotes and escapes a string literal.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for next in text.chars() {
        match next {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn write_key(out: &mut String, key: &str) {
    if is_bare_key(key) {
        out.push_str(key);
    } else {
        out.push_str(&quote(key));
    }
}

fn write_entry(out: &mut String, key: &str, value: &Value, depth: usize) {
    push_indent(out, depth);
    write_key(out, key);
    out.push_str(" = ");
    write_block(out, value, depth);
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Writes a value that may span several lines, with closing delimiters
/// aligned to `depth`.
fn write_block(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Dict(dict) if !dict.is_empty() => {
            out.push_str("{\n");
            for (key, child) in dict {
                write_entry(out, key, child, depth + 1);
                out.push('\n');
            }
            push_indent(out, depth);
            out.push('}');
        }
        Value::List(items) if items.iter().any(is_container) => {
            out.push_str("[\n");
            for item in items {
                push_indent(out, depth + 1);
                write_block(out, item, depth + 1);
                out.push('\n');
            }
            push_indent(out, depth);
            out.push(']');
        }
        other => write_inline(out, other),
    }
}

fn is_container(value: &Value) -> bool {
    match value {
        Value::Dict(dict) => !dict.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Invocation(invocation) => !invocation.args().is_empty(),
        _ => false,
    }
}

fn write_inline(out: &mut String, value: &Value) {
    match value {
        Value::Dict(dict) => {
            out.push('{');
            write_inline_entries(out, dict);
            out.push('}');
        }
        Value::List(items) => {
            out.push('[');
            for (position, item) in items.iter().enumerate() {
                if position > 0 {
                    out.push_str(", ");
                }
                write_inline(out, item);
            }
            out.push(']');
        }
        Value::String(text) => out.push_str(&quote(text)),
        Value::Int(number) => out.push_str(&number.to_string()),
        Value::Long(number) => {
            out.push_str(&number.to_string());
            out.push('L');
        }
        Value::Double(number) => out.push_str(&format_double(*number)),
        Value::Boolean(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Value::Invocation(invocation) => write_invocation(out, invocation),
    }
}

fn write_inline_entries(out: &mut String, dict: &Dict) {
    for (position, (key, child)) in dict.iter().enumerate() {
        if position > 0 {
            out.push_str(", ");
        }
        write_key(out, key);
        out.push_str(" = ");
        write_inline(out, child);
    }
}

fn write_invocation(out: &mut String, invocation: &Invocation) {
    out.push_str(invocation.name());
    out.push('(');
    write_inline_entries(out, invocation.args());
    out.push(')');
}

fn format_double(number: f64) -> String {
    if number.is_nan() {
        String::from("nan")
    } else if number.is_infinite() {
        String::from(if number.is_sign_negative() { "-inf" } else { "inf" })
    } else {
        // Debug output always carries a '.' or exponent and round-trips exactly.
        format!("{number:?}")
    }
}
