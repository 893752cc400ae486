//! Canonical binary encoding of values.
//!
//! Every value starts with a one-byte type tag. Strings and container counts
//! carry a `u32` little-endian length prefix; scalars are fixed-width
//! little-endian. An invocation is its name followed by its argument
//! dictionary body. Dictionary keys are written in sorted order, so equal
//! values always encode to identical bytes.
//!
//! | Tag | Kind       | Body                                   |
//! |-----|------------|----------------------------------------|
//! | 0   | dictionary | count, then (key string, value) pairs  |
//! | 1   | list       | count, then values                     |
//! | 2   | string     | length, then UTF-8 bytes               |
//! | 3   | int        | 4 bytes                                |
//! | 4   | long       | 8 bytes                                |
//! | 5   | double     | 8 bytes (IEEE 754 bits)                |
//! | 6   | boolean    | 1 byte, 0 or 1                         |
//! | 7   | invocation | name string, then dictionary body      |

#![expect(
    clippy::little_endian_bytes,
    reason = "the wire format is little-endian on every host"
)]

mod reader;

use crate::error::DecodeError;
use crate::value::{Dict, Value, ValueKind};

use self::reader::Reader;

/// Maximum container nesting accepted by [`deserialize`].
///
/// Any dictionary produced by [`parse`](crate::parse) decodes within this
/// limit once wrapped as a [`Value::Dict`].
pub const MAX_DECODE_DEPTH: usize = 128;

const fn tag_for(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::Dict => 0,
        ValueKind::List => 1,
        ValueKind::String => 2,
        ValueKind::Int => 3,
        ValueKind::Long => 4,
        ValueKind::Double => 5,
        ValueKind::Boolean => 6,
        ValueKind::Invocation => 7,
    }
}

const fn kind_for(tag: u8) -> Option<ValueKind> {
    match tag {
        0 => Some(ValueKind::Dict),
        1 => Some(ValueKind::List),
        2 => Some(ValueKind::String),
        3 => Some(ValueKind::Int),
        4 => Some(ValueKind::Long),
        5 => Some(ValueKind::Double),
        6 => Some(ValueKind::Boolean),
        7 => Some(ValueKind::Invocation),
        _ => None,
    }
}

/// Encodes a value into its canonical wire form.
///
/// # Panics
///
/// Panics if a string or container holds more than `u32::MAX` entries, which
/// cannot be represented on the wire.
#[must_use]
pub fn serialize(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

/// Decodes a value previously produced by [`serialize`].
///
/// The whole input must be consumed by exactly one value.
///
/// # Errors
///
/// Returns a [`DecodeError`] for truncated input, unknown tags, invalid
/// UTF-8, duplicate keys, excessive nesting, or trailing bytes.
pub fn deserialize(bytes: &[u8]) -> Result<Value, DecodeError> {
    deserialize_with_limit(bytes, MAX_DECODE_DEPTH)
}

/// Decodes like [`deserialize`] with a caller-chosen nesting limit.
///
/// Protocols that embed documents inside an envelope raise the limit by the
/// envelope's own depth.
///
/// # Errors
///
/// See [`deserialize`]; [`DecodeError::TooDeep`] reports `max_depth`.
pub fn deserialize_with_limit(bytes: &[u8], max_depth: usize) -> Result<Value, DecodeError> {
    let mut reader = Reader::new(bytes);
    let value = read_value(&mut reader, 0, max_depth)?;
    match reader.remaining() {
        0 => Ok(value),
        count => Err(DecodeError::TrailingBytes { count }),
    }
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    out.push(tag_for(value.kind()));
    match value {
        Value::Dict(dict) => write_dict_body(out, dict),
        Value::List(items) => {
            write_len(out, items.len());
            for item in items {
                write_value(out, item);
            }
        }
        Value::String(text) => write_str(out, text),
        Value::Int(number) => out.extend_from_slice(&number.to_le_bytes()),
        Value::Long(number) => out.extend_from_slice(&number.to_le_bytes()),
        Value::Double(number) => out.extend_from_slice(&number.to_bits().to_le_bytes()),
        Value::Boolean(flag) => out.push(u8::from(*flag)),
        Value::Invocation(invocation) => {
            write_str(out, invocation.name());
            write_dict_body(out, invocation.args());
        }
    }
}

fn write_dict_body(out: &mut Vec<u8>, dict: &Dict) {
    write_len(out, dict.len());
    for (key, value) in dict {
        write_str(out, key);
        write_value(out, value);
    }
}

fn write_str(out: &mut Vec<u8>, text: &str) {
    write_len(out, text.len());
    out.extend_from_slice(text.as_bytes());
}

#[expect(
    clippy::expect_used,
    reason = "lengths beyond u32::MAX are unrepresentable and documented as a panic"
)]
fn write_len(out: &mut Vec<u8>, len: usize) {
    let len = u32::try_from(len).expect("wire lengths are limited to u32::MAX");
    out.extend_from_slice(&len.to_le_bytes());
}

fn read_value(reader: &mut Reader<'_>, depth: usize, limit: usize) -> Result<Value, DecodeError> {
    if depth > limit {
        return Err(DecodeError::TooDeep { limit });
    }
    let offset = reader.offset();
    let tag = reader.read_u8()?;
    let kind = kind_for(tag).ok_or(DecodeError::UnknownTag { tag, offset })?;
    let value = match kind {
        ValueKind::Dict => Value::Dict(read_dict_body(reader, depth, limit)?),
        ValueKind::List => {
            let count = reader.read_len()?;
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(read_value(reader, depth + 1, limit)?);
            }
            Value::List(items)
        }
        ValueKind::String => Value::String(reader.read_string()?),
        ValueKind::Int => Value::Int(reader.read_i32()?),
        ValueKind::Long => Value::Long(reader.read_i64()?),
        ValueKind::Double => Value::Double(reader.read_f64()?),
        ValueKind::Boolean => Value::Boolean(reader.read_bool()?),
        ValueKind::Invocation => {
            let name = reader.read_string()?;
            let args = read_dict_body(reader, depth, limit)?;
            Value::Invocation(crate::value::Invocation::new(name, args))
        }
    };
    Ok(value)
}

fn read_dict_body(
    reader: &mut Reader<'_>,
    depth: usize,
    limit: usize,
) -> Result<Dict, DecodeError> {
    let count = reader.read_len()?;
    let mut dict = Dict::new();
    for _ in 0..count {
        let key = reader.read_string()?;
        let value = read_value(reader, depth + 1, limit)?;
        if dict.contains_key(&key) {
            return Err(DecodeError::DuplicateKey { key });
        }
        dict.insert(key, value);
    }
    Ok(dict)
}
