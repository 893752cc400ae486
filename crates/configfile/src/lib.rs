//! Dynamically typed configuration values and their text and wire forms.
//!
//! The `configfile` crate defines [`Value`], a recursive tagged union used to
//! carry configuration data and control-protocol payloads, together with
//! three representations of it:
//!
//! - a small declarative text grammar read by [`parse`] and written by
//!   [`to_text`], used for human-authored files;
//! - a canonical binary encoding produced by [`serialize`] and read back by
//!   [`deserialize`], used on the control channel;
//! - [`ValuePath`] accessors for addressing members inside a tree.
//!
//! # Example
//!
//! ```
//! use configfile::{Value, deserialize, parse, serialize};
//!
//! let dict = parse(r#"
//!     commands = ["echo hi"]
//!     limits = { cpu = 2, budget = 5000000000 }
//!     start = launch(path = "/bin/true")
//! "#).expect("valid configuration");
//!
//! let value = Value::Dict(dict);
//! let bytes = serialize(&value);
//! assert_eq!(deserialize(&bytes).expect("decodes"), value);
//! ```

pub mod error;
mod file;
mod parser;
mod path;
mod printer;
mod value;
pub mod wire;

#[cfg(test)]
mod tests;

pub use self::error::{DecodeError, FileError, ParseError};
pub use self::file::{load_file, save_file};
pub use self::parser::{MAX_NESTING, parse, parse_value};
pub use self::path::{PathParseError, PathSegment, ValuePath};
pub use self::printer::to_text;
pub use self::value::{Dict, Invocation, Value, ValueKind, ValueKindParseError};
pub use self::wire::{MAX_DECODE_DEPTH, deserialize, deserialize_with_limit, serialize};
