//! Schema validation for configuration values.
//!
//! A spec is an ordinary configuration dictionary describing the shape a value
//! must have: its type, the keys a dictionary or invocation must carry, and
//! the spec every list element or extra dictionary member must satisfy.
//! [`Spec::compile`] checks the spec document once; [`Spec::verify`] then
//! reports every [`Violation`] in a value in a single pass.
//!
//! ```
//! use configfile::parse_value;
//! use configspec::Spec;
//!
//! let spec = Spec::from_text(
//!     "type = dictionary\n\
//!      dictionary_keys = { commands = { type = list, list_members = { type = string } } }",
//! )
//! .expect("spec compiles");
//!
//! let ok = parse_value(r#"{ commands = ["echo hi"] }"#).expect("parses");
//! assert!(spec.verify(&ok).is_empty());
//!
//! let bad = parse_value(r#"{ commands = "echo hi" }"#).expect("parses");
//! assert_eq!(spec.verify(&bad).to_string(), "commands: expected list, found string");
//! ```

pub mod error;
mod spec;
mod verify;

#[cfg(test)]
mod tests;

pub use self::error::SpecError;
pub use self::spec::Spec;
pub use self::verify::{Violation, ViolationKind, Violations, verify};
