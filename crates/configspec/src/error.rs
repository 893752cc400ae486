//! Errors raised while compiling a spec.
//!
//! A spec is itself a configuration value, so every error carries the path
//! inside the spec document where the problem was found.

use configfile::{FileError, ParseError, ValueKind, ValuePath};
use thiserror::Error;

/// Errors arising from malformed spec documents.
#[derive(Debug, Clone, Error)]
pub enum SpecError {
    /// A spec node was not a dictionary.
    #[error("spec at {path} must be a dictionary, found {found}")]
    NotADictionary {
        /// Location inside the spec document.
        path: ValuePath,
        /// Kind of the offending node.
        found: ValueKind,
    },

    /// A spec node lacked the `type` field.
    #[error("spec at {path} has no 'type' field")]
    MissingType {
        /// Location inside the spec document.
        path: ValuePath,
    },

    /// The `type` field did not name a known value kind.
    #[error("spec at {path} names unknown type '{name}'")]
    UnknownType {
        /// Location inside the spec document.
        path: ValuePath,
        /// The unrecognised type name.
        name: String,
    },

    /// A spec field held a value of the wrong kind.
    #[error("spec field '{field}' at {path} must be {expected}, found {found}")]
    FieldType {
        /// Location inside the spec document.
        path: ValuePath,
        /// Name of the field.
        field: String,
        /// Kind the field must have.
        expected: ValueKind,
        /// Kind the field had.
        found: ValueKind,
    },

    /// A spec field is not meaningful for the declared type.
    #[error("spec field '{field}' at {path} does not apply to type {kind}")]
    MisplacedField {
        /// Location inside the spec document.
        path: ValuePath,
        /// Name of the field.
        field: String,
        /// Declared type of the spec node.
        kind: ValueKind,
    },

    /// A spec node carried a field the spec language does not define.
    #[error("spec at {path} has unknown field '{field}'")]
    UnknownField {
        /// Location inside the spec document.
        path: ValuePath,
        /// Name of the field.
        field: String,
    },

    /// Spec text could not be parsed.
    #[error("invalid spec text: {0}")]
    Parse(#[from] ParseError),

    /// A spec file could not be loaded.
    #[error(transparent)]
    File(#[from] FileError),
}
