//! Errors raised while reading configuration text, wire bytes, or files.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

/// A syntax error in configuration text.
///
/// Line and column are 1-based and point at the offending character.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    /// 1-based line of the error.
    pub line: usize,
    /// 1-based column of the error.
    pub column: usize,
    /// Description of the problem.
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Errors raised while decoding the binary wire form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended before a complete value was read.
    #[error("truncated input at offset {offset}: needed {needed} more byte(s)")]
    Truncated {
        /// Offset where the read started.
        offset: usize,
        /// Bytes missing from the input.
        needed: usize,
    },

    /// A type tag byte did not name a known value kind.
    #[error("unknown type tag {tag:#04x} at offset {offset}")]
    UnknownTag {
        /// The tag byte.
        tag: u8,
        /// Offset of the tag byte.
        offset: usize,
    },

    /// A boolean byte was neither 0 nor 1.
    #[error("invalid boolean byte {byte:#04x} at offset {offset}")]
    InvalidBoolean {
        /// The offending byte.
        byte: u8,
        /// Offset of the byte.
        offset: usize,
    },

    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the string payload.
        offset: usize,
    },

    /// A dictionary contained the same key twice.
    #[error("duplicate dictionary key '{key}'")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },

    /// Containers were nested beyond the decoder's limit.
    #[error("nesting exceeds {limit} levels")]
    TooDeep {
        /// The configured nesting limit.
        limit: usize,
    },

    /// Bytes remained after the root value.
    #[error("{count} trailing byte(s) after value")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },
}

/// Errors raised while loading or saving configuration files.
#[derive(Debug, Clone, Error)]
pub enum FileError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The file contents were not valid configuration text.
    #[error("failed to parse '{path}': {source}")]
    Parse {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying syntax error.
        #[source]
        source: ParseError,
    },

    /// The file could not be written.
    #[error("failed to write '{path}': {source}")]
    Write {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}
