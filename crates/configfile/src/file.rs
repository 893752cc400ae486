//! Loading and saving human-authored configuration files.

use std::fs;
use std::sync::Arc;

use camino::Utf8Path;

use crate::error::FileError;
use crate::parser::parse;
use crate::printer::to_text;
use crate::value::Dict;

/// Reads and parses a configuration file.
///
/// # Errors
///
/// Returns [`FileError::Read`] if the file cannot be read and
/// [`FileError::Parse`] if its contents are not valid configuration text.
pub fn load_file(path: &Utf8Path) -> Result<Dict, FileError> {
    let text = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: path.to_owned(),
        source: Arc::new(source),
    })?;
    parse(&text).map_err(|source| FileError::Parse {
        path: path.to_owned(),
        source,
    })
}

/// Pretty-prints a dictionary and writes it to `path`, replacing any
/// existing file.
///
/// # Errors
///
/// Returns [`FileError::Write`] if the file cannot be written.
pub fn save_file(path: &Utf8Path, dict: &Dict) -> Result<(), FileError> {
    fs::write(path, to_text(dict)).map_err(|source| FileError::Write {
        path: path.to_owned(),
        source: Arc::new(source),
    })
}
