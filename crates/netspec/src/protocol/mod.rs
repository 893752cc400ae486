//! Request and acknowledgement payloads.
//!
//! Both message kinds travel as wire-encoded dictionaries:
//!
//! ```text
//! request          { phase_name = "exec", params = { commands = ["echo hi"] } }
//! acknowledgement  { error = 2, message = "...", files = [...], config = {...} }
//! ```
//!
//! Optional acknowledgement fields are omitted when unset.

use configfile::{DecodeError, Dict, MAX_DECODE_DEPTH, Value, ValueKind, deserialize_with_limit};
use strum::{AsRefStr, Display};
use thiserror::Error;

/// Request key naming the phase to run.
pub const PHASE_NAME_KEY: &str = "phase_name";
/// Request key holding the phase parameters.
pub const PARAMS_KEY: &str = "params";
/// Acknowledgement key holding the numeric [`AckCode`].
pub const ERROR_KEY: &str = "error";
/// Acknowledgement key holding a human-readable message.
pub const MESSAGE_KEY: &str = "message";
/// Acknowledgement key listing files produced by a phase.
pub const FILES_KEY: &str = "files";
/// Acknowledgement key holding structured result data.
pub const CONFIG_KEY: &str = "config";

/// Nesting added by the request and acknowledgement dictionaries around a
/// `params` or `config` document.
pub const ENVELOPE_DEPTH: usize = 2;

/// Decodes a frame payload, allowing any parsed document to sit inside the
/// message envelope.
///
/// # Errors
///
/// Returns [`DecodeError`] if the payload is not a valid wire value.
pub fn decode_payload(bytes: &[u8]) -> Result<Value, DecodeError> {
    deserialize_with_limit(bytes, MAX_DECODE_DEPTH + ENVELOPE_DEPTH)
}

/// Errors raised when a decoded payload does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The payload was not a dictionary.
    #[error("{message} payload must be a dictionary, found {found}")]
    NotADictionary {
        /// Which message kind was being read.
        message: &'static str,
        /// Kind of the payload.
        found: ValueKind,
    },

    /// A required field was absent.
    #[error("{message} payload has no '{field}' field")]
    MissingField {
        /// Which message kind was being read.
        message: &'static str,
        /// Name of the absent field.
        field: &'static str,
    },

    /// A field held a value of the wrong kind.
    #[error("{message} field '{field}' must be {expected}, found {found}")]
    FieldType {
        /// Which message kind was being read.
        message: &'static str,
        /// Name of the field.
        field: &'static str,
        /// Required kind.
        expected: ValueKind,
        /// Actual kind.
        found: ValueKind,
    },

    /// A list field held an element of the wrong kind.
    #[error("{message} field '{field}' element {index} must be {expected}, found {found}")]
    ElementType {
        /// Which message kind was being read.
        message: &'static str,
        /// Name of the list field.
        field: &'static str,
        /// Position of the offending element.
        index: usize,
        /// Required element kind.
        expected: ValueKind,
        /// Actual element kind.
        found: ValueKind,
    },

    /// An acknowledgement carried a code outside the defined set.
    #[error("unknown acknowledgement code {code}")]
    UnknownCode {
        /// The unrecognised code.
        code: i32,
    },
}

/// A controller's request to run one phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    phase_name: String,
    params: Dict,
}

impl Request {
    /// Creates a request.
    #[must_use]
    pub fn new(phase_name: impl Into<String>, params: Dict) -> Self {
        Self {
            phase_name: phase_name.into(),
            params,
        }
    }

    /// Returns the requested phase name.
    #[must_use]
    pub fn phase_name(&self) -> &str {
        &self.phase_name
    }

    /// Returns the phase parameters.
    #[must_use]
    pub const fn params(&self) -> &Dict {
        &self.params
    }

    /// Splits the request into its phase name and parameters.
    #[must_use]
    pub fn into_parts(self) -> (String, Dict) {
        (self.phase_name, self.params)
    }

    /// Returns the request in payload form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut dict = Dict::new();
        dict.insert(PHASE_NAME_KEY.to_owned(), Value::from(self.phase_name.as_str()));
        dict.insert(PARAMS_KEY.to_owned(), Value::Dict(self.params.clone()));
        Value::Dict(dict)
    }

    /// Reads a request from a decoded payload.
    ///
    /// `params` defaults to an empty dictionary. Fields other than
    /// `phase_name` and `params` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the payload is not a dictionary, lacks a
    /// string `phase_name`, or carries a non-dictionary `params`.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        const MESSAGE: &str = "request";
        let mut dict = match value {
            Value::Dict(dict) => dict,
            other => {
                return Err(ProtocolError::NotADictionary {
                    message: MESSAGE,
                    found: other.kind(),
                });
            }
        };

        let phase_name = match dict.remove(PHASE_NAME_KEY) {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(field_type(MESSAGE, PHASE_NAME_KEY, ValueKind::String, &other));
            }
            None => {
                return Err(ProtocolError::MissingField {
                    message: MESSAGE,
                    field: PHASE_NAME_KEY,
                });
            }
        };

        let params = match dict.remove(PARAMS_KEY) {
            Some(Value::Dict(params)) => params,
            Some(other) => {
                return Err(field_type(MESSAGE, PARAMS_KEY, ValueKind::Dict, &other));
            }
            None => Dict::new(),
        };

        Ok(Self { phase_name, params })
    }
}

/// Outcome code carried by every acknowledgement.
///
/// The code also tells the engine whether to keep serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AckCode {
    /// The phase succeeded; the daemon keeps running.
    Ok,
    /// The request was not fully honoured; the daemon keeps running.
    Warning,
    /// The phase succeeded and the daemon exits successfully.
    OkExit,
    /// The phase failed and the daemon exits with failure.
    Error,
}

impl AckCode {
    /// Returns the numeric wire form.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::OkExit => 2,
            Self::Error => 3,
        }
    }

    /// Parses the numeric wire form.
    #[must_use]
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Warning),
            2 => Some(Self::OkExit),
            3 => Some(Self::Error),
            _ => None,
        }
    }

    /// Returns `true` when the daemon stops after sending this code.
    #[must_use]
    pub const fn terminates(self) -> bool {
        matches!(self, Self::OkExit | Self::Error)
    }
}

/// Response to a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
    code: AckCode,
    message: Option<String>,
    files: Option<Vec<String>>,
    config: Option<Dict>,
}

impl Acknowledgement {
    /// Creates a bare acknowledgement with the given code.
    #[must_use]
    pub const fn new(code: AckCode) -> Self {
        Self {
            code,
            message: None,
            files: None,
            config: None,
        }
    }

    /// Adds a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds the list of files the phase produced.
    #[must_use]
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Adds structured result data.
    #[must_use]
    pub fn with_config(mut self, config: Dict) -> Self {
        self.config = Some(config);
        self
    }

    /// Returns the outcome code.
    #[must_use]
    pub const fn code(&self) -> AckCode {
        self.code
    }

    /// Returns the message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the produced files, if any were listed.
    #[must_use]
    pub fn files(&self) -> Option<&[String]> {
        self.files.as_deref()
    }

    /// Returns the structured result data, if any.
    #[must_use]
    pub const fn config(&self) -> Option<&Dict> {
        self.config.as_ref()
    }

    /// Returns the acknowledgement in payload form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut dict = Dict::new();
        dict.insert(ERROR_KEY.to_owned(), Value::Int(self.code.as_i32()));
        if let Some(message) = &self.message {
            dict.insert(MESSAGE_KEY.to_owned(), Value::from(message.as_str()));
        }
        if let Some(files) = &self.files {
            let list = files.iter().map(|file| Value::from(file.as_str())).collect();
            dict.insert(FILES_KEY.to_owned(), Value::List(list));
        }
        if let Some(config) = &self.config {
            dict.insert(CONFIG_KEY.to_owned(), Value::Dict(config.clone()));
        }
        Value::Dict(dict)
    }

    /// Reads an acknowledgement from a decoded payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the payload is not a dictionary, lacks an
    /// integer `error` code, carries an unknown code, or has optional fields
    /// of the wrong kind.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        const MESSAGE: &str = "acknowledgement";
        let mut dict = match value {
            Value::Dict(dict) => dict,
            other => {
                return Err(ProtocolError::NotADictionary {
                    message: MESSAGE,
                    found: other.kind(),
                });
            }
        };

        let code = match dict.remove(ERROR_KEY) {
            Some(Value::Int(code)) => {
                AckCode::from_i32(code).ok_or(ProtocolError::UnknownCode { code })?
            }
            Some(other) => {
                return Err(field_type(MESSAGE, ERROR_KEY, ValueKind::Int, &other));
            }
            None => {
                return Err(ProtocolError::MissingField {
                    message: MESSAGE,
                    field: ERROR_KEY,
                });
            }
        };

        let message = match dict.remove(MESSAGE_KEY) {
            Some(Value::String(text)) => Some(text),
            Some(other) => return Err(field_type(MESSAGE, MESSAGE_KEY, ValueKind::String, &other)),
            None => None,
        };

        let files = match dict.remove(FILES_KEY) {
            Some(Value::List(items)) => Some(file_names(MESSAGE, items)?),
            Some(other) => return Err(field_type(MESSAGE, FILES_KEY, ValueKind::List, &other)),
            None => None,
        };

        let config = match dict.remove(CONFIG_KEY) {
            Some(Value::Dict(config)) => Some(config),
            Some(other) => return Err(field_type(MESSAGE, CONFIG_KEY, ValueKind::Dict, &other)),
            None => None,
        };

        Ok(Self {
            code,
            message,
            files,
            config,
        })
    }
}

fn file_names(message: &'static str, items: Vec<Value>) -> Result<Vec<String>, ProtocolError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(name) => Ok(name),
            other => Err(ProtocolError::ElementType {
                message,
                field: FILES_KEY,
                index,
                expected: ValueKind::String,
                found: other.kind(),
            }),
        })
        .collect()
}

fn field_type(
    message: &'static str,
    field: &'static str,
    expected: ValueKind,
    found: &Value,
) -> ProtocolError {
    ProtocolError::FieldType {
        message,
        field,
        expected,
        found: found.kind(),
    }
}
