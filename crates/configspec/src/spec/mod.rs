//! Compiled spec documents.
//!
//! A spec is written as a configuration dictionary, for example:
//!
//! ```text
//! type = dictionary
//! dictionary_keys = {
//!     commands = { type = list, list_members = { type = string } }
//!     timeout = { type = int, optional = true }
//! }
//! ```
//!
//! [`Spec::compile`] checks the document's own shape once, so validation
//! never has to re-interpret raw spec values. The source document is kept
//! for introspection through [`Spec::to_value`].

use std::collections::BTreeMap;
use std::str::FromStr;

use camino::Utf8Path;
use configfile::{Dict, Value, ValueKind, ValuePath, load_file, parse};

use crate::error::SpecError;

const TYPE: &str = "type";
const DOC: &str = "doc";
const OPTIONAL: &str = "optional";
const DICTIONARY_KEYS: &str = "dictionary_keys";
const DICTIONARY_MEMBERS: &str = "dictionary_members";
const LIST_MEMBERS: &str = "list_members";
const INVOCATION_KEYS: &str = "invocation_keys";
const INVOCATION_NAME: &str = "invocation_name";

/// A validated spec ready to check values against.
#[derive(Debug, Clone, PartialEq)]
pub struct Spec {
    kind: ValueKind,
    doc: Option<String>,
    optional: bool,
    shape: Shape,
    source: Dict,
}

/// Structural constraints beyond the type tag.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Shape {
    Scalar,
    Dictionary {
        keys: BTreeMap<String, Spec>,
        members: Option<Box<Spec>>,
    },
    List {
        members: Option<Box<Spec>>,
    },
    Invocation {
        name: Option<String>,
        keys: BTreeMap<String, Spec>,
    },
}

impl Spec {
    /// Returns the spec `{ type = <kind> }`.
    ///
    /// Lists accept any elements. Dictionaries and invocations accept no
    /// entries, since none are declared.
    #[must_use]
    pub fn of_kind(kind: ValueKind) -> Self {
        let shape = match kind {
            ValueKind::Dict => Shape::Dictionary {
                keys: BTreeMap::new(),
                members: None,
            },
            ValueKind::List => Shape::List { members: None },
            ValueKind::Invocation => Shape::Invocation {
                name: None,
                keys: BTreeMap::new(),
            },
            ValueKind::String
            | ValueKind::Int
            | ValueKind::Long
            | ValueKind::Double
            | ValueKind::Boolean => Shape::Scalar,
        };
        let mut source = Dict::new();
        source.insert(TYPE.to_owned(), Value::String(kind.to_string()));
        Self {
            kind,
            doc: None,
            optional: false,
            shape,
            source,
        }
    }

    /// Compiles a spec document.
    ///
    /// # Errors
    ///
    /// Returns a [`SpecError`] naming the first malformed node: a node that
    /// is not a dictionary, a missing or unknown `type`, a field of the wrong
    /// kind, a field that does not apply to the declared type, or an unknown
    /// field.
    pub fn compile(value: &Value) -> Result<Self, SpecError> {
        compile_node(value, &ValuePath::root())
    }

    /// Compiles a spec from a dictionary.
    ///
    /// # Errors
    ///
    /// See [`Spec::compile`].
    pub fn from_dict(dict: &Dict) -> Result<Self, SpecError> {
        compile_dict(dict, &ValuePath::root())
    }

    /// Parses and compiles spec text.
    ///
    /// ```
    /// use configspec::Spec;
    /// use configfile::ValueKind;
    ///
    /// let spec = Spec::from_text("type = dictionary\ndictionary_keys = { x = { type = int } }")
    ///     .expect("valid spec");
    /// assert_eq!(spec.kind(), ValueKind::Dict);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::Parse`] for invalid text, otherwise see
    /// [`Spec::compile`].
    pub fn from_text(text: &str) -> Result<Self, SpecError> {
        let dict = parse(text)?;
        Self::from_dict(&dict)
    }

    /// Loads and compiles a spec file.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::File`] if the file cannot be read or parsed,
    /// otherwise see [`Spec::compile`].
    pub fn load(path: &Utf8Path) -> Result<Self, SpecError> {
        let dict = load_file(path)?;
        Self::from_dict(&dict)
    }

    /// Returns the type the spec requires.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Returns the documentation string, if the spec declares one.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Returns `true` if the spec is marked optional within its parent.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns the spec document this spec was compiled from.
    #[must_use]
    pub const fn as_dict(&self) -> &Dict {
        &self.source
    }

    /// Returns the spec document as a value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Dict(self.source.clone())
    }

    pub(crate) const fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl FromStr for Spec {
    type Err = SpecError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_text(text)
    }
}

impl TryFrom<&Value> for Spec {
    type Error = SpecError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::compile(value)
    }
}

fn compile_node(value: &Value, path: &ValuePath) -> Result<Spec, SpecError> {
    match value {
        Value::Dict(dict) => compile_dict(dict, path),
        other => Err(SpecError::NotADictionary {
            path: path.clone(),
            found: other.kind(),
        }),
    }
}

fn compile_dict(dict: &Dict, path: &ValuePath) -> Result<Spec, SpecError> {
    let kind = type_field(dict, path)?;
    for field in dict.keys() {
        check_field_applies(field, kind, path)?;
    }

    let doc = string_field(dict, DOC, path)?.map(str::to_owned);
    let optional = bool_field(dict, OPTIONAL, path)?.unwrap_or(false);

    let shape = match kind {
        ValueKind::Dict => Shape::Dictionary {
            keys: keyed_specs(dict, DICTIONARY_KEYS, path)?,
            members: member_spec(dict, DICTIONARY_MEMBERS, path)?,
        },
        ValueKind::List => Shape::List {
            members: member_spec(dict, LIST_MEMBERS, path)?,
        },
        ValueKind::Invocation => Shape::Invocation {
            name: string_field(dict, INVOCATION_NAME, path)?.map(str::to_owned),
            keys: keyed_specs(dict, INVOCATION_KEYS, path)?,
        },
        ValueKind::String
        | ValueKind::Int
        | ValueKind::Long
        | ValueKind::Double
        | ValueKind::Boolean => Shape::Scalar,
    };

    Ok(Spec {
        kind,
        doc,
        optional,
        shape,
        source: dict.clone(),
    })
}

fn type_field(dict: &Dict, path: &ValuePath) -> Result<ValueKind, SpecError> {
    let name = string_field(dict, TYPE, path)?.ok_or_else(|| SpecError::MissingType {
        path: path.clone(),
    })?;
    ValueKind::from_str(name).map_err(|_| SpecError::UnknownType {
        path: path.clone(),
        name: name.to_owned(),
    })
}

fn check_field_applies(field: &str, kind: ValueKind, path: &ValuePath) -> Result<(), SpecError> {
    let applies = match field {
        TYPE | DOC | OPTIONAL => true,
        DICTIONARY_KEYS | DICTIONARY_MEMBERS => kind == ValueKind::Dict,
        LIST_MEMBERS => kind == ValueKind::List,
        INVOCATION_KEYS | INVOCATION_NAME => kind == ValueKind::Invocation,
        _ => {
            return Err(SpecError::UnknownField {
                path: path.clone(),
                field: field.to_owned(),
            });
        }
    };
    if applies {
        Ok(())
    } else {
        Err(SpecError::MisplacedField {
            path: path.clone(),
            field: field.to_owned(),
            kind,
        })
    }
}

fn typed_field<'a>(
    dict: &'a Dict,
    field: &str,
    expected: ValueKind,
    path: &ValuePath,
) -> Result<Option<&'a Value>, SpecError> {
    match dict.get(field) {
        Some(value) if value.kind() != expected => Err(SpecError::FieldType {
            path: path.clone(),
            field: field.to_owned(),
            expected,
            found: value.kind(),
        }),
        other => Ok(other),
    }
}

fn string_field<'a>(
    dict: &'a Dict,
    field: &str,
    path: &ValuePath,
) -> Result<Option<&'a str>, SpecError> {
    Ok(typed_field(dict, field, ValueKind::String, path)?.and_then(Value::as_str))
}

fn bool_field(dict: &Dict, field: &str, path: &ValuePath) -> Result<Option<bool>, SpecError> {
    Ok(typed_field(dict, field, ValueKind::Boolean, path)?.and_then(Value::as_bool))
}

fn keyed_specs(
    dict: &Dict,
    field: &str,
    path: &ValuePath,
) -> Result<BTreeMap<String, Spec>, SpecError> {
    let Some(entries) = typed_field(dict, field, ValueKind::Dict, path)?.and_then(Value::as_dict)
    else {
        return Ok(BTreeMap::new());
    };
    let field_path = path.key(field);
    entries
        .iter()
        .map(|(key, sub_spec)| {
            compile_node(sub_spec, &field_path.key(key.as_str())).map(|spec| (key.clone(), spec))
        })
        .collect()
}

fn member_spec(
    dict: &Dict,
    field: &str,
    path: &ValuePath,
) -> Result<Option<Box<Spec>>, SpecError> {
    dict.get(field)
        .map(|sub_spec| compile_node(sub_spec, &path.key(field)).map(Box::new))
        .transpose()
}
