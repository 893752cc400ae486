//! The dynamically typed configuration value tree.
//!
//! A [`Value`] is a closed sum type over the eight configuration data types.
//! Containers own their children outright, so a tree is released by dropping
//! its root and cycles cannot be expressed.

use std::collections::BTreeMap;
use std::fmt;

use strum::{Display, EnumIter, EnumString};

use crate::path::{PathSegment, ValuePath};

/// Mapping from unique string keys to values.
///
/// Backed by a [`BTreeMap`] so iteration, printing and wire encoding all
/// observe the same canonical key order.
pub type Dict = BTreeMap<String, Value>;

/// A node in a configuration tree.
///
/// Equality is structural. Doubles compare by bit pattern, so `nan` equals
/// itself and `0.0` differs from `-0.0`, matching what the wire form
/// preserves.
#[derive(Debug, Clone)]
pub enum Value {
    /// Keyed collection of child values.
    Dict(Dict),
    /// Ordered, possibly heterogeneous sequence of values.
    List(Vec<Value>),
    /// UTF-8 text.
    String(String),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// Double-precision float.
    Double(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Function-call-like record with keyword arguments.
    Invocation(Invocation),
}

/// Tag identifying which [`Value`] variant a node holds.
///
/// The display form is the canonical name used by specs (`type = int`).
/// Parsing is case-insensitive and accepts a few common aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum ValueKind {
    /// [`Value::Dict`].
    #[strum(to_string = "dictionary", serialize = "dict")]
    Dict,
    /// [`Value::List`].
    #[strum(to_string = "list")]
    List,
    /// [`Value::String`].
    #[strum(to_string = "string")]
    String,
    /// [`Value::Int`].
    #[strum(to_string = "int", serialize = "integer")]
    Int,
    /// [`Value::Long`].
    #[strum(to_string = "long")]
    Long,
    /// [`Value::Double`].
    #[strum(to_string = "double", serialize = "float")]
    Double,
    /// [`Value::Boolean`].
    #[strum(to_string = "boolean", serialize = "bool")]
    Boolean,
    /// [`Value::Invocation`].
    #[strum(to_string = "invocation")]
    Invocation,
}

/// Errors encountered while parsing a [`ValueKind`] from text.
pub type ValueKindParseError = strum::ParseError;

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Dict(left), Self::Dict(right)) => left == right,
            (Self::List(left), Self::List(right)) => left == right,
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Long(left), Self::Long(right)) => left == right,
            (Self::Double(left), Self::Double(right)) => left.to_bits() == right.to_bits(),
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (Self::Invocation(left), Self::Invocation(right)) => left == right,
            _ => false,
        }
    }
}

/// A named record carrying keyword arguments, written `name(key = value)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invocation {
    name: String,
    args: Dict,
}

impl Invocation {
    /// Creates an invocation with the given name and arguments.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Dict) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Returns the invocation name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the keyword arguments.
    #[must_use]
    pub const fn args(&self) -> &Dict {
        &self.args
    }

    /// Consumes the invocation, returning its name and arguments.
    #[must_use]
    pub fn into_parts(self) -> (String, Dict) {
        (self.name, self.args)
    }
}

impl Value {
    /// Returns the tag of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Dict(_) => ValueKind::Dict,
            Self::List(_) => ValueKind::List,
            Self::String(_) => ValueKind::String,
            Self::Int(_) => ValueKind::Int,
            Self::Long(_) => ValueKind::Long,
            Self::Double(_) => ValueKind::Double,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Invocation(_) => ValueKind::Invocation,
        }
    }

    /// Returns the dictionary when this is a [`Value::Dict`].
    #[must_use]
    pub const fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Returns the elements when this is a [`Value::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the text when this is a [`Value::String`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the integer when this is a [`Value::Int`].
    #[must_use]
    pub const fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns the integer when this is a [`Value::Long`] or [`Value::Int`].
    #[must_use]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(number) => Some(*number),
            Self::Int(number) => Some(i64::from(*number)),
            _ => None,
        }
    }

    /// Returns the float when this is a [`Value::Double`].
    #[must_use]
    pub const fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(number) => Some(*number),
            _ => None,
        }
    }

    /// Returns the flag when this is a [`Value::Boolean`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the record when this is a [`Value::Invocation`].
    #[must_use]
    pub const fn as_invocation(&self) -> Option<&Invocation> {
        match self {
            Self::Invocation(invocation) => Some(invocation),
            _ => None,
        }
    }

    /// Returns the strings held by a list, or `None` if this is not a list of
    /// strings.
    #[must_use]
    pub fn as_string_list(&self) -> Option<Vec<&str>> {
        self.as_list()?.iter().map(Self::as_str).collect()
    }

    /// Looks up a nested member by path.
    ///
    /// Key segments descend into dictionaries and invocation arguments;
    /// index segments descend into lists. The empty path returns `self`.
    ///
    /// ```
    /// use configfile::{Value, ValuePath, parse};
    ///
    /// let dict = parse("jobs = [{ name = \"build\" }]").expect("parse");
    /// let root = Value::Dict(dict);
    /// let path: ValuePath = "jobs[0].name".parse().expect("path");
    /// assert_eq!(root.get_path(&path).and_then(Value::as_str), Some("build"));
    /// ```
    #[must_use]
    pub fn get_path(&self, path: &ValuePath) -> Option<&Self> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| match (node, segment) {
                (Self::Dict(dict), PathSegment::Key(key)) => dict.get(key),
                (Self::Invocation(invocation), PathSegment::Key(key)) => invocation.args.get(key),
                (Self::List(items), PathSegment::Index(index)) => items.get(*index),
                _ => None,
            })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::printer::value_to_inline_text(self))
    }
}

impl From<Dict> for Value {
    fn from(value: Dict) -> Self {
        Self::Dict(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Invocation> for Value {
    fn from(value: Invocation) -> Self {
        Self::Invocation(value)
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::List(iter.into_iter().map(Into::into).collect())
    }
}
