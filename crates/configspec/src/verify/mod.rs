//! Checking values against compiled specs.
//!
//! Validation walks the value and spec together and records every mismatch
//! rather than stopping at the first one. A subtree whose type is wrong is
//! reported once and not descended into; its siblings are still checked.

use std::collections::BTreeMap;
use std::fmt;

use configfile::{Dict, Value, ValueKind, ValuePath};
use thiserror::Error;

use crate::error::SpecError;
use crate::spec::{Shape, Spec};

/// One way in which a value failed to match its spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {kind}")]
pub struct Violation {
    /// Location of the offending member inside the checked value.
    pub path: ValuePath,
    /// What was wrong.
    pub kind: ViolationKind,
}

/// Classification of a [`Violation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViolationKind {
    /// The value had a different type from the one the spec requires.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Required type.
        expected: ValueKind,
        /// Actual type.
        found: ValueKind,
    },

    /// A required key was absent.
    #[error("missing required key '{key}'")]
    MissingKey {
        /// Name of the absent key.
        key: String,
    },

    /// A key was present that the spec neither declares nor admits through
    /// a member spec.
    #[error("unexpected key '{key}'")]
    UnexpectedKey {
        /// Name of the undeclared key.
        key: String,
    },

    /// An invocation carried an argument its spec does not declare.
    #[error("unexpected argument '{name}'")]
    UnexpectedArgument {
        /// Name of the undeclared argument.
        name: String,
    },

    /// An invocation had a different name from the one the spec requires.
    #[error("expected invocation of '{expected}', found '{found}'")]
    InvocationName {
        /// Required invocation name.
        expected: String,
        /// Actual invocation name.
        found: String,
    },
}

/// Every violation found while checking one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// Returns `true` when the value conformed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the violations in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Returns the violations as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }

    fn push(&mut self, path: ValuePath, kind: ViolationKind) {
        self.0.push(Violation { path, kind });
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => f.write_str("no violations"),
            [only] => write!(f, "{only}"),
            all => {
                write!(f, "{} violations:", all.len())?;
                for violation in all {
                    write!(f, "\n  {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Violations {}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Spec {
    /// Checks `value` against this spec and returns every violation found.
    ///
    /// An empty result means the value conforms.
    #[must_use]
    pub fn verify(&self, value: &Value) -> Violations {
        let mut violations = Violations::default();
        check(value, self, &ValuePath::root(), &mut violations);
        violations
    }

    /// Checks a dictionary against this spec without wrapping it in a
    /// [`Value`].
    #[must_use]
    pub fn verify_dict(&self, dict: &Dict) -> Violations {
        let mut violations = Violations::default();
        let root = ValuePath::root();
        match self.shape() {
            Shape::Dictionary { keys, members } => {
                check_dict(dict, keys, members.as_deref(), &root, &mut violations);
            }
            _ => violations.push(
                root,
                ViolationKind::TypeMismatch {
                    expected: self.kind(),
                    found: ValueKind::Dict,
                },
            ),
        }
        violations
    }

    /// Checks `value` against this spec.
    ///
    /// # Errors
    ///
    /// Returns the full set of [`Violations`] if the value does not conform.
    pub fn check(&self, value: &Value) -> Result<(), Violations> {
        let violations = self.verify(value);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Compiles `spec` and checks `value` against it.
///
/// ```
/// use configfile::parse_value;
/// use configspec::verify;
///
/// let spec = parse_value("{ type = dictionary, dictionary_keys = { x = { type = int } } }")
///     .expect("spec parses");
/// let value = parse_value("{ x = \"seven\" }").expect("value parses");
/// let violations = verify(&value, &spec).expect("spec compiles");
/// assert_eq!(violations.to_string(), "x: expected int, found string");
/// ```
///
/// # Errors
///
/// Returns a [`SpecError`] if `spec` is not a well-formed spec.
pub fn verify(value: &Value, spec: &Value) -> Result<Violations, SpecError> {
    Ok(Spec::compile(spec)?.verify(value))
}

fn check(value: &Value, spec: &Spec, path: &ValuePath, out: &mut Violations) {
    let found = value.kind();
    if found != spec.kind() {
        out.push(
            path.clone(),
            ViolationKind::TypeMismatch {
                expected: spec.kind(),
                found,
            },
        );
        return;
    }

    match (value, spec.shape()) {
        (Value::Dict(dict), Shape::Dictionary { keys, members }) => {
            check_dict(dict, keys, members.as_deref(), path, out);
        }
        (Value::List(items), Shape::List { members: Some(item_spec) }) => {
            for (index, item) in items.iter().enumerate() {
                check(item, item_spec, &path.index(index), out);
            }
        }
        (Value::Invocation(invocation), Shape::Invocation { name, keys }) => {
            if let Some(expected) = name
                && expected != invocation.name()
            {
                out.push(
                    path.clone(),
                    ViolationKind::InvocationName {
                        expected: expected.clone(),
                        found: invocation.name().to_owned(),
                    },
                );
            }
            check_keyed(invocation.args(), keys, path, out, |name| {
                Undeclared::Reject(ViolationKind::UnexpectedArgument {
                    name: name.to_owned(),
                })
            });
        }
        _ => {}
    }
}

fn check_dict(
    dict: &Dict,
    keys: &BTreeMap<String, Spec>,
    members: Option<&Spec>,
    path: &ValuePath,
    out: &mut Violations,
) {
    check_keyed(dict, keys, path, out, |key| match members {
        Some(member_spec) => Undeclared::CheckAgainst(member_spec),
        None => Undeclared::Reject(ViolationKind::UnexpectedKey {
            key: key.to_owned(),
        }),
    });
}

enum Undeclared<'a> {
    CheckAgainst(&'a Spec),
    Reject(ViolationKind),
}

fn check_keyed<'a>(
    entries: &Dict,
    declared: &'a BTreeMap<String, Spec>,
    path: &ValuePath,
    out: &mut Violations,
    undeclared: impl Fn(&str) -> Undeclared<'a>,
) {
    for (key, key_spec) in declared {
        match entries.get(key) {
            Some(member) => check(member, key_spec, &path.key(key.as_str()), out),
            None if key_spec.is_optional() => {}
            None => out.push(
                path.key(key.as_str()),
                ViolationKind::MissingKey { key: key.clone() },
            ),
        }
    }

    for (key, member) in entries {
        if declared.contains_key(key) {
            continue;
        }
        let member_path = path.key(key.as_str());
        match undeclared(key) {
            Undeclared::CheckAgainst(member_spec) => check(member, member_spec, &member_path, out),
            Undeclared::Reject(kind) => out.push(member_path, kind),
        }
    }
}
