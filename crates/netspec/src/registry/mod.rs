//! Phase table consulted by the engine.
//!
//! Phases are registered once at start-up, before the engine starts reading
//! requests. The built-in [`QUERY_PHASE`] is always present and lists every
//! registered phase with its documentation and spec.

mod errors;

use std::collections::BTreeMap;
use std::fmt;

use configfile::{Dict, Value, ValueKind};
use configspec::Spec;
use tracing::{debug, warn};

use crate::engine::Acknowledger;

pub use self::errors::{PhaseError, RegistryError};

/// Name of the built-in introspection phase.
pub const QUERY_PHASE: &str = "_query";

/// Tracing target for registry operations.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

const QUERY_DOC: &str = "Lists every registered phase with its documentation and spec.";
const DOC_KEY: &str = "doc";
const SPEC_KEY: &str = "spec";

/// Work performed when a phase is requested.
///
/// A handler receives the validated parameters and an [`Acknowledger`]. It
/// should acknowledge at most once; if it returns without acknowledging, the
/// engine answers with a bare `OK`.
///
/// Closures of the form `FnMut(Dict, &mut Acknowledger<'_>) -> Result<(),
/// PhaseError>` implement this trait; see [`PhaseRegistry::register_fn`].
pub trait PhaseHandler {
    /// Runs the phase.
    ///
    /// # Errors
    ///
    /// Returns a [`PhaseError`] when the phase fails. If the handler has not
    /// acknowledged yet, the engine reports the error to the controller.
    fn handle(&mut self, params: Dict, ack: &mut Acknowledger<'_>) -> Result<(), PhaseError>;
}

impl<F> PhaseHandler for F
where
    F: FnMut(Dict, &mut Acknowledger<'_>) -> Result<(), PhaseError>,
{
    fn handle(&mut self, params: Dict, ack: &mut Acknowledger<'_>) -> Result<(), PhaseError> {
        self(params, ack)
    }
}

enum Action {
    Query,
    Handler(Box<dyn PhaseHandler>),
}

/// A registered phase.
pub struct Phase {
    name: String,
    doc: String,
    spec: Option<Spec>,
    action: Action,
}

impl Phase {
    /// Returns the phase name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the phase documentation.
    #[must_use]
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Returns the parameter spec, if the phase declares one.
    #[must_use]
    pub const fn spec(&self) -> Option<&Spec> {
        self.spec.as_ref()
    }

    /// Returns `true` for phases implemented by the engine itself.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        matches!(self.action, Action::Query)
    }

    fn describe(&self) -> Value {
        let spec = self.spec.as_ref().map(Spec::as_dict).cloned().unwrap_or_default();
        let mut entry = Dict::new();
        entry.insert(DOC_KEY.to_owned(), Value::from(self.doc.as_str()));
        entry.insert(SPEC_KEY.to_owned(), Value::Dict(spec));
        Value::Dict(entry)
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .field("spec", &self.spec)
            .field("builtin", &self.is_builtin())
            .finish_non_exhaustive()
    }
}

/// Registry of phases keyed by name.
///
/// # Example
///
/// ```
/// use configfile::parse_value;
/// use netspec::{PhaseRegistry, QUERY_PHASE};
///
/// let mut registry = PhaseRegistry::new();
/// let spec = parse_value("{ type = dictionary, dictionary_keys = { x = { type = int } } }")
///     .expect("spec parses");
/// registry
///     .register_fn("apply", Some(spec), "Applies x.", |_params, ack| {
///         ack.ok()?;
///         Ok(())
///     })
///     .expect("registration succeeds");
///
/// assert_eq!(registry.names().collect::<Vec<_>>(), [QUERY_PHASE, "apply"]);
/// ```
#[derive(Debug)]
pub struct PhaseRegistry {
    phases: BTreeMap<String, Phase>,
    order: Vec<String>,
}

impl Default for PhaseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseRegistry {
    /// Creates a registry holding only the built-in [`QUERY_PHASE`].
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            phases: BTreeMap::new(),
            order: Vec::new(),
        };
        let query = Phase {
            name: QUERY_PHASE.to_owned(),
            doc: QUERY_DOC.to_owned(),
            spec: Some(Spec::of_kind(ValueKind::Dict)),
            action: Action::Query,
        };
        registry.insert(query);
        registry
    }

    /// Registers a phase.
    ///
    /// `spec`, when present, is compiled immediately; every request for the
    /// phase is checked against it before the handler runs.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for empty or duplicate names and malformed
    /// specs. The registry is unchanged on error.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        spec: Option<Value>,
        doc: impl Into<String>,
        handler: impl PhaseHandler + 'static,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let result = self.try_register(name.clone(), spec, doc.into(), Box::new(handler));
        match &result {
            Ok(()) => debug!(target: REGISTRY_TARGET, phase = %name, "phase registered"),
            Err(error) => warn!(target: REGISTRY_TARGET, phase = %name, %error, "phase rejected"),
        }
        result
    }

    /// Registers a closure as a phase handler.
    ///
    /// # Errors
    ///
    /// See [`PhaseRegistry::register`].
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        spec: Option<Value>,
        doc: impl Into<String>,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: FnMut(Dict, &mut Acknowledger<'_>) -> Result<(), PhaseError> + 'static,
    {
        self.register(name, spec, doc, handler)
    }

    fn try_register(
        &mut self,
        name: String,
        spec: Option<Value>,
        doc: String,
        handler: Box<dyn PhaseHandler>,
    ) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.phases.contains_key(&name) {
            return Err(RegistryError::Duplicate { name });
        }
        let spec = match spec {
            Some(value) => Some(
                Spec::compile(&value)
                    .map_err(|source| RegistryError::InvalidSpec {
                        name: name.clone(),
                        source,
                    })?,
            ),
            None => None,
        };
        self.insert(Phase {
            name,
            doc,
            spec,
            action: Action::Handler(handler),
        });
        Ok(())
    }

    fn insert(&mut self, phase: Phase) {
        self.order.push(phase.name.clone());
        self.phases.insert(phase.name.clone(), phase);
    }

    /// Looks up a phase by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Phase> {
        self.phases.get(name)
    }

    /// Returns the handler for a user-registered phase.
    pub(crate) fn handler_mut(&mut self, name: &str) -> Option<&mut dyn PhaseHandler> {
        match &mut self.phases.get_mut(name)?.action {
            Action::Handler(handler) => Some(handler.as_mut()),
            Action::Query => None,
        }
    }

    /// Returns the number of phases, including the built-in ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always `false`: the built-in phases are present from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Iterates over phase names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Describes every phase as `name -> { doc, spec }`.
    ///
    /// A phase without a spec reports an empty `spec` dictionary.
    #[must_use]
    pub fn describe(&self) -> Dict {
        self.phases
            .iter()
            .map(|(name, phase)| (name.clone(), phase.describe()))
            .collect()
    }
}

#[cfg(test)]
mod tests;
