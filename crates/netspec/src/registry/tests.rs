//! Unit tests for phase registration and description.

use configfile::{Dict, Value, parse, parse_value};
use rstest::{fixture, rstest};

use super::*;
use crate::engine::Acknowledger;

fn noop(_params: Dict, _ack: &mut Acknowledger<'_>) -> Result<(), PhaseError> {
    Ok(())
}

fn spec_value(text: &str) -> Value {
    parse_value(text).expect("spec parses")
}

#[fixture]
fn registry() -> PhaseRegistry {
    PhaseRegistry::new()
}

#[rstest]
fn new_registry_holds_only_query(registry: PhaseRegistry) {
    assert_eq!(registry.len(), 1);
    assert!(!registry.is_empty());
    let query = registry.get(QUERY_PHASE).expect("query phase present");
    assert!(query.is_builtin());
    assert_eq!(query.name(), QUERY_PHASE);
}

#[rstest]
fn query_spec_accepts_only_an_empty_dictionary(registry: PhaseRegistry) {
    let spec = registry
        .get(QUERY_PHASE)
        .and_then(Phase::spec)
        .expect("query phase has a spec");
    assert_eq!(spec.as_dict(), &parse("type = dictionary").expect("parses"));
    assert!(spec.verify_dict(&Dict::new()).is_empty());
    assert!(!spec.verify_dict(&parse("verbose = true").expect("parses")).is_empty());
}

#[rstest]
fn phases_are_listed_in_registration_order(mut registry: PhaseRegistry) {
    registry.register("zeta", None, "", noop).expect("register zeta");
    registry.register("alpha", None, "", noop).expect("register alpha");
    assert_eq!(registry.names().collect::<Vec<_>>(), [QUERY_PHASE, "zeta", "alpha"]);
}

#[rstest]
fn duplicate_names_are_rejected_and_first_kept(mut registry: PhaseRegistry) {
    registry
        .register("exec", None, "first", noop)
        .expect("first registration");
    let error = registry
        .register("exec", None, "second", noop)
        .expect_err("duplicate");
    assert!(matches!(error, RegistryError::Duplicate { ref name } if name == "exec"));
    assert_eq!(registry.get("exec").map(Phase::doc), Some("first"));
    assert_eq!(registry.len(), 2);
}

#[rstest]
fn builtin_query_cannot_be_replaced(mut registry: PhaseRegistry) {
    let error = registry
        .register(QUERY_PHASE, None, "", noop)
        .expect_err("reserved");
    assert!(matches!(error, RegistryError::Duplicate { .. }));
    assert!(registry.get(QUERY_PHASE).is_some_and(Phase::is_builtin));
}

#[rstest]
fn empty_names_are_rejected(mut registry: PhaseRegistry) {
    let error = registry.register("", None, "", noop).expect_err("empty");
    assert!(matches!(error, RegistryError::EmptyName));
}

#[rstest]
fn malformed_specs_are_rejected(mut registry: PhaseRegistry) {
    let error = registry
        .register("exec", Some(spec_value("{ type = widget }")), "", noop)
        .expect_err("bad spec");
    assert!(matches!(error, RegistryError::InvalidSpec { ref name, .. } if name == "exec"));
    assert!(registry.get("exec").is_none());
}

#[rstest]
fn describe_reports_doc_and_spec(mut registry: PhaseRegistry) {
    let spec_text = "{ type = dictionary, dictionary_keys = { x = { type = int } } }";
    registry
        .register("A", None, "no parameters", noop)
        .expect("register A");
    registry
        .register("B", Some(spec_value(spec_text)), "takes x", noop)
        .expect("register B");

    let described = registry.describe();
    assert_eq!(
        described.keys().map(String::as_str).collect::<Vec<_>>(),
        ["A", "B", QUERY_PHASE]
    );
    assert_eq!(
        described.get("A"),
        Some(&Value::Dict(parse(r#"doc = "no parameters", spec = {}"#).expect("parses")))
    );
    let b_spec = described
        .get("B")
        .and_then(Value::as_dict)
        .and_then(|entry| entry.get("spec"));
    assert_eq!(b_spec, Some(&spec_value(spec_text)));
}

#[rstest]
fn closures_register_through_register_fn(mut registry: PhaseRegistry) {
    let label = String::from("counted");
    registry
        .register_fn("count", None, "", move |_params, ack| {
            ack.warning(label.clone())?;
            Ok(())
        })
        .expect("register closure");
    assert!(registry.handler_mut("count").is_some());
    assert!(registry.handler_mut(QUERY_PHASE).is_none());
    assert!(registry.handler_mut("missing").is_none());
}
