//! Unit tests for the request/acknowledge loop.

use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use configfile::{Dict, MAX_NESTING, Value, parse, parse_value, serialize};
use rstest::{fixture, rstest};

use super::*;
use crate::frame::{FrameError, write_frame};
use crate::protocol::{Acknowledgement, Request, decode_payload};
use crate::registry::{PhaseError, PhaseRegistry, QUERY_PHASE};

const EXEC_SPEC: &str =
    "{ type = dictionary, dictionary_keys = { commands = { type = list, list_members = { type = string } } } }";

type Calls = Rc<RefCell<Vec<Dict>>>;

fn dict(text: &str) -> Dict {
    parse(text).expect("dictionary parses")
}

fn framed(values: &[Value]) -> Vec<u8> {
    let mut out = Vec::new();
    for value in values {
        write_frame(&mut out, &serialize(value)).expect("frame writes");
    }
    out
}

fn request(phase: &str, params: &str) -> Value {
    Request::new(phase, dict(params)).to_value()
}

fn acknowledgements(output: &[u8]) -> Vec<Acknowledgement> {
    let mut reader = Cursor::new(output);
    let mut acks = Vec::new();
    while let Some(payload) =
        crate::frame::read_frame(&mut reader, u32::MAX).expect("frame reads")
    {
        let value = decode_payload(&payload).expect("payload decodes");
        acks.push(Acknowledgement::from_value(value).expect("acknowledgement decodes"));
    }
    acks
}

/// Registry with an `exec` phase that records its parameters and exits, and
/// a `note` phase that returns without acknowledging.
#[fixture]
fn recorded() -> (PhaseRegistry, Calls) {
    let calls: Calls = Rc::default();
    let mut registry = PhaseRegistry::new();
    let exec_calls = Rc::clone(&calls);
    registry
        .register_fn(
            "exec",
            Some(parse_value(EXEC_SPEC).expect("spec parses")),
            "Runs commands.",
            move |params, ack| {
                exec_calls.borrow_mut().push(params);
                ack.exit_ok()?;
                Ok(())
            },
        )
        .expect("register exec");
    let note_calls = Rc::clone(&calls);
    registry
        .register_fn("note", None, "Records a note.", move |params, _ack| {
            note_calls.borrow_mut().push(params);
            Ok(())
        })
        .expect("register note");
    (registry, calls)
}

fn engine(registry: PhaseRegistry, requests: &[Value]) -> Engine<Cursor<Vec<u8>>, Vec<u8>> {
    Engine::new(registry, Cursor::new(framed(requests)), Vec::new())
}

#[rstest]
fn valid_request_reaches_handler_and_terminates(recorded: (PhaseRegistry, Calls)) {
    let (registry, calls) = recorded;
    let mut engine = engine(registry, &[request("exec", r#"commands = ["echo hi"]"#)]);

    assert_eq!(engine.run().expect("session ends"), Termination::Success);
    assert_eq!(calls.borrow().as_slice(), [dict(r#"commands = ["echo hi"]"#)]);

    let (_, _, output) = engine.into_parts();
    let acks = acknowledgements(&output);
    assert_eq!(acks.len(), 1);
    assert_eq!(acks.first().map(Acknowledgement::code), Some(AckCode::OkExit));
}

#[rstest]
fn invalid_params_are_rejected_without_dispatch(recorded: (PhaseRegistry, Calls)) {
    let (registry, calls) = recorded;
    let mut engine = engine(registry, &[request("exec", r#"commands = "not-a-list""#)]);

    assert_eq!(engine.run().expect("session ends"), Termination::Failure);
    assert!(calls.borrow().is_empty());

    let (_, _, output) = engine.into_parts();
    let ack = acknowledgements(&output).pop().expect("one acknowledgement");
    assert_eq!(ack.code(), AckCode::Error);
    let message = ack.message().expect("message present");
    assert!(message.contains("commands: expected list"), "{message}");
    assert_eq!(ack.config(), Some(&dict(r#"commands = "not-a-list""#)));
}

#[rstest]
fn unknown_phase_warns_and_keeps_serving(recorded: (PhaseRegistry, Calls)) {
    let (registry, calls) = recorded;
    let mut engine = engine(
        registry,
        &[
            request("bogus", ""),
            request("exec", r#"commands = []"#),
        ],
    );

    assert_eq!(engine.step().expect("first step"), Flow::Continue);
    assert_eq!(
        engine.step().expect("second step"),
        Flow::Terminate(Termination::Success)
    );
    assert_eq!(calls.borrow().len(), 1);

    let (_, _, output) = engine.into_parts();
    let codes: Vec<_> = acknowledgements(&output).iter().map(Acknowledgement::code).collect();
    assert_eq!(codes, [AckCode::Warning, AckCode::OkExit]);
}

#[rstest]
fn silent_handler_gets_implicit_ok(recorded: (PhaseRegistry, Calls)) {
    let (registry, calls) = recorded;
    let mut engine = engine(registry, &[request("note", "text = \"hello\"")]);

    assert_eq!(engine.step().expect("step"), Flow::Continue);
    assert_eq!(calls.borrow().as_slice(), [dict("text = \"hello\"")]);
    let (_, _, output) = engine.into_parts();
    let acks = acknowledgements(&output);
    assert_eq!(acks, [Acknowledgement::new(AckCode::Ok)]);
}

#[rstest]
fn deepest_parsable_params_are_dispatched(recorded: (PhaseRegistry, Calls)) {
    let nested = |levels: usize| format!("a = {}1{}", "[".repeat(levels), "]".repeat(levels));
    assert!(parse(&nested(MAX_NESTING)).is_err());
    let text = nested(MAX_NESTING - 1);

    let (registry, calls) = recorded;
    let mut engine = engine(registry, &[request("note", &text)]);

    assert_eq!(engine.step().expect("step"), Flow::Continue);
    assert_eq!(calls.borrow().as_slice(), [dict(&text)]);
    let (_, _, output) = engine.into_parts();
    assert_eq!(acknowledgements(&output), [Acknowledgement::new(AckCode::Ok)]);
}

#[test]
fn query_lists_phases_with_specs() {
    let mut registry = PhaseRegistry::new();
    let b_spec = parse_value("{ type = dictionary, dictionary_keys = { x = { type = int } } }")
        .expect("spec parses");
    registry
        .register_fn("A", None, "first", |_params, _ack| Ok(()))
        .expect("register A");
    registry
        .register_fn("B", Some(b_spec.clone()), "second", |_params, _ack| Ok(()))
        .expect("register B");
    let mut engine = engine(registry, &[request(QUERY_PHASE, "")]);

    assert_eq!(engine.step().expect("step"), Flow::Continue);
    let (_, _, output) = engine.into_parts();
    let ack = acknowledgements(&output).pop().expect("one acknowledgement");
    assert_eq!(ack.code(), AckCode::Ok);

    let phases = ack.config().expect("phase table");
    assert!(phases.contains_key("A"));
    assert!(phases.contains_key(QUERY_PHASE));
    let spec_of = |name: &str| {
        phases
            .get(name)
            .and_then(Value::as_dict)
            .and_then(|entry| entry.get("spec"))
            .cloned()
    };
    assert_eq!(spec_of("B"), Some(b_spec));
    assert_eq!(spec_of("A"), Some(Value::Dict(Dict::new())));
}

#[rstest]
#[case(Value::from("not a dictionary"))]
#[case(parse_value("{ params = {} }").expect("value parses"))]
#[case(parse_value("{ phase_name = \"exec\", params = 3 }").expect("value parses"))]
fn malformed_requests_are_answered_with_error(
    recorded: (PhaseRegistry, Calls),
    #[case] payload: Value,
) {
    let (registry, calls) = recorded;
    let mut engine = engine(registry, &[payload]);

    assert_eq!(engine.run().expect("session ends"), Termination::Failure);
    assert!(calls.borrow().is_empty());
    let (_, _, output) = engine.into_parts();
    let ack = acknowledgements(&output).pop().expect("one acknowledgement");
    assert_eq!(ack.code(), AckCode::Error);
    assert!(ack.message().is_some_and(|m| m.starts_with("malformed request")));
}

#[rstest]
fn clean_end_of_stream_is_fatal(recorded: (PhaseRegistry, Calls)) {
    let (registry, _) = recorded;
    let mut engine = engine(registry, &[]);
    assert!(matches!(engine.run(), Err(EngineError::ChannelClosed)));
}

#[rstest]
fn truncated_frame_is_fatal(recorded: (PhaseRegistry, Calls)) {
    let (registry, _) = recorded;
    let mut bytes = framed(&[request("exec", "commands = []")]);
    bytes.truncate(bytes.len() - 1);
    let mut engine = Engine::new(registry, Cursor::new(bytes), Vec::new());
    assert!(matches!(
        engine.run(),
        Err(EngineError::Frame(FrameError::TruncatedPayload { .. }))
    ));
    let (_, _, output) = engine.into_parts();
    assert!(output.is_empty());
}

#[rstest]
fn undecodable_payload_is_fatal(recorded: (PhaseRegistry, Calls)) {
    let (registry, _) = recorded;
    let mut bytes = Vec::new();
    write_frame(&mut bytes, &[0xff]).expect("frame writes");
    let mut engine = Engine::new(registry, Cursor::new(bytes), Vec::new());
    assert!(matches!(engine.run(), Err(EngineError::Decode(_))));
}

#[rstest]
fn oversize_frame_is_fatal(recorded: (PhaseRegistry, Calls)) {
    let (registry, _) = recorded;
    let mut engine = engine(registry, &[request("exec", "commands = [\"a long command\"]")])
        .with_max_frame_bytes(8);
    assert!(matches!(
        engine.run(),
        Err(EngineError::Frame(FrameError::TooLarge { limit: 8, .. }))
    ));
}

#[test]
fn handler_error_without_ack_is_reported() {
    let mut registry = PhaseRegistry::new();
    registry
        .register_fn("fail", None, "", |_params, _ack| {
            Err(PhaseError::failed("disk full"))
        })
        .expect("register fail");
    let mut engine = engine(registry, &[request("fail", "")]);

    assert_eq!(engine.run().expect("session ends"), Termination::Failure);
    let (_, _, output) = engine.into_parts();
    let ack = acknowledgements(&output).pop().expect("one acknowledgement");
    assert_eq!(ack, Acknowledgement::new(AckCode::Error).with_message("disk full"));
}

#[test]
fn handler_error_after_ack_keeps_the_sent_outcome() {
    let mut registry = PhaseRegistry::new();
    registry
        .register_fn("partial", None, "", |_params, ack| {
            ack.warning("half done")?;
            Err(PhaseError::failed("second half failed"))
        })
        .expect("register partial");
    let mut engine = engine(registry, &[request("partial", "")]);

    assert_eq!(engine.step().expect("step"), Flow::Continue);
    let (_, _, output) = engine.into_parts();
    let acks = acknowledgements(&output);
    assert_eq!(acks, [Acknowledgement::new(AckCode::Warning).with_message("half done")]);
}

#[test]
fn second_acknowledgement_is_refused() {
    let outcome: Rc<RefCell<Option<AckError>>> = Rc::default();
    let seen = Rc::clone(&outcome);
    let mut registry = PhaseRegistry::new();
    registry
        .register_fn("twice", None, "", move |_params, ack| {
            ack.ok()?;
            *seen.borrow_mut() = ack.exit_ok().err();
            Ok(())
        })
        .expect("register twice");
    let mut engine = engine(registry, &[request("twice", "")]);

    assert_eq!(engine.step().expect("step"), Flow::Continue);
    assert!(matches!(
        outcome.borrow().as_ref(),
        Some(AckError::AlreadySent {
            code: AckCode::Ok,
            ..
        })
    ));
    let (_, _, output) = engine.into_parts();
    assert_eq!(acknowledgements(&output).len(), 1);
}

#[rstest]
fn terminated_engine_stops_reading(recorded: (PhaseRegistry, Calls)) {
    let (registry, calls) = recorded;
    let mut engine = engine(
        registry,
        &[
            request("exec", "commands = []"),
            request("exec", "commands = []"),
        ],
    );
    assert_eq!(engine.run().expect("session ends"), Termination::Success);
    assert_eq!(engine.step().expect("absorbed"), Flow::Terminate(Termination::Success));
    assert_eq!(engine.termination(), Some(Termination::Success));
    assert_eq!(calls.borrow().len(), 1);
}

struct ClosedWriter;

impl Write for ClosedWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[rstest]
fn acknowledgement_write_failure_is_fatal(recorded: (PhaseRegistry, Calls)) {
    let (registry, _) = recorded;
    let input = Cursor::new(framed(&[request("exec", "commands = []")]));
    let mut engine = Engine::new(registry, input, ClosedWriter);
    assert!(matches!(engine.run(), Err(EngineError::Frame(FrameError::Io(_)))));
}

#[test]
fn termination_maps_to_exit_codes() {
    assert!(Termination::Success.is_success());
    assert!(!Termination::Failure.is_success());
    assert_eq!(Termination::Success.exit_code(), ExitCode::SUCCESS);
    assert_eq!(Termination::Failure.exit_code(), ExitCode::FAILURE);
}
