//! The request/acknowledge loop.
//!
//! The engine reads one request frame at a time, validates its parameters
//! against the phase spec, runs the phase handler and makes sure exactly one
//! acknowledgement goes back before the next read. It never exits the process
//! itself: [`Engine::run`] returns a [`Termination`] for the binary to turn
//! into an exit status.
//!
//! ```text
//! AWAITING_REQUEST -> VALIDATING -> DISPATCHING -> AWAITING_REQUEST
//!                          |              |
//!                          +--------------+--> TERMINATED
//! ```

mod ack;
mod errors;

use std::io::{Read, Write};
use std::process::ExitCode;

use configfile::Dict;
use netspec_config::DEFAULT_MAX_FRAME_BYTES;
use tracing::{debug, info, warn};

use crate::frame::read_frame;
use crate::protocol::{AckCode, Acknowledgement, Request, decode_payload};
use crate::registry::{PhaseError, PhaseRegistry};

pub use self::ack::{AckError, Acknowledger};
pub use self::errors::EngineError;

use self::ack::write_ack;

/// Tracing target for engine state transitions.
pub(crate) const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The controller asked the daemon to finish successfully.
    Success,
    /// The session ended because of an error.
    Failure,
}

impl Termination {
    /// Returns `true` for [`Termination::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the process exit code for this outcome.
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Failure => ExitCode::FAILURE,
        }
    }

    const fn after(code: AckCode) -> Flow {
        match code {
            AckCode::Ok | AckCode::Warning => Flow::Continue,
            AckCode::OkExit => Flow::Terminate(Self::Success),
            AckCode::Error => Flow::Terminate(Self::Failure),
        }
    }
}

/// What the engine does after one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Wait for the next request.
    Continue,
    /// Stop serving requests.
    Terminate(Termination),
}

/// Serves phase requests from a reader and acknowledges them on a writer.
///
/// # Example
///
/// ```
/// use configfile::{Dict, serialize};
/// use netspec::{Engine, PhaseRegistry, Request, Termination, frame};
///
/// let mut registry = PhaseRegistry::new();
/// registry
///     .register_fn("shutdown", None, "Stops the daemon.", |_params, ack| {
///         ack.exit_ok()?;
///         Ok(())
///     })
///     .expect("registration succeeds");
///
/// let mut input = Vec::new();
/// let request = Request::new("shutdown", Dict::new());
/// frame::write_frame(&mut input, &serialize(&request.to_value())).expect("frame");
///
/// let mut engine = Engine::new(registry, input.as_slice(), Vec::new());
/// assert_eq!(engine.run().expect("session completes"), Termination::Success);
/// ```
pub struct Engine<R, W> {
    registry: PhaseRegistry,
    reader: R,
    writer: W,
    max_frame_bytes: u32,
    terminated: Option<Termination>,
}

impl<R: Read, W: Write> Engine<R, W> {
    /// Creates an engine over a registry and a channel.
    #[must_use]
    pub const fn new(registry: PhaseRegistry, reader: R, writer: W) -> Self {
        Self {
            registry,
            reader,
            writer,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            terminated: None,
        }
    }

    /// Replaces the largest accepted request payload, in bytes.
    #[must_use]
    pub const fn with_max_frame_bytes(mut self, limit: u32) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    /// Returns the phase registry.
    #[must_use]
    pub const fn registry(&self) -> &PhaseRegistry {
        &self.registry
    }

    /// Returns the outcome once the engine has terminated.
    #[must_use]
    pub const fn termination(&self) -> Option<Termination> {
        self.terminated
    }

    /// Releases the registry and channel halves.
    #[must_use]
    pub fn into_parts(self) -> (PhaseRegistry, R, W) {
        (self.registry, self.reader, self.writer)
    }

    /// Serves requests until a phase ends the session.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the channel closes, a frame is
    /// malformed, or an acknowledgement cannot be written.
    pub fn run(&mut self) -> Result<Termination, EngineError> {
        info!(target: ENGINE_TARGET, phases = self.registry.len(), "serving requests");
        loop {
            if let Flow::Terminate(termination) = self.step()? {
                info!(target: ENGINE_TARGET, ?termination, "session ended");
                return Ok(termination);
            }
        }
    }

    /// Reads, validates, dispatches and acknowledges one request.
    ///
    /// Once terminated, further calls return the same outcome without reading.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the channel closes, a frame is
    /// malformed, or an acknowledgement cannot be written.
    pub fn step(&mut self) -> Result<Flow, EngineError> {
        if let Some(termination) = self.terminated {
            return Ok(Flow::Terminate(termination));
        }

        debug!(target: ENGINE_TARGET, "awaiting request");
        let Some(payload) = read_frame(&mut self.reader, self.max_frame_bytes)? else {
            warn!(target: ENGINE_TARGET, "channel closed while awaiting request");
            return Err(EngineError::ChannelClosed);
        };
        let value = decode_payload(&payload)?;

        let flow = match Request::from_value(value) {
            Ok(request) => {
                let (phase_name, params) = request.into_parts();
                self.handle(&phase_name, params)?
            }
            Err(error) => {
                warn!(target: ENGINE_TARGET, %error, "malformed request");
                let ack = Acknowledgement::new(AckCode::Error)
                    .with_message(format!("malformed request: {error}"));
                self.reply(&ack)?
            }
        };

        if let Flow::Terminate(termination) = flow {
            self.terminated = Some(termination);
        }
        Ok(flow)
    }

    fn handle(&mut self, phase_name: &str, params: Dict) -> Result<Flow, EngineError> {
        debug!(target: ENGINE_TARGET, phase = phase_name, "validating request");
        let Some(phase) = self.registry.get(phase_name) else {
            warn!(target: ENGINE_TARGET, phase = phase_name, "unknown phase");
            let ack = Acknowledgement::new(AckCode::Warning)
                .with_message(format!("unknown phase '{phase_name}'"));
            return self.reply(&ack);
        };

        if let Some(spec) = phase.spec() {
            let violations = spec.verify_dict(&params);
            if !violations.is_empty() {
                warn!(
                    target: ENGINE_TARGET,
                    phase = phase_name,
                    violations = violations.len(),
                    "parameters rejected"
                );
                let ack = Acknowledgement::new(AckCode::Error)
                    .with_message(format!("invalid parameters for '{phase_name}': {violations}"))
                    .with_config(params);
                return self.reply(&ack);
            }
        }

        debug!(target: ENGINE_TARGET, phase = phase_name, "dispatching");
        match self.registry.handler_mut(phase_name) {
            Some(handler) => {
                let mut ack = Acknowledger::new(&mut self.writer, phase_name);
                let result = handler.handle(params, &mut ack);
                let sent = ack.sent();
                if let Some(error) = ack.take_failure() {
                    return Err(error.into());
                }
                self.after_handler(phase_name, result, sent)
            }
            None => {
                let ack = Acknowledgement::new(AckCode::Ok).with_config(self.registry.describe());
                self.reply(&ack)
            }
        }
    }

    fn after_handler(
        &mut self,
        phase_name: &str,
        result: Result<(), PhaseError>,
        sent: Option<AckCode>,
    ) -> Result<Flow, EngineError> {
        match (result, sent) {
            (Ok(()), Some(code)) => Ok(Termination::after(code)),
            (Ok(()), None) => {
                debug!(target: ENGINE_TARGET, phase = phase_name, "sending implicit OK");
                self.reply(&Acknowledgement::new(AckCode::Ok))
            }
            (Err(error), None) => {
                warn!(target: ENGINE_TARGET, phase = phase_name, %error, "phase failed");
                let ack = Acknowledgement::new(AckCode::Error).with_message(error.to_string());
                self.reply(&ack)
            }
            (Err(error), Some(code)) => {
                warn!(
                    target: ENGINE_TARGET,
                    phase = phase_name,
                    %error,
                    %code,
                    "phase failed after acknowledging"
                );
                Ok(Termination::after(code))
            }
        }
    }

    fn reply(&mut self, ack: &Acknowledgement) -> Result<Flow, EngineError> {
        write_ack(&mut self.writer, ack)?;
        debug!(target: ENGINE_TARGET, code = %ack.code(), "acknowledged");
        Ok(Termination::after(ack.code()))
    }
}

#[cfg(test)]
mod tests;
