//! The acknowledgement primitive handed to phase handlers.

use std::io::Write;

use configfile::serialize;
use thiserror::Error;
use tracing::debug;

use super::ENGINE_TARGET;
use crate::frame::{FrameError, write_frame};
use crate::protocol::{AckCode, Acknowledgement};

/// Errors raised when a handler acknowledges.
#[derive(Debug, Clone, Error)]
pub enum AckError {
    /// The handler already acknowledged this request.
    #[error("phase '{phase}' was already acknowledged with {code}")]
    AlreadySent {
        /// Phase being handled.
        phase: String,
        /// Code of the acknowledgement already sent.
        code: AckCode,
    },

    /// The acknowledgement could not be written to the channel.
    #[error("failed to send acknowledgement: {0}")]
    Channel(#[source] FrameError),
}

/// Sends the single acknowledgement for one request.
///
/// The engine creates one `Acknowledger` per dispatched request. The first
/// successful call to [`send`](Self::send) or one of its shorthands writes the
/// acknowledgement; later calls fail with [`AckError::AlreadySent`].
pub struct Acknowledger<'a> {
    writer: &'a mut dyn Write,
    phase: &'a str,
    sent: Option<AckCode>,
    failure: Option<FrameError>,
}

impl<'a> Acknowledger<'a> {
    pub(crate) fn new(writer: &'a mut dyn Write, phase: &'a str) -> Self {
        Self {
            writer,
            phase,
            sent: None,
            failure: None,
        }
    }

    /// Returns the name of the phase being handled.
    #[must_use]
    pub const fn phase(&self) -> &str {
        self.phase
    }

    /// Returns the code already sent, if any.
    #[must_use]
    pub const fn sent(&self) -> Option<AckCode> {
        self.sent
    }

    /// Sends `ack` to the controller.
    ///
    /// # Errors
    ///
    /// Returns [`AckError::AlreadySent`] on a second call and
    /// [`AckError::Channel`] if the channel write fails.
    pub fn send(&mut self, ack: Acknowledgement) -> Result<(), AckError> {
        if let Some(code) = self.sent {
            return Err(AckError::AlreadySent {
                phase: self.phase.to_owned(),
                code,
            });
        }
        if let Err(error) = write_ack(self.writer, &ack) {
            self.failure = Some(error.clone());
            return Err(AckError::Channel(error));
        }
        debug!(
            target: ENGINE_TARGET,
            phase = self.phase,
            code = %ack.code(),
            "handler acknowledged"
        );
        self.sent = Some(ack.code());
        Ok(())
    }

    /// Sends a bare `OK`.
    ///
    /// # Errors
    ///
    /// See [`Acknowledger::send`].
    pub fn ok(&mut self) -> Result<(), AckError> {
        self.send(Acknowledgement::new(AckCode::Ok))
    }

    /// Sends `WARNING` with a message.
    ///
    /// # Errors
    ///
    /// See [`Acknowledger::send`].
    pub fn warning(&mut self, message: impl Into<String>) -> Result<(), AckError> {
        self.send(Acknowledgement::new(AckCode::Warning).with_message(message))
    }

    /// Sends a bare `OK_EXIT`, ending the session successfully.
    ///
    /// # Errors
    ///
    /// See [`Acknowledger::send`].
    pub fn exit_ok(&mut self) -> Result<(), AckError> {
        self.send(Acknowledgement::new(AckCode::OkExit))
    }

    /// Sends `ERROR` with a message, ending the session with failure.
    ///
    /// # Errors
    ///
    /// See [`Acknowledger::send`].
    pub fn error(&mut self, message: impl Into<String>) -> Result<(), AckError> {
        self.send(Acknowledgement::new(AckCode::Error).with_message(message))
    }

    pub(crate) fn take_failure(&mut self) -> Option<FrameError> {
        self.failure.take()
    }
}

/// Encodes and frames one acknowledgement.
pub(crate) fn write_ack(writer: &mut dyn Write, ack: &Acknowledgement) -> Result<(), FrameError> {
    write_frame(writer, &serialize(&ack.to_value()))
}
