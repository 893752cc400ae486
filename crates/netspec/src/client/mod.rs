//! Controller side of the protocol.
//!
//! [`Controller`] sends requests and reads acknowledgements over any
//! reader/writer pair. It is used by tests and by Rust programs that drive a
//! daemon.

use std::io::{Read, Write};

use configfile::{DecodeError, Dict, serialize};
use netspec_config::DEFAULT_MAX_FRAME_BYTES;
use thiserror::Error;
use tracing::debug;

use crate::frame::{FrameError, read_frame, write_frame};
use crate::protocol::{AckCode, Acknowledgement, ProtocolError, Request, decode_payload};
use crate::registry::QUERY_PHASE;

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Errors raised while talking to a daemon.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The channel failed or carried a malformed frame.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The acknowledgement payload could not be decoded.
    #[error("failed to decode acknowledgement: {0}")]
    Decode(#[from] DecodeError),

    /// The acknowledgement did not have the expected shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The daemon closed the channel before acknowledging.
    #[error("daemon closed the channel")]
    ChannelClosed,

    /// The daemon answered with an unexpected code.
    #[error("unexpected {code} acknowledgement: {message}")]
    UnexpectedAck {
        /// Code received.
        code: AckCode,
        /// Message carried by the acknowledgement, empty when absent.
        message: String,
    },
}

/// Sends requests to a daemon and reads its acknowledgements.
#[derive(Debug)]
pub struct Controller<R, W> {
    reader: R,
    writer: W,
    max_frame_bytes: u32,
}

impl<R: Read, W: Write> Controller<R, W> {
    /// Creates a controller over the daemon's channel.
    #[must_use]
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    /// Replaces the largest accepted acknowledgement payload, in bytes.
    #[must_use]
    pub const fn with_max_frame_bytes(mut self, limit: u32) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    /// Releases the channel halves.
    #[must_use]
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    /// Sends one request without waiting for its acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Frame`] if the write fails.
    pub fn send(&mut self, phase: &str, params: Dict) -> Result<(), ClientError> {
        let request = Request::new(phase, params);
        write_frame(&mut self.writer, &serialize(&request.to_value()))?;
        debug!(target: CLIENT_TARGET, phase, "request sent");
        Ok(())
    }

    /// Reads the next acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the channel closes or the payload is not a
    /// valid acknowledgement.
    pub fn read_ack(&mut self) -> Result<Acknowledgement, ClientError> {
        let payload =
            read_frame(&mut self.reader, self.max_frame_bytes)?.ok_or(ClientError::ChannelClosed)?;
        let ack = Acknowledgement::from_value(decode_payload(&payload)?)?;
        debug!(target: CLIENT_TARGET, code = %ack.code(), "acknowledgement received");
        Ok(ack)
    }

    /// Sends one request and waits for its acknowledgement.
    ///
    /// Any code is returned as-is; callers decide what an `ERROR` means.
    ///
    /// # Errors
    ///
    /// See [`Controller::send`] and [`Controller::read_ack`].
    pub fn call(&mut self, phase: &str, params: Dict) -> Result<Acknowledgement, ClientError> {
        self.send(phase, params)?;
        self.read_ack()
    }

    /// Asks the daemon for its phase table.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnexpectedAck`] unless the daemon answers `OK`,
    /// plus any error from [`Controller::call`].
    pub fn query(&mut self) -> Result<Dict, ClientError> {
        let ack = self.call(QUERY_PHASE, Dict::new())?;
        if ack.code() != AckCode::Ok {
            return Err(ClientError::UnexpectedAck {
                code: ack.code(),
                message: ack.message().unwrap_or_default().to_owned(),
            });
        }
        Ok(ack.config().cloned().unwrap_or_default())
    }
}
