//! Length-prefixed framing for the control channel.
//!
//! A frame is a `u32` little-endian payload length followed by exactly that
//! many payload bytes. The same framing is used in both directions.

#![expect(
    clippy::little_endian_bytes,
    reason = "frame lengths are little-endian on every host"
)]

use std::io::{self, Read, Write};
use std::sync::Arc;

use thiserror::Error;

/// Size of the length prefix preceding every frame payload.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Errors raised while reading or writing frames.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    /// The stream ended part-way through a length prefix.
    #[error("channel closed after {read} of 4 length prefix bytes")]
    TruncatedLength {
        /// Prefix bytes received before the stream ended.
        read: usize,
    },

    /// The stream ended part-way through a payload.
    #[error("channel closed after {read} of {expected} payload bytes")]
    TruncatedPayload {
        /// Payload length announced by the prefix.
        expected: usize,
        /// Payload bytes received before the stream ended.
        read: usize,
    },

    /// The announced payload length exceeds the configured limit.
    #[error("frame of {length} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Payload length announced by the prefix.
        length: u32,
        /// Configured limit.
        limit: u32,
    },

    /// A payload is too long to be described by a `u32` prefix.
    #[error("payload of {length} bytes cannot be framed")]
    PayloadTooLong {
        /// Length of the payload.
        length: usize,
    },

    /// The underlying channel failed.
    #[error("channel I/O failed: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl From<io::Error> for FrameError {
    fn from(error: io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}

/// Reads one frame payload.
///
/// Returns `Ok(None)` when the stream ends cleanly before the first byte of a
/// frame.
///
/// # Errors
///
/// Returns [`FrameError`] when the stream ends inside a frame, the announced
/// length exceeds `limit`, or the reader fails.
pub fn read_frame<R: Read + ?Sized>(
    reader: &mut R,
    limit: u32,
) -> Result<Option<Vec<u8>>, FrameError> {
    let mut prefix = [0_u8; LENGTH_PREFIX_BYTES];
    match read_full(reader, &mut prefix)? {
        0 => return Ok(None),
        LENGTH_PREFIX_BYTES => {}
        read => return Err(FrameError::TruncatedLength { read }),
    }

    let length = u32::from_le_bytes(prefix);
    if length > limit {
        return Err(FrameError::TooLarge { length, limit });
    }

    let expected = usize::try_from(length).map_err(|_| FrameError::TooLarge { length, limit })?;
    let mut payload = vec![0_u8; expected];
    let read = read_full(reader, &mut payload)?;
    if read < expected {
        return Err(FrameError::TruncatedPayload { expected, read });
    }
    Ok(Some(payload))
}

/// Writes one frame and flushes the writer.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLong`] for payloads beyond `u32::MAX`
/// bytes and [`FrameError::Io`] if writing fails.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let length = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLong {
        length: payload.len(),
    })?;
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Fills `buf` unless the stream ends first, returning the bytes read.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FrameError> {
    let mut filled = 0;
    while let Some(rest) = buf.get_mut(filled..) {
        if rest.is_empty() {
            break;
        }
        match reader.read(rest) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests;
