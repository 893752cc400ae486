//! Fatal engine errors.

use configfile::DecodeError;
use thiserror::Error;

use crate::frame::FrameError;

/// Conditions that stop the engine without an acknowledgement.
///
/// Each of these leaves the channel in an unknown state, so the daemon exits
/// with failure instead of replying.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The controller closed the channel between requests.
    #[error("control channel closed by the controller")]
    ChannelClosed,

    /// A frame could not be read or written.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// A request frame did not hold a decodable value.
    #[error("undecodable request payload: {0}")]
    Decode(#[from] DecodeError),
}
