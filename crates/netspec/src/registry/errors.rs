//! Errors raised while registering or running phases.

use std::io;
use std::sync::Arc;

use configspec::SpecError;
use thiserror::Error;

use crate::engine::AckError;

/// Errors raised while building a [`PhaseRegistry`](super::PhaseRegistry).
///
/// Registration errors stay inside the daemon; they are never sent to the
/// controller.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A phase with the same name is already registered.
    #[error("phase '{name}' is already registered")]
    Duplicate {
        /// Name of the rejected phase.
        name: String,
    },

    /// The phase name was empty.
    #[error("phase names must not be empty")]
    EmptyName,

    /// The phase spec was malformed.
    #[error("phase '{name}' has an invalid spec: {source}")]
    InvalidSpec {
        /// Name of the rejected phase.
        name: String,
        /// Why the spec was rejected.
        #[source]
        source: SpecError,
    },
}

/// Failure reported by a phase handler.
///
/// When a handler returns one of these without having acknowledged, the
/// engine answers with `ERROR` and the error text, then terminates.
#[derive(Debug, Clone, Error)]
pub enum PhaseError {
    /// The phase could not do its work.
    #[error("{message}")]
    Failed {
        /// Human-readable description of the failure.
        message: String,
    },

    /// An I/O operation performed by the phase failed.
    #[error("{context}: {source}")]
    Io {
        /// What the phase was doing.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Sending the acknowledgement failed.
    #[error(transparent)]
    Acknowledge(#[from] AckError),
}

impl PhaseError {
    /// Creates a [`PhaseError::Failed`] error.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Creates a [`PhaseError::Io`] error.
    #[must_use]
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }
}
