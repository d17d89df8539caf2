//! Session error taxonomy

use caster_sim_core::{GeometryError, QueryError, StoreError};
use thiserror::Error;

use crate::state::Phase;

/// Failure to hand a message to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer side of the transport is gone
    #[error("transport closed")]
    Closed,
    /// Write rejected by the transport
    #[error("transport write failed: {0}")]
    Write(String),
}

/// Errors produced while executing session commands.
///
/// Configuration and validation errors are reported to the client and the
/// session carries on; everything else ends the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Command issued in a state that does not satisfy its precondition
    #[error("'{command}' is not allowed while the session is {phase}")]
    Configuration {
        /// Wire name of the rejected command
        command: &'static str,
        /// Session phase at the time of the command
        phase: Phase,
    },

    /// Out-of-range argument or malformed payload
    #[error("invalid '{command}' request: {message}")]
    Validation {
        /// Wire name of the rejected message
        command: String,
        /// What was wrong with it
        message: String,
    },

    /// Field store invariant violated
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reply or snapshot could not be encoded
    #[error("failed to encode {what}: {source}")]
    Serialization {
        /// Record being encoded
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Repeated transport failures
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session worker panicked or was cancelled
    #[error("session worker failed: {0}")]
    Worker(String),
}

impl SessionError {
    /// Create a validation error for `command`.
    pub fn validation(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Map a geometry error into a validation error for `command`.
    pub fn geometry(command: &str, err: &GeometryError) -> Self {
        Self::validation(command, err.to_string())
    }

    /// Map a derived-data query error into a validation error for `command`.
    pub fn query(command: &str, err: &QueryError) -> Self {
        Self::validation(command, err.to_string())
    }

    /// Short kind tag used in error replies.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Configuration { .. } => "configuration",
            SessionError::Validation { .. } => "validation",
            SessionError::Store(_) => "store",
            SessionError::Serialization { .. } => "serialization",
            SessionError::Transport(_) => "transport",
            SessionError::Worker(_) => "worker",
        }
    }

    /// True for errors that are reported to the client without ending the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::Configuration { .. }
                | SessionError::Validation { .. }
                | SessionError::Serialization { .. }
        )
    }
}
