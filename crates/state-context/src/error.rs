//! Error types for state context operations

use std::fmt;
use std::time::Duration;

use proven_tp_protocol::{CodecError, ConnectionError, MessageType, Rejection};
use thiserror::Error;

/// Operations a state context performs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Reading state entries
    GetState,
    /// Writing state entries
    SetState,
    /// Deleting state entries
    DeleteState,
    /// Appending receipt data
    AddReceiptData,
    /// Emitting an event
    AddEvent,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GetState => "get state",
            Self::SetState => "set state",
            Self::DeleteState => "delete state",
            Self::AddReceiptData => "add receipt data",
            Self::AddEvent => "add event",
        })
    }
}

/// State context errors
#[derive(Debug, Error)]
pub enum ContextError {
    /// The request could not be sent, or the connection went away before a
    /// response arrived
    #[error("{operation}: transport failure: {source}")]
    Transport {
        /// Operation that failed
        operation: Operation,
        /// Underlying connection error
        #[source]
        source: ConnectionError,
    },

    /// No response arrived in time
    #[error("{operation}: no response within {timeout:?}")]
    Timeout {
        /// Operation that failed
        operation: Operation,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// The validator answered with a non-OK status
    #[error("{operation}: rejected by validator: {status}")]
    Rejected {
        /// Operation that failed
        operation: Operation,
        /// Status reported by the validator
        status: Rejection,
    },

    /// The request could not be encoded
    #[error("{operation}: failed to encode request: {source}")]
    Encode {
        /// Operation that failed
        operation: Operation,
        /// Underlying codec error
        #[source]
        source: CodecError,
    },

    /// The response payload could not be decoded
    #[error("{operation}: failed to decode response: {source}")]
    Decode {
        /// Operation that failed
        operation: Operation,
        /// Underlying codec error
        #[source]
        source: CodecError,
    },

    /// The response has a different type than the request expects
    #[error("{operation}: expected {expected} response, got {actual}")]
    UnexpectedResponse {
        /// Operation that failed
        operation: Operation,
        /// Expected response type
        expected: MessageType,
        /// Received response type
        actual: MessageType,
    },
}

impl ContextError {
    /// The operation that failed.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Transport { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Encode { operation, .. }
            | Self::Decode { operation, .. }
            | Self::UnexpectedResponse { operation, .. } => *operation,
        }
    }

    /// The validator's status, if it rejected the request.
    #[must_use]
    pub const fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request timed out waiting for a response.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias
pub type ContextResult<T> = Result<T, ContextError>;
