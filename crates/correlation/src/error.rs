//! Error types for result correlation.

use crate::CorrelationId;

use std::time::Duration;

use thiserror::Error;

/// Result type alias for registry and resolution operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Misuse of a result or registry. These indicate programming errors in the
/// caller, not conditions of the remote side.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A live result is already registered under this key.
    #[error("correlation id {0} already has a pending result")]
    DuplicateKey(CorrelationId),

    /// The result already reached a terminal state.
    #[error("result for correlation id {0} was already resolved")]
    AlreadyResolved(CorrelationId),

    /// The result is registered with a different registry.
    #[error("result for correlation id {0} belongs to another registry")]
    ForeignRegistry(CorrelationId),
}

/// Why a wait ended without a value.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WaitError {
    /// No response arrived before the deadline.
    #[error("no response for {id} within {timeout:?}")]
    Timeout {
        /// Key of the result that was waited on.
        id: CorrelationId,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The result was cancelled, typically because the connection went away.
    #[error("result for {0} was cancelled before a response arrived")]
    Cancelled(CorrelationId),
}
