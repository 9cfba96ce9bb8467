//! Error types for the protocol layer.

use std::io;

use thiserror::Error;

/// CBOR encoding failures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A value could not be written as CBOR.
    #[error("CBOR encode failed: {0}")]
    Encode(String),

    /// Bytes were not valid CBOR for the expected type.
    #[error("CBOR decode failed: {0}")]
    Decode(String),
}

/// Failures to hand a message to the transport.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection is closed or the stream went away.
    #[error("Connection closed")]
    Closed,

    /// The outbound queue is full.
    #[error("Outbound queue full ({capacity} messages)")]
    QueueFull {
        /// Capacity of the outbound queue.
        capacity: usize,
    },

    /// The outer message could not be encoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The pending result could not be registered.
    #[error("Registry error: {0}")]
    Registry(#[from] proven_correlation::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ciborium::de::Error<io::Error>> for CodecError {
    fn from(err: ciborium::de::Error<io::Error>) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<ciborium::ser::Error<io::Error>> for CodecError {
    fn from(err: ciborium::ser::Error<io::Error>) -> Self {
        Self::Encode(err.to_string())
    }
}
