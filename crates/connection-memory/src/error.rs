use std::time::Duration;

use proven_tp_protocol::CodecError;
use thiserror::Error;

/// Errors seen by the peer end of a memory connection.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The connection end was dropped.
    #[error("Connection closed")]
    Closed,

    /// No message arrived in time.
    #[error("No message within {0:?}")]
    Timeout(Duration),

    /// A message could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}
