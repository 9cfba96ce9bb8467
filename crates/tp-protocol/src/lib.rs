//! Wire protocol spoken between a transaction processor and its validator.
//!
//! This crate defines:
//! - The message types and outer [`Message`] envelope carried on the stream
//! - Typed request/response payloads for state, receipt and event operations
//! - The CBOR [`codec`] used to encode them
//! - The [`Connection`] trait through which requests are sent
//!
//! Every response carries a status from a closed set. Each non-OK arm maps to
//! a [`Rejection`] at decode time so callers never branch on raw codes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod codec;
pub mod connection;
pub mod error;
pub mod events;
pub mod message;
pub mod state_context;

pub use connection::{Connection, ResponseRegistry};
pub use error::{CodecError, ConnectionError};
pub use events::{Event, EventAttribute};
pub use message::{Message, MessageType, Rejection, ResponseEnvelope, TpRequest, TpResponse};

// Re-export dependencies that are part of our public API
pub use bytes::Bytes;
pub use proven_correlation::{AsyncResult, CorrelationId};
