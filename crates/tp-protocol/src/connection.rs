//! Connection abstraction for talking to a validator.
//!
//! Implementations own the physical stream and exactly one
//! [`ResponseRegistry`]. Sending assigns a correlation id, registers an
//! [`AsyncResult`] under it and hands the message to the stream. A separate
//! inbound path resolves the registry whenever a response tagged with that id
//! arrives.

use crate::error::ConnectionError;
use crate::message::{MessageType, ResponseEnvelope};

use std::sync::Arc;

use bytes::Bytes;
use proven_correlation::{AsyncResult, ResultRegistry};

/// Registry of pending results a connection resolves responses into.
pub type ResponseRegistry = ResultRegistry<ResponseEnvelope>;

/// A bidirectional, multiplexed message stream to a validator.
///
/// `send` must return as soon as the message has been handed to the transport;
/// waiting for the response happens on the returned [`AsyncResult`].
/// Implementations serialize their own writes to the stream if the
/// transport is not safe for concurrent writers.
pub trait Connection: Send + Sync {
    /// Sends `payload` as a message of type `message_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed to the transport or
    /// the pending result could not be registered.
    fn send(
        &self,
        message_type: MessageType,
        payload: Bytes,
    ) -> Result<AsyncResult<ResponseEnvelope>, ConnectionError>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn send(
        &self,
        message_type: MessageType,
        payload: Bytes,
    ) -> Result<AsyncResult<ResponseEnvelope>, ConnectionError> {
        (**self).send(message_type, payload)
    }
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn send(
        &self,
        message_type: MessageType,
        payload: Bytes,
    ) -> Result<AsyncResult<ResponseEnvelope>, ConnectionError> {
        (**self).send(message_type, payload)
    }
}
