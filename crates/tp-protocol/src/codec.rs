//! CBOR encoding for payloads and for the outer [`Message`] frame.
//!
//! Payloads (requests, responses) are encoded on their own and carried as the
//! opaque `content` of a frame, so a dispatcher can route a frame by
//! correlation id without knowing the payload type.

use crate::error::CodecError;
use crate::message::{Message, MessageType};

use bytes::{BufMut, Bytes, BytesMut};
use proven_correlation::CorrelationId;
use serde::{Serialize, de::DeserializeOwned};

/// Encodes a payload as CBOR.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<Bytes, CodecError> {
    let mut writer = BytesMut::new().writer();
    ciborium::ser::into_writer(value, &mut writer)?;
    Ok(writer.into_inner().freeze())
}

/// Decodes a CBOR payload.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if `data` is not a valid encoding of `T`.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    Ok(ciborium::de::from_reader(data)?)
}

/// Wraps an encoded payload in a frame tagged with `correlation_id`.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if the frame cannot be serialized.
pub fn frame(
    message_type: MessageType,
    correlation_id: CorrelationId,
    content: Bytes,
) -> Result<Bytes, CodecError> {
    encode(&Message {
        message_type,
        correlation_id,
        content,
    })
}

/// Reads a frame, leaving its payload encoded.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] if `data` is not a frame.
pub fn unframe(data: &[u8]) -> Result<Message, CodecError> {
    decode(data)
}
