//! Message types and envelopes.

use std::fmt;

use bytes::Bytes;
use proven_correlation::CorrelationId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Type tag of every message exchanged with the validator. Each request type
/// has exactly one matching response type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Read state entries.
    TpStateGetRequest,
    /// Reply to [`MessageType::TpStateGetRequest`].
    TpStateGetResponse,
    /// Write state entries.
    TpStateSetRequest,
    /// Reply to [`MessageType::TpStateSetRequest`].
    TpStateSetResponse,
    /// Delete state entries.
    TpStateDeleteRequest,
    /// Reply to [`MessageType::TpStateDeleteRequest`].
    TpStateDeleteResponse,
    /// Append opaque data to the transaction receipt.
    TpReceiptAddDataRequest,
    /// Reply to [`MessageType::TpReceiptAddDataRequest`].
    TpReceiptAddDataResponse,
    /// Emit an event.
    TpEventAddRequest,
    /// Reply to [`MessageType::TpEventAddRequest`].
    TpEventAddResponse,
}

impl MessageType {
    /// Wire name of the message type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TpStateGetRequest => "TP_STATE_GET_REQUEST",
            Self::TpStateGetResponse => "TP_STATE_GET_RESPONSE",
            Self::TpStateSetRequest => "TP_STATE_SET_REQUEST",
            Self::TpStateSetResponse => "TP_STATE_SET_RESPONSE",
            Self::TpStateDeleteRequest => "TP_STATE_DELETE_REQUEST",
            Self::TpStateDeleteResponse => "TP_STATE_DELETE_RESPONSE",
            Self::TpReceiptAddDataRequest => "TP_RECEIPT_ADD_DATA_REQUEST",
            Self::TpReceiptAddDataResponse => "TP_RECEIPT_ADD_DATA_RESPONSE",
            Self::TpEventAddRequest => "TP_EVENT_ADD_REQUEST",
            Self::TpEventAddResponse => "TP_EVENT_ADD_RESPONSE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outer envelope of every message on the stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Type of the encoded content.
    pub message_type: MessageType,
    /// Key shared by a request and its response.
    pub correlation_id: CorrelationId,
    /// Encoded request or response payload.
    pub content: Bytes,
}

/// A response as delivered to the waiting caller, before payload decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Type of the response.
    pub message_type: MessageType,
    /// Encoded response payload.
    pub payload: Bytes,
}

impl From<Message> for ResponseEnvelope {
    fn from(message: Message) -> Self {
        Self {
            message_type: message.message_type,
            payload: message.content,
        }
    }
}

/// Non-OK outcomes a validator can report for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The response carried no status.
    StatusUnset,
    /// The transaction is not authorized to access one of the addresses.
    AuthorizationError,
    /// The validator could not apply the request.
    Error,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StatusUnset => "status unset",
            Self::AuthorizationError => "authorization error",
            Self::Error => "error",
        })
    }
}

/// A request payload, tied to its message type and response.
pub trait TpRequest: Serialize {
    /// Message type the request is sent as.
    const MESSAGE_TYPE: MessageType;

    /// Response expected for this request.
    type Response: TpResponse;
}

/// A response payload carrying a status.
pub trait TpResponse: DeserializeOwned {
    /// Message type the response arrives as.
    const MESSAGE_TYPE: MessageType;

    /// The non-OK outcome reported by the response, if any.
    fn rejection(&self) -> Option<Rejection>;
}
