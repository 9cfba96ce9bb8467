//! Request and response payloads for state, receipt and event operations.
//!
//! All requests carry the context id the validator uses to pick the state
//! view a transaction executes against.

use crate::events::Event;
use crate::message::{MessageType, Rejection, TpRequest, TpResponse};

use serde::{Deserialize, Serialize};

/// One unit of remote key-value state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpStateEntry {
    /// Address of the entry in the state store.
    pub address: String,
    /// Stored bytes.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl TpStateEntry {
    /// Creates an entry.
    pub fn new(address: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            address: address.into(),
            data: data.into(),
        }
    }
}

/// Status of a state get, set or delete response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateStatus {
    /// No status was set.
    #[default]
    StatusUnset,
    /// The request was applied.
    Ok,
    /// An address is outside the transaction's declared inputs or outputs.
    AuthorizationError,
}

impl StateStatus {
    /// Maps the status to a rejection, `None` for [`StateStatus::Ok`].
    #[must_use]
    pub const fn rejection(self) -> Option<Rejection> {
        match self {
            Self::Ok => None,
            Self::StatusUnset => Some(Rejection::StatusUnset),
            Self::AuthorizationError => Some(Rejection::AuthorizationError),
        }
    }
}

/// Status of a receipt or event response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppendStatus {
    /// No status was set.
    #[default]
    StatusUnset,
    /// The data was appended.
    Ok,
    /// The validator refused the data.
    Error,
}

impl AppendStatus {
    /// Maps the status to a rejection, `None` for [`AppendStatus::Ok`].
    #[must_use]
    pub const fn rejection(self) -> Option<Rejection> {
        match self {
            Self::Ok => None,
            Self::StatusUnset => Some(Rejection::StatusUnset),
            Self::Error => Some(Rejection::Error),
        }
    }
}

/// Reads the entries at `addresses`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpStateGetRequest {
    /// State view to read from.
    pub context_id: String,
    /// Addresses to read, in caller order.
    pub addresses: Vec<String>,
}

/// Entries found for a [`TpStateGetRequest`]. Addresses with no value in the
/// state view are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpStateGetResponse {
    /// Entries that exist.
    #[serde(default)]
    pub entries: Vec<TpStateEntry>,
    /// Outcome of the request.
    #[serde(default)]
    pub status: StateStatus,
}

/// Writes `entries`, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpStateSetRequest {
    /// State view to write to.
    pub context_id: String,
    /// Entries to write. Later entries for the same address win.
    pub entries: Vec<TpStateEntry>,
}

/// Addresses written by a [`TpStateSetRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpStateSetResponse {
    /// Addresses that were written.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Outcome of the request.
    #[serde(default)]
    pub status: StateStatus,
}

/// Deletes the entries at `addresses`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpStateDeleteRequest {
    /// State view to delete from.
    pub context_id: String,
    /// Addresses to delete, in caller order.
    pub addresses: Vec<String>,
}

/// Addresses deleted by a [`TpStateDeleteRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpStateDeleteResponse {
    /// Addresses that were deleted.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Outcome of the request.
    #[serde(default)]
    pub status: StateStatus,
}

/// Appends opaque data to the transaction receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpReceiptAddDataRequest {
    /// Transaction context the receipt belongs to.
    pub context_id: String,
    /// Data to append.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Reply to a [`TpReceiptAddDataRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpReceiptAddDataResponse {
    /// Outcome of the request.
    #[serde(default)]
    pub status: AppendStatus,
}

/// Emits `event` for the transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpEventAddRequest {
    /// Transaction context emitting the event.
    pub context_id: String,
    /// The event.
    pub event: Event,
}

/// Reply to a [`TpEventAddRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpEventAddResponse {
    /// Outcome of the request.
    #[serde(default)]
    pub status: AppendStatus,
}

macro_rules! request_response {
    ($request:ident => $response:ident) => {
        impl TpRequest for $request {
            const MESSAGE_TYPE: MessageType = MessageType::$request;

            type Response = $response;
        }

        impl TpResponse for $response {
            const MESSAGE_TYPE: MessageType = MessageType::$response;

            fn rejection(&self) -> Option<Rejection> {
                self.status.rejection()
            }
        }
    };
}

request_response!(TpStateGetRequest => TpStateGetResponse);
request_response!(TpStateSetRequest => TpStateSetResponse);
request_response!(TpStateDeleteRequest => TpStateDeleteResponse);
request_response!(TpReceiptAddDataRequest => TpReceiptAddDataResponse);
request_response!(TpEventAddRequest => TpEventAddResponse);
