//! Events emitted by transactions.

use serde::{Deserialize, Serialize};

/// A key/value attribute of an [`Event`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value.
    pub value: String,
}

/// An event emitted during transaction execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Subscription filter type of the event.
    pub event_type: String,
    /// Attributes, in the order the transaction supplied them.
    pub attributes: Vec<EventAttribute>,
    /// Opaque payload. Empty when the event has no data.
    #[serde(with = "serde_bytes", default)]
    pub data: Vec<u8>,
}

impl Event {
    /// Builds an event, keeping `attributes` in iteration order.
    pub fn new<I, K, V>(
        event_type: impl Into<String>,
        attributes: I,
        data: impl Into<Vec<u8>>,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            event_type: event_type.into(),
            attributes: attributes
                .into_iter()
                .map(|(key, value)| EventAttribute {
                    key: key.into(),
                    value: value.into(),
                })
                .collect(),
            data: data.into(),
        }
    }
}
