//! Request/response translation for state operations.

use crate::config::ContextConfig;
use crate::error::{ContextError, ContextResult, Operation};

use std::time::Duration;

use indexmap::IndexMap;
use proven_correlation::WaitError;
use proven_tp_protocol::state_context::{
    TpEventAddRequest, TpReceiptAddDataRequest, TpStateDeleteRequest, TpStateEntry,
    TpStateGetRequest, TpStateSetRequest,
};
use proven_tp_protocol::{Connection, ConnectionError, Event, TpRequest, TpResponse, codec};
use tracing::debug;

/// Access to the state view of one transaction context.
///
/// Every request carries the context id the context was created with, so the
/// validator resolves addresses against the right state view. Each call sends
/// one request and blocks the calling thread until the response arrives or
/// the request timeout elapses. Nothing is retried: a repeated write is not
/// safe to re-issue blindly against a state view that may have moved on.
pub struct StateContext<C> {
    connection: C,
    context_id: String,
    timeout: Duration,
}

impl<C: Connection> StateContext<C> {
    /// Create a new state context with default configuration
    pub fn new(connection: C, context_id: impl Into<String>) -> Self {
        Self::with_config(connection, context_id, &ContextConfig::default())
    }

    /// Create a new state context from configuration
    pub fn with_config(
        connection: C,
        context_id: impl Into<String>,
        config: &ContextConfig,
    ) -> Self {
        Self {
            connection,
            context_id: context_id.into(),
            timeout: config.request_timeout(),
        }
    }

    /// Overrides how long each request waits for its response.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The context id attached to every request.
    #[must_use]
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// How long each request waits for its response.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &C {
        &self.connection
    }

    /// Reads the entries at `addresses`.
    ///
    /// Addresses with no value in the state view are absent from the result;
    /// that is not an error. Entries are returned in the order the validator
    /// sent them.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Rejected`] if the validator refuses the read,
    /// and a transport, timeout or decode error if no valid response arrives.
    pub fn get_state<I, A>(&self, addresses: I) -> ContextResult<IndexMap<String, Vec<u8>>>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let request = TpStateGetRequest {
            context_id: self.context_id.clone(),
            addresses: addresses.into_iter().map(Into::into).collect(),
        };

        let response = self.round_trip(Operation::GetState, &request)?;

        Ok(response
            .entries
            .into_iter()
            .map(|entry| (entry.address, entry.data))
            .collect())
    }

    /// Writes `entries` and returns the addresses the validator reports as
    /// written.
    ///
    /// Entries are sent in exactly the order `entries` yields them. Some
    /// backing stores apply writes to the same address in array order, so
    /// pass an ordered collection such as an [`IndexMap`] or a `Vec` of pairs.
    /// A returned list shorter than the input is passed through unchanged;
    /// interpreting a partial write is up to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Rejected`] if the validator refuses the write,
    /// and a transport, timeout or decode error if no valid response arrives.
    pub fn set_state<I, A, D>(&self, entries: I) -> ContextResult<Vec<String>>
    where
        I: IntoIterator<Item = (A, D)>,
        A: Into<String>,
        D: Into<Vec<u8>>,
    {
        let request = TpStateSetRequest {
            context_id: self.context_id.clone(),
            entries: entries
                .into_iter()
                .map(|(address, data)| TpStateEntry::new(address, data))
                .collect(),
        };

        Ok(self.round_trip(Operation::SetState, &request)?.addresses)
    }

    /// Deletes the entries at `addresses` and returns the addresses the
    /// validator reports as deleted. Same ordering and partial-result policy as
    /// [`StateContext::set_state`].
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Rejected`] if the validator refuses the delete,
    /// and a transport, timeout or decode error if no valid response arrives.
    pub fn delete_state<I, A>(&self, addresses: I) -> ContextResult<Vec<String>>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let request = TpStateDeleteRequest {
            context_id: self.context_id.clone(),
            addresses: addresses.into_iter().map(Into::into).collect(),
        };

        Ok(self.round_trip(Operation::DeleteState, &request)?.addresses)
    }

    /// Appends opaque data to the transaction receipt.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Rejected`] if the validator refuses the data,
    /// and a transport, timeout or decode error if no valid response arrives.
    pub fn add_receipt_data(&self, data: impl Into<Vec<u8>>) -> ContextResult<()> {
        let request = TpReceiptAddDataRequest {
            context_id: self.context_id.clone(),
            data: data.into(),
        };

        self.round_trip(Operation::AddReceiptData, &request)
            .map(|_| ())
    }

    /// Emits an event with `attributes` kept in caller order.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Rejected`] if the validator refuses the event,
    /// and a transport, timeout or decode error if no valid response arrives.
    pub fn add_event<I, K, V>(
        &self,
        event_type: impl Into<String>,
        attributes: I,
        data: impl Into<Vec<u8>>,
    ) -> ContextResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = TpEventAddRequest {
            context_id: self.context_id.clone(),
            event: Event::new(event_type, attributes, data),
        };

        self.round_trip(Operation::AddEvent, &request).map(|_| ())
    }

    /// Emits an event that carries no data.
    ///
    /// # Errors
    ///
    /// See [`StateContext::add_event`].
    pub fn add_event_without_data<I, K, V>(
        &self,
        event_type: impl Into<String>,
        attributes: I,
    ) -> ContextResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.add_event(event_type, attributes, Vec::new())
    }

    /// Sends `request`, waits for the matching response and checks its status.
    fn round_trip<R: TpRequest>(
        &self,
        operation: Operation,
        request: &R,
    ) -> ContextResult<R::Response> {
        let payload =
            codec::encode(request).map_err(|source| ContextError::Encode { operation, source })?;

        let pending = self
            .connection
            .send(R::MESSAGE_TYPE, payload)
            .map_err(|source| ContextError::Transport { operation, source })?;

        let correlation_id = pending.id();
        debug!(
            context_id = %self.context_id,
            %correlation_id,
            %operation,
            "sent {}", R::MESSAGE_TYPE
        );

        let envelope = pending.wait(self.timeout).map_err(|e| {
            debug!(context_id = %self.context_id, %correlation_id, %operation, "{}", e);
            match e {
                WaitError::Timeout { timeout, .. } => ContextError::Timeout { operation, timeout },
                WaitError::Cancelled(_) => ContextError::Transport {
                    operation,
                    source: ConnectionError::Closed,
                },
            }
        })?;

        let expected = <R::Response as TpResponse>::MESSAGE_TYPE;
        if envelope.message_type != expected {
            return Err(ContextError::UnexpectedResponse {
                operation,
                expected,
                actual: envelope.message_type,
            });
        }

        let response: R::Response = codec::decode(&envelope.payload)
            .map_err(|source| ContextError::Decode { operation, source })?;

        if let Some(status) = response.rejection() {
            debug!(
                context_id = %self.context_id,
                %correlation_id,
                %operation,
                "rejected: {}", status
            );
            return Err(ContextError::Rejected { operation, status });
        }

        debug!(context_id = %self.context_id, %correlation_id, %operation, "completed");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use parking_lot::Mutex;
    use proptest::prelude::*;
    use proven_correlation::{AsyncResult, CorrelationId};
    use proven_tp_protocol::state_context::{
        AppendStatus, StateStatus, TpEventAddResponse, TpReceiptAddDataResponse,
        TpStateDeleteResponse, TpStateGetResponse, TpStateSetResponse,
    };
    use proven_tp_protocol::{Bytes, EventAttribute, MessageType, Rejection, ResponseEnvelope};
    use serde::Serialize;
    use serde::de::DeserializeOwned;

    const CONTEXT_ID: &str = "test";

    /// Records every send and answers from a queue of canned responses.
    /// `None` in the queue leaves the request unanswered.
    #[derive(Default)]
    struct MockConnection {
        sent: Mutex<Vec<(MessageType, Bytes)>>,
        responses: Mutex<VecDeque<Option<ResponseEnvelope>>>,
    }

    impl MockConnection {
        fn respond_with<R: TpResponse + Serialize>(response: &R) -> Self {
            let connection = Self::default();
            connection.queue(response);
            connection
        }

        fn queue<R: TpResponse + Serialize>(&self, response: &R) {
            self.queue_envelope(ResponseEnvelope {
                message_type: R::MESSAGE_TYPE,
                payload: codec::encode(response).unwrap(),
            });
        }

        fn queue_envelope(&self, envelope: ResponseEnvelope) {
            self.responses.lock().push_back(Some(envelope));
        }

        fn unanswered() -> Self {
            let connection = Self::default();
            connection.responses.lock().push_back(None);
            connection
        }

        fn last_sent<T: DeserializeOwned>(&self, message_type: MessageType) -> T {
            let sent = self.sent.lock();
            let (sent_type, payload) = sent.last().expect("nothing sent");
            assert_eq!(*sent_type, message_type);
            codec::decode(payload).unwrap()
        }
    }

    impl Connection for MockConnection {
        fn send(
            &self,
            message_type: MessageType,
            payload: Bytes,
        ) -> Result<AsyncResult<ResponseEnvelope>, ConnectionError> {
            self.sent.lock().push((message_type, payload));

            let pending = AsyncResult::new(CorrelationId::new());
            match self.responses.lock().pop_front() {
                Some(Some(envelope)) => pending.resolve(envelope)?,
                Some(None) => {}
                None => return Err(ConnectionError::Closed),
            }
            Ok(pending)
        }
    }

    fn entries(pairs: &[(&str, &[u8])]) -> Vec<TpStateEntry> {
        pairs
            .iter()
            .map(|(address, data)| TpStateEntry::new(*address, data.to_vec()))
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_get_state() {
        let connection = MockConnection::respond_with(&TpStateGetResponse {
            entries: entries(&[("a", b"1"), ("c", b"3")]),
            status: StateStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        let state = context.get_state(["a", "b", "c"]).unwrap();

        let request: TpStateGetRequest = connection.last_sent(MessageType::TpStateGetRequest);
        assert_eq!(
            request,
            TpStateGetRequest {
                context_id: CONTEXT_ID.to_string(),
                addresses: strings(&["a", "b", "c"]),
            }
        );

        // The missing address is simply absent
        assert_eq!(state.len(), 2);
        assert_eq!(state["a"], b"1");
        assert_eq!(state["c"], b"3");
        assert!(!state.contains_key("b"));
    }

    #[test]
    fn test_set_state_preserves_order() {
        let connection = MockConnection::respond_with(&TpStateSetResponse {
            addresses: strings(&["a", "b", "c"]),
            status: StateStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        let mut state = IndexMap::new();
        state.insert("a", b"1".to_vec());
        state.insert("b", b"2".to_vec());
        state.insert("c", b"3".to_vec());

        let written = context.set_state(state).unwrap();

        let request: TpStateSetRequest = connection.last_sent(MessageType::TpStateSetRequest);
        assert_eq!(request.context_id, CONTEXT_ID);
        assert_eq!(request.entries, entries(&[("a", b"1"), ("b", b"2"), ("c", b"3")]));
        assert_eq!(written, strings(&["a", "b", "c"]));
    }

    #[test]
    fn test_set_state_does_not_sort() {
        let connection = MockConnection::respond_with(&TpStateSetResponse {
            addresses: strings(&["c", "a", "b"]),
            status: StateStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        context
            .set_state([
                ("c", b"3".to_vec()),
                ("a", b"1".to_vec()),
                ("b", b"2".to_vec()),
            ])
            .unwrap();

        let request: TpStateSetRequest = connection.last_sent(MessageType::TpStateSetRequest);
        assert_eq!(request.entries, entries(&[("c", b"3"), ("a", b"1"), ("b", b"2")]));
    }

    #[test]
    fn test_set_state_partial_result_is_returned() {
        let connection = MockConnection::respond_with(&TpStateSetResponse {
            addresses: strings(&["a"]),
            status: StateStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        let written = context
            .set_state([("a", b"1".to_vec()), ("b", b"2".to_vec())])
            .unwrap();

        assert_eq!(written, strings(&["a"]));
    }

    #[test]
    fn test_delete_state() {
        let connection = MockConnection::respond_with(&TpStateDeleteResponse {
            addresses: strings(&["a", "c"]),
            status: StateStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        let deleted = context.delete_state(["a", "b", "c"]).unwrap();

        let request: TpStateDeleteRequest =
            connection.last_sent(MessageType::TpStateDeleteRequest);
        assert_eq!(
            request,
            TpStateDeleteRequest {
                context_id: CONTEXT_ID.to_string(),
                addresses: strings(&["a", "b", "c"]),
            }
        );
        assert_eq!(deleted, strings(&["a", "c"]));
    }

    #[test]
    fn test_add_receipt_data() {
        let connection = MockConnection::respond_with(&TpReceiptAddDataResponse {
            status: AppendStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        context.add_receipt_data(b"test".to_vec()).unwrap();

        let request: TpReceiptAddDataRequest =
            connection.last_sent(MessageType::TpReceiptAddDataRequest);
        assert_eq!(
            request,
            TpReceiptAddDataRequest {
                context_id: CONTEXT_ID.to_string(),
                data: b"test".to_vec(),
            }
        );
    }

    #[test]
    fn test_add_event() {
        let connection = MockConnection::respond_with(&TpEventAddResponse {
            status: AppendStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        context.add_event("test", [("k", "v")], b"data".to_vec()).unwrap();

        let request: TpEventAddRequest = connection.last_sent(MessageType::TpEventAddRequest);
        assert_eq!(request.context_id, CONTEXT_ID);
        assert_eq!(
            request.event,
            Event {
                event_type: "test".to_string(),
                attributes: vec![EventAttribute {
                    key: "k".to_string(),
                    value: "v".to_string(),
                }],
                data: b"data".to_vec(),
            }
        );
    }

    #[test]
    fn test_add_event_without_data_sends_empty_bytes() {
        let connection = MockConnection::respond_with(&TpEventAddResponse {
            status: AppendStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        context
            .add_event_without_data("test", [("b", "2"), ("a", "1")])
            .unwrap();

        let request: TpEventAddRequest = connection.last_sent(MessageType::TpEventAddRequest);
        assert_eq!(request.event.data, Vec::<u8>::new());
        let keys: Vec<_> = request
            .event
            .attributes
            .iter()
            .map(|attribute| attribute.key.as_str())
            .collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_non_ok_status_is_rejected() {
        let connection = MockConnection::default();
        connection.queue(&TpStateGetResponse {
            entries: entries(&[("a", b"1")]),
            status: StateStatus::AuthorizationError,
        });
        connection.queue(&TpStateSetResponse {
            addresses: strings(&["a"]),
            status: StateStatus::AuthorizationError,
        });
        connection.queue(&TpStateDeleteResponse {
            addresses: vec![],
            status: StateStatus::StatusUnset,
        });
        connection.queue(&TpReceiptAddDataResponse {
            status: AppendStatus::Error,
        });
        connection.queue(&TpEventAddResponse {
            status: AppendStatus::Error,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        let err = context.get_state(["a"]).unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::AuthorizationError));
        assert_eq!(err.operation(), Operation::GetState);

        let err = context.set_state([("a", b"1".to_vec())]).unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::AuthorizationError));
        assert_eq!(err.operation(), Operation::SetState);

        let err = context.delete_state(["a"]).unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::StatusUnset));

        let err = context.add_receipt_data(b"r".to_vec()).unwrap_err();
        assert_eq!(err.rejection(), Some(Rejection::Error));

        let err = context
            .add_event("test", Vec::<(String, String)>::new(), Vec::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ContextError::Rejected {
                operation: Operation::AddEvent,
                status: Rejection::Error,
            }
        ));
    }

    #[test]
    fn test_timeout() {
        let connection = MockConnection::unanswered();
        let context =
            StateContext::new(&connection, CONTEXT_ID).with_timeout(Duration::from_millis(20));

        let err = context.get_state(["a"]).unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(
            err,
            ContextError::Timeout { timeout, .. } if timeout == Duration::from_millis(20)
        ));
    }

    #[test]
    fn test_send_failure_is_transport_error() {
        let connection = MockConnection::default();
        let context = StateContext::new(&connection, CONTEXT_ID);

        let err = context.add_receipt_data(b"r".to_vec()).unwrap_err();

        assert!(matches!(
            err,
            ContextError::Transport {
                operation: Operation::AddReceiptData,
                source: ConnectionError::Closed,
            }
        ));
    }

    #[test]
    fn test_unexpected_response_type() {
        let connection = MockConnection::respond_with(&TpStateSetResponse {
            addresses: vec![],
            status: StateStatus::Ok,
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        let err = context.get_state(["a"]).unwrap_err();

        assert!(matches!(
            err,
            ContextError::UnexpectedResponse {
                expected: MessageType::TpStateGetResponse,
                actual: MessageType::TpStateSetResponse,
                ..
            }
        ));
    }

    #[test]
    fn test_undecodable_response() {
        let connection = MockConnection::default();
        connection.queue_envelope(ResponseEnvelope {
            message_type: MessageType::TpStateGetResponse,
            payload: Bytes::from_static(&[0xFF, 0xFF]),
        });
        let context = StateContext::new(&connection, CONTEXT_ID);

        let err = context.get_state(["a"]).unwrap_err();

        assert!(matches!(err, ContextError::Decode { .. }));
    }

    #[test]
    fn test_timeout_from_config() {
        let connection = MockConnection::default();
        let config = ContextConfig {
            request_timeout_ms: 1500,
        };

        let context = StateContext::with_config(&connection, CONTEXT_ID, &config);

        assert_eq!(context.timeout(), Duration::from_millis(1500));
        assert_eq!(context.context_id(), CONTEXT_ID);
    }

    proptest! {
        #[test]
        fn test_set_state_sends_entries_in_input_order(
            pairs in proptest::collection::vec(
                ("[a-f0-9]{1,8}", proptest::collection::vec(any::<u8>(), 0..16)),
                0..24,
            )
        ) {
            let connection = MockConnection::respond_with(&TpStateSetResponse {
                addresses: vec![],
                status: StateStatus::Ok,
            });
            let context = StateContext::new(&connection, CONTEXT_ID);

            context.set_state(pairs.clone()).unwrap();

            let request: TpStateSetRequest = connection.last_sent(MessageType::TpStateSetRequest);
            let sent: Vec<(String, Vec<u8>)> = request
                .entries
                .into_iter()
                .map(|entry| (entry.address, entry.data))
                .collect();
            prop_assert_eq!(sent, pairs);
        }
    }
}
