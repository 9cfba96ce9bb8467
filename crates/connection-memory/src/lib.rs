//! In-memory connection implementation for testing
//!
//! Routes messages between a transaction processor and a peer standing in for
//! the validator within the same process. The processor side is a full
//! [`Connection`]: it owns a response registry and an inbound dispatcher
//! thread, exactly like a socket-backed connection would.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::PeerError;

use std::fmt::{self, Debug};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use proven_correlation::{AsyncResult, CorrelationId};
use proven_tp_protocol::{
    Connection, ConnectionError, Message, MessageType, ResponseEnvelope, ResponseRegistry,
    TpResponse, codec,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Configuration for memory connections
#[derive(Debug, Clone)]
pub struct MemoryOptions {
    /// Capacity of the message queue in each direction
    pub queue_capacity: usize,
    /// Name given to the inbound dispatcher thread
    pub dispatcher_name: String,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            dispatcher_name: "tp-memory-dispatcher".to_string(),
        }
    }
}

/// Processor end of an in-memory connection.
///
/// Dropping the connection closes it and stops the dispatcher.
pub struct MemoryConnection {
    id: Uuid,
    sender: flume::Sender<Bytes>,
    registry: ResponseRegistry,
    closed: Arc<AtomicBool>,
    capacity: usize,
    shutdown: Option<flume::Sender<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl MemoryConnection {
    /// Creates a connected pair and starts the inbound dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatcher thread cannot be spawned.
    pub fn pair(options: MemoryOptions) -> Result<(Self, MemoryPeer), ConnectionError> {
        let (to_peer_tx, to_peer_rx) = flume::bounded(options.queue_capacity);
        let (to_processor_tx, to_processor_rx) = flume::bounded(options.queue_capacity);

        let id = Uuid::new_v4();
        let registry = ResponseRegistry::new();
        let closed = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = flume::bounded(0);

        let dispatcher = {
            let registry = registry.clone();
            let closed = Arc::clone(&closed);
            thread::Builder::new()
                .name(options.dispatcher_name)
                .spawn(move || {
                    dispatch(id, &to_processor_rx, &shutdown_rx, &registry, &closed);
                })?
        };

        info!("Memory connection {} established", id);

        let connection = Self {
            id,
            sender: to_peer_tx,
            registry,
            closed,
            capacity: options.queue_capacity,
            shutdown: Some(shutdown_tx),
            dispatcher: Some(dispatcher),
        };
        let peer = MemoryPeer {
            id,
            sender: to_processor_tx,
            receiver: to_peer_rx,
        };

        Ok((connection, peer))
    }

    /// Create a connected pair with default options
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatcher thread cannot be spawned.
    pub fn pair_default() -> Result<(Self, MemoryPeer), ConnectionError> {
        Self::pair(MemoryOptions::default())
    }

    /// Registry of results still waiting for a response.
    #[must_use]
    pub const fn registry(&self) -> &ResponseRegistry {
        &self.registry
    }

    /// Whether the connection is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the connection, failing every pending result.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let cancelled = self.registry.cancel_all();
            debug!(
                "Closed memory connection {}, cancelled {} pending results",
                self.id, cancelled
            );
        }
    }
}

impl Connection for MemoryConnection {
    fn send(
        &self,
        message_type: MessageType,
        payload: Bytes,
    ) -> Result<AsyncResult<ResponseEnvelope>, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        let correlation_id = CorrelationId::new();
        let pending = AsyncResult::new(correlation_id);
        self.registry.put(&pending)?;

        // The dispatcher marks the connection closed before cancelling, so a
        // result registered after that cancellation is caught here.
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        let data = codec::frame(message_type, correlation_id, payload)?;

        match self.sender.try_send(data) {
            Ok(()) => {
                debug!(
                    "Memory connection {} sent {} ({})",
                    self.id, message_type, correlation_id
                );
                Ok(pending)
            }
            Err(flume::TrySendError::Full(_)) => Err(ConnectionError::QueueFull {
                capacity: self.capacity,
            }),
            Err(flume::TrySendError::Disconnected(_)) => {
                self.close();
                Err(ConnectionError::Closed)
            }
        }
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.close();

        // Disconnecting the shutdown channel wakes the dispatcher
        drop(self.shutdown.take());
        if self
            .dispatcher
            .take()
            .is_some_and(|dispatcher| dispatcher.join().is_err())
        {
            warn!("Memory connection {} dispatcher panicked", self.id);
        }
    }
}

impl Debug for MemoryConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("pending", &self.registry.len())
            .finish()
    }
}

/// Inbound path: routes every response to its waiter until the peer goes away
/// or the connection is dropped.
fn dispatch(
    id: Uuid,
    receiver: &flume::Receiver<Bytes>,
    shutdown: &flume::Receiver<()>,
    registry: &ResponseRegistry,
    closed: &AtomicBool,
) {
    loop {
        let inbound = flume::Selector::new()
            .recv(receiver, Result::ok)
            .recv(shutdown, |_| None)
            .wait();
        let Some(data) = inbound else {
            break;
        };

        match codec::unframe(&data) {
            Ok(message) => {
                registry.resolve(message.correlation_id, message.into());
            }
            Err(e) => {
                warn!("Memory connection {} dropping undecodable message: {}", id, e);
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    let cancelled = registry.cancel_all();
    debug!(
        "Memory connection {} dispatcher stopped, cancelled {} pending results",
        id, cancelled
    );
}

/// Validator end of an in-memory connection.
pub struct MemoryPeer {
    id: Uuid,
    sender: flume::Sender<Bytes>,
    receiver: flume::Receiver<Bytes>,
}

impl MemoryPeer {
    /// Blocks until the processor sends a message.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Closed`] once the processor end is dropped.
    pub fn recv(&self) -> Result<Message, PeerError> {
        let data = self.receiver.recv().map_err(|_| PeerError::Closed)?;
        Ok(codec::unframe(&data)?)
    }

    /// Like [`MemoryPeer::recv`], giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Timeout`] if nothing arrived in time.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Message, PeerError> {
        let data = self
            .receiver
            .recv_timeout(timeout)
            .map_err(|e| match e {
                flume::RecvTimeoutError::Timeout => PeerError::Timeout(timeout),
                flume::RecvTimeoutError::Disconnected => PeerError::Closed,
            })?;
        Ok(codec::unframe(&data)?)
    }

    /// Answers `request` with an encoded response payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the processor end is gone.
    pub fn reply(
        &self,
        request: &Message,
        message_type: MessageType,
        content: Bytes,
    ) -> Result<(), PeerError> {
        self.send_raw(codec::frame(
            message_type,
            request.correlation_id,
            content,
        )?)
    }

    /// Answers `request` with a typed response.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the processor end is gone.
    pub fn respond<R>(&self, request: &Message, response: &R) -> Result<(), PeerError>
    where
        R: TpResponse + Serialize,
    {
        self.reply(request, R::MESSAGE_TYPE, codec::encode(response)?)
    }

    /// Sends an arbitrary message to the processor.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the processor end is gone.
    pub fn send(&self, message: &Message) -> Result<(), PeerError> {
        self.send_raw(codec::encode(message)?)
    }

    /// Sends raw bytes to the processor, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError::Closed`] if the processor end is gone.
    pub fn send_raw(&self, data: Bytes) -> Result<(), PeerError> {
        debug!("Memory peer {} sending {} bytes", self.id, data.len());
        self.sender.send(data).map_err(|_| PeerError::Closed)
    }
}

impl Debug for MemoryPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPeer").field("id", &self.id).finish()
    }
}
