//! Keyed registry routing inbound responses to their waiters.

use crate::result::Shared;
use crate::{AsyncResult, CorrelationId, Error, Result};

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

/// The lock-protected map. Only the map is guarded; waiting on a result never
/// happens while this lock is held.
pub(crate) struct Entries<T> {
    map: Mutex<HashMap<CorrelationId, Weak<Shared<T>>>>,
}

impl<T> Entries<T> {
    /// Removes the entry for `shared` if it still points at that slot.
    pub(crate) fn release(&self, shared: &Arc<Shared<T>>) {
        let id = shared.id();
        let mut map = self.map.lock();

        let owned = map
            .get(&id)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(shared)));
        if owned {
            map.remove(&id);
        }
        drop(map);

        if owned && !shared.is_terminal() {
            debug!(correlation_id = %id, "pending result abandoned by its owner");
        }
    }
}

/// Thread-safe map from correlation key to pending [`AsyncResult`].
///
/// Cloning the registry yields another handle to the same map, so the sending
/// side and the inbound dispatcher of one connection can share it. Each
/// connection owns exactly one registry.
pub struct ResultRegistry<T> {
    entries: Arc<Entries<T>>,
}

impl<T> ResultRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Entries {
                map: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers `result` under its correlation id.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateKey`] if a live result is already registered under
    ///   the same id.
    /// - [`Error::AlreadyResolved`] if `result` already reached a terminal state.
    /// - [`Error::ForeignRegistry`] if `result` is registered elsewhere.
    pub fn put(&self, result: &AsyncResult<T>) -> Result<()> {
        let id = result.id();
        if result.is_resolved() {
            return Err(Error::AlreadyResolved(id));
        }

        let mut map = self.entries.map.lock();

        // An entry whose result already completed is vacant.
        let occupied = map
            .get(&id)
            .and_then(Weak::upgrade)
            .is_some_and(|existing| !existing.is_terminal());
        if occupied {
            return Err(Error::DuplicateKey(id));
        }

        if !result.bind(&self.entries) {
            return Err(Error::ForeignRegistry(id));
        }

        map.insert(id, Arc::downgrade(result.shared()));
        drop(map);

        debug!(correlation_id = %id, "registered pending result");
        Ok(())
    }

    /// Delivers `value` to the result registered under `id` and removes the
    /// entry.
    ///
    /// Returns `false` when there is nothing to deliver to: the id is unknown,
    /// its owner already gave up, or it was resolved through another path.
    /// Such responses are logged and dropped; this never fails, since the
    /// caller is typically an inbound dispatcher serving every in-flight
    /// request on the connection.
    pub fn resolve(&self, id: CorrelationId, value: T) -> bool {
        let entry = self.entries.map.lock().remove(&id);

        let Some(shared) = entry.and_then(|weak| weak.upgrade()) else {
            warn!(correlation_id = %id, "dropping response with no pending result");
            return false;
        };

        match shared.resolve(value) {
            Ok(()) => {
                debug!(correlation_id = %id, "resolved pending result");
                true
            }
            Err(e) => {
                warn!(correlation_id = %id, "dropping response: {}", e);
                false
            }
        }
    }

    /// Cancels every pending result and empties the registry. Waiters wake with
    /// [`WaitError::Cancelled`](crate::WaitError::Cancelled). Returns how many
    /// results were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.entries.map.lock().drain().collect();

        let cancelled = drained
            .into_iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .filter(|shared| shared.cancel())
            .count();

        if cancelled > 0 {
            debug!("cancelled {} pending results", cancelled);
        }

        cancelled
    }

    /// Whether a result is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: CorrelationId) -> bool {
        self.entries.map.lock().contains_key(&id)
    }

    /// Number of registered results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.map.lock().len()
    }

    /// Whether no results are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.map.lock().is_empty()
    }
}

impl<T> Clone for ResultRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for ResultRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for ResultRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultRegistry")
            .field("pending", &self.len())
            .finish()
    }
}
