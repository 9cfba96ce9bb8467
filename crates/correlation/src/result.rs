//! Single-assignment result slot.

use crate::registry::Entries;
use crate::{CorrelationId, Error, Result, WaitError};

use std::fmt::{self, Debug};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

pub(crate) enum Slot<T> {
    Pending,
    Resolved(T),
    Cancelled,
}

/// State shared between the owning [`AsyncResult`] and the registry's
/// lookup reference.
pub(crate) struct Shared<T> {
    id: CorrelationId,
    slot: Mutex<Slot<T>>,
    changed: Condvar,
}

impl<T> Shared<T> {
    pub(crate) const fn id(&self) -> CorrelationId {
        self.id
    }

    pub(crate) fn resolve(&self, value: T) -> Result<()> {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return Err(Error::AlreadyResolved(self.id));
        }
        *slot = Slot::Resolved(value);
        drop(slot);

        self.changed.notify_all();
        Ok(())
    }

    pub(crate) fn cancel(&self) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            return false;
        }
        *slot = Slot::Cancelled;
        drop(slot);

        self.changed.notify_all();
        true
    }

    pub(crate) fn is_terminal(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Pending)
    }
}

/// The eventual outcome of one outstanding request.
///
/// Created unresolved, it transitions exactly once to either a resolved value
/// or a cancelled state and never changes afterwards. The handle is owned by
/// the caller that issued the request. A [`ResultRegistry`](crate::ResultRegistry)
/// only keeps a non-owning lookup reference, and dropping a registered handle
/// removes that reference, so a caller that gives up after a timeout leaves
/// nothing behind.
pub struct AsyncResult<T> {
    shared: Arc<Shared<T>>,
    registration: OnceLock<Weak<Entries<T>>>,
}

impl<T> AsyncResult<T> {
    /// Creates an unresolved result bound to `id`.
    #[must_use]
    pub fn new(id: CorrelationId) -> Self {
        Self {
            shared: Arc::new(Shared {
                id,
                slot: Mutex::new(Slot::Pending),
                changed: Condvar::new(),
            }),
            registration: OnceLock::new(),
        }
    }

    /// The correlation key this result is bound to.
    #[must_use]
    pub fn id(&self) -> CorrelationId {
        self.shared.id()
    }

    /// Stores `value` and wakes any waiter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyResolved`] if the result already reached a
    /// terminal state. The stored value is left untouched in that case.
    pub fn resolve(&self, value: T) -> Result<()> {
        self.shared.resolve(value)?;
        self.deregister();
        Ok(())
    }

    /// Cancels a pending result, waking any waiter with
    /// [`WaitError::Cancelled`]. Returns `false` if it was already terminal.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.cancel();
        if cancelled {
            self.deregister();
        }
        cancelled
    }

    /// Whether the result reached a terminal state. Does not block.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.shared.is_terminal()
    }

    /// Blocks until the result is resolved, cancelled, or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Timeout`] if the deadline passed first and
    /// [`WaitError::Cancelled`] if the result was cancelled.
    pub fn wait(&self, timeout: Duration) -> std::result::Result<T, WaitError>
    where
        T: Clone,
    {
        // A timeout too large to represent as an instant waits without a deadline.
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.shared.slot.lock();

        loop {
            match &*slot {
                Slot::Resolved(value) => return Ok(value.clone()),
                Slot::Cancelled => return Err(WaitError::Cancelled(self.id())),
                Slot::Pending => {}
            }

            let timed_out = match deadline {
                Some(deadline) => self.shared.changed.wait_until(&mut slot, deadline).timed_out(),
                None => {
                    self.shared.changed.wait(&mut slot);
                    false
                }
            };

            if timed_out && matches!(*slot, Slot::Pending) {
                return Err(WaitError::Timeout {
                    id: self.id(),
                    timeout,
                });
            }
        }
    }

    pub(crate) const fn shared(&self) -> &Arc<Shared<T>> {
        &self.shared
    }

    /// Records which registry holds the lookup reference. Returns `false` if
    /// the result was already bound to one.
    pub(crate) fn bind(&self, entries: &Arc<Entries<T>>) -> bool {
        self.registration.set(Arc::downgrade(entries)).is_ok()
    }

    /// Removes this result's registry entry, if it still has one.
    fn deregister(&self) {
        if let Some(entries) = self.registration.get().and_then(Weak::upgrade) {
            entries.release(&self.shared);
        }
    }
}

impl<T> Drop for AsyncResult<T> {
    fn drop(&mut self) {
        self.deregister();
    }
}

impl<T> Debug for AsyncResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("id", &self.id())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    #[test]
    fn test_new_result_is_unresolved() {
        let result: AsyncResult<u32> = AsyncResult::new(CorrelationId::new());

        assert!(!result.is_resolved());
        assert!(!result.is_resolved());
    }

    #[test]
    fn test_resolve_once() {
        let result = AsyncResult::new(CorrelationId::new());

        result.resolve(7).unwrap();

        assert!(result.is_resolved());
        assert!(result.is_resolved());
        assert_eq!(result.wait(Duration::ZERO).unwrap(), 7);
    }

    #[test]
    fn test_second_resolve_is_rejected() {
        let id = CorrelationId::new();
        let result = AsyncResult::new(id);

        result.resolve("first").unwrap();
        let err = result.resolve("second").unwrap_err();

        assert_eq!(err, Error::AlreadyResolved(id));
        assert_eq!(result.wait(Duration::ZERO).unwrap(), "first");
    }

    #[test]
    fn test_wait_times_out() {
        let id = CorrelationId::new();
        let result: AsyncResult<u32> = AsyncResult::new(id);
        let timeout = Duration::from_millis(50);

        let start = Instant::now();
        let err = result.wait(timeout).unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(err, WaitError::Timeout { id, timeout });
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(2));
        assert!(!result.is_resolved());
    }

    #[test]
    fn test_wait_wakes_on_resolve_from_other_thread() {
        let result = Arc::new(AsyncResult::new(CorrelationId::new()));

        let resolver = {
            let result = Arc::clone(&result);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                result.resolve(vec![1u8, 2, 3]).unwrap();
            })
        };

        let value = result.wait(Duration::from_secs(5)).unwrap();
        resolver.join().unwrap();

        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel_wakes_waiter() {
        let id = CorrelationId::new();
        let result: Arc<AsyncResult<u32>> = Arc::new(AsyncResult::new(id));

        let canceller = {
            let result = Arc::clone(&result);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                assert!(result.cancel());
            })
        };

        let err = result.wait(Duration::from_secs(5)).unwrap_err();
        canceller.join().unwrap();

        assert_eq!(err, WaitError::Cancelled(id));
        assert!(result.is_resolved());
        assert!(!result.cancel());
        assert_eq!(result.resolve(1), Err(Error::AlreadyResolved(id)));
    }

    #[test]
    fn test_multiple_waiters_see_same_value() {
        let result = Arc::new(AsyncResult::new(CorrelationId::new()));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let result = Arc::clone(&result);
                thread::spawn(move || result.wait(Duration::from_secs(5)))
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        result.resolve(42).unwrap();

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap().unwrap(), 42);
        }
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        let result = AsyncResult::new(CorrelationId::new());
        result.resolve(()).unwrap();

        assert!(result.wait(Duration::MAX).is_ok());
    }
}
