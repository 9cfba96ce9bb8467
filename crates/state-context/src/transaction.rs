use crate::context::StateContext;
use crate::error::ContextResult;

use indexmap::IndexMap;
use proven_tp_protocol::Connection;

/// Object-safe view of a transaction's context, for handlers that should not
/// care which connection sits underneath.
pub trait TransactionContext {
    /// Reads the entries at `addresses`; addresses without a value are absent.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying request.
    fn get_state_entries(&self, addresses: &[String]) -> ContextResult<IndexMap<String, Vec<u8>>>;

    /// Writes `entries` in order, returning the addresses written.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying request.
    fn set_state_entries(&self, entries: Vec<(String, Vec<u8>)>) -> ContextResult<Vec<String>>;

    /// Deletes the entries at `addresses`, returning the addresses deleted.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying request.
    fn delete_state_entries(&self, addresses: &[String]) -> ContextResult<Vec<String>>;

    /// Appends opaque data to the transaction receipt.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying request.
    fn add_receipt_data(&self, data: &[u8]) -> ContextResult<()>;

    /// Emits an event.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying request.
    fn add_event(
        &self,
        event_type: String,
        attributes: Vec<(String, String)>,
        data: &[u8],
    ) -> ContextResult<()>;

    /// Reads a single entry.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying request.
    fn get_state_entry(&self, address: &str) -> ContextResult<Option<Vec<u8>>> {
        Ok(self
            .get_state_entries(&[address.to_string()])?
            .swap_remove(address))
    }

    /// Writes a single entry.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying request.
    fn set_state_entry(&self, address: String, data: Vec<u8>) -> ContextResult<()> {
        self.set_state_entries(vec![(address, data)]).map(|_| ())
    }

    /// Deletes a single entry, returning its address if the validator reports
    /// it deleted.
    ///
    /// # Errors
    ///
    /// Propagates any failure of the underlying request.
    fn delete_state_entry(&self, address: &str) -> ContextResult<Option<String>> {
        Ok(self
            .delete_state_entries(&[address.to_string()])?
            .into_iter()
            .next())
    }
}

impl<C: Connection> TransactionContext for StateContext<C> {
    fn get_state_entries(&self, addresses: &[String]) -> ContextResult<IndexMap<String, Vec<u8>>> {
        self.get_state(addresses.iter().cloned())
    }

    fn set_state_entries(&self, entries: Vec<(String, Vec<u8>)>) -> ContextResult<Vec<String>> {
        self.set_state(entries)
    }

    fn delete_state_entries(&self, addresses: &[String]) -> ContextResult<Vec<String>> {
        self.delete_state(addresses.iter().cloned())
    }

    fn add_receipt_data(&self, data: &[u8]) -> ContextResult<()> {
        Self::add_receipt_data(self, data.to_vec())
    }

    fn add_event(
        &self,
        event_type: String,
        attributes: Vec<(String, String)>,
        data: &[u8],
    ) -> ContextResult<()> {
        Self::add_event(self, event_type, attributes, data.to_vec())
    }
}
