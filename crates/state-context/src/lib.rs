//! State access for transaction processors.
//!
//! A [`StateContext`] turns state, receipt and event operations into requests
//! for the validator, sends them over a shared [`Connection`], blocks until the
//! matching response arrives, and decodes it into a value or a
//! [`ContextError`].
//!
//! Many contexts, typically one per concurrently executing transaction, can
//! share one connection. Each call blocks only its own thread; responses are
//! routed back by correlation id regardless of arrival order.
//!
//! [`Connection`]: proven_tp_protocol::Connection
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod config;
mod context;
mod error;
mod transaction;

pub use config::ContextConfig;
pub use context::StateContext;
pub use error::{ContextError, ContextResult, Operation};
pub use transaction::TransactionContext;

pub use indexmap::IndexMap;
