//! Request/response correlation for multiplexed message streams.
//!
//! Many requests can be in flight over a single connection and responses may
//! come back in any order. Each outbound request gets an [`AsyncResult`]
//! keyed by a [`CorrelationId`]; the inbound side hands every response to a
//! [`ResultRegistry`], which routes it to the one waiter registered under that
//! key.
//!
//! ```
//! use std::time::Duration;
//! use proven_correlation::{AsyncResult, CorrelationId, ResultRegistry};
//!
//! let registry = ResultRegistry::new();
//! let pending = AsyncResult::new(CorrelationId::new());
//! registry.put(&pending).unwrap();
//!
//! // Normally done by the connection's inbound dispatcher.
//! assert!(registry.resolve(pending.id(), "pong"));
//!
//! assert_eq!(pending.wait(Duration::from_secs(1)).unwrap(), "pong");
//! assert!(registry.is_empty());
//! ```
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod id;
mod registry;
mod result;

pub use error::{Error, Result, WaitError};
pub use id::CorrelationId;
pub use registry::ResultRegistry;
pub use result::AsyncResult;
