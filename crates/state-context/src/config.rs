use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for state contexts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// How long a single request waits for its response, in milliseconds
    pub request_timeout_ms: u64,
}

impl ContextConfig {
    /// The request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000, // 10 seconds
        }
    }
}
