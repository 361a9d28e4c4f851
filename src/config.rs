//! Configuration for the client

use serde::Deserialize;
use std::time::Duration;

/// Default socket read/write and connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Socket read/write and connect timeout in milliseconds
    /// (0 = use the 100 ms default)
    pub timeout_millis: u64,

    /// Maximum idle connections kept per backend address
    pub max_idle_per_addr: usize,

    /// Read buffer capacity per connection (bytes)
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_millis: DEFAULT_TIMEOUT.as_millis() as u64,
            max_idle_per_addr: 2,
            read_buffer_size: 8192,
        }
    }
}

impl ClientConfig {
    /// The effective I/O timeout, substituting the default for zero.
    pub(crate) fn timeout(&self) -> Duration {
        if self.timeout_millis == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_millis(self.timeout_millis)
        }
    }
}
