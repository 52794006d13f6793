//! Connection configuration.

use std::time::Duration;

/// Host used when the page host is unknown.
pub const DEFAULT_HOST: &str = "localhost:8000";

/// Fixed delay between a drop and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Longest a single write or close may block the connection task.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the `/ws` endpoint for a page served from `host`.
///
/// A page loaded over a secure transport talks `wss`, anything else `ws`.
pub fn endpoint_for_page(host: &str, secure: bool) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    let host = host.trim().trim_end_matches('/');
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    format!("{scheme}://{host}/ws")
}

/// Settings for a [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket URL to connect to.
    pub endpoint: String,
    /// How long to wait after a drop before reconnecting.
    pub reconnect_delay: Duration,
    /// A write that can't finish in this time drops the channel.
    pub send_timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn for_host(host: &str, secure: bool) -> Self {
        Self::new(endpoint_for_page(host, secure))
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_host(DEFAULT_HOST, false)
    }
}
