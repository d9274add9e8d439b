//! Transport configuration.

use std::fmt;
use std::time::Duration;

/// Default Bot API server.
pub const DEFAULT_SERVER: &str = "https://api.telegram.org";

/// Settings for [`HttpTransport`](crate::HttpTransport).
#[derive(Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Bot API base URL, without trailing `/bot<token>`.
    pub server: String,
    /// Bot token.
    pub token: String,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout: Duration,
    /// Maximum number of queued outbound calls.
    pub tx_queue_len: usize,
    /// Pause between failed `getMe` handshakes.
    pub handshake_retry: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            token: String::new(),
            poll_timeout: Duration::from_secs(60),
            tx_queue_len: 5,
            handshake_retry: Duration::from_secs(5),
        }
    }
}

impl HttpTransportConfig {
    /// Creates a configuration for the default server.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Sets the server URL.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Sets the long-poll timeout.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Sets the outbound queue length.
    pub fn tx_queue_len(mut self, len: usize) -> Self {
        self.tx_queue_len = len;
        self
    }

    /// Sets the handshake retry pause.
    pub fn handshake_retry(mut self, retry: Duration) -> Self {
        self.handshake_retry = retry;
        self
    }
}

impl fmt::Debug for HttpTransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransportConfig")
            .field("server", &self.server)
            .field("token", &"<redacted>")
            .field("poll_timeout", &self.poll_timeout)
            .field("tx_queue_len", &self.tx_queue_len)
            .field("handshake_retry", &self.handshake_retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let config = HttpTransportConfig::new("123:SECRET").tx_queue_len(2);
        let printed = format!("{config:?}");
        assert!(!printed.contains("SECRET"));
        assert!(printed.contains("tx_queue_len: 2"));
    }
}
