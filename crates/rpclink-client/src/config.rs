use std::fmt;
use std::time::Duration;

/// Delay between reconnect attempts after the transport is lost.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);
/// Delay between retries of envelopes waiting for a ready transport.
pub const DEFAULT_SEND_RETRY_INTERVAL: Duration = Duration::from_millis(1000);
/// Envelopes held while the transport is not ready.
pub const DEFAULT_MAX_QUEUED: usize = 1024;

/// Client tuning knobs.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// How often to retry opening a lost transport.
    pub reconnect_interval: Duration,
    /// How often queued envelopes are retried.
    pub send_retry_interval: Duration,
    /// Drop a queued envelope after this many failed retries. `None` retries forever.
    pub max_send_attempts: Option<u32>,
    /// Queue capacity; further sends are rejected with `QueueFull`.
    pub max_queued: usize,
    /// Re-send `subscribe` for every tracked channel after a reconnect.
    pub resubscribe_on_reconnect: bool,
    /// Opaque credential attached to every outgoing request and notification.
    /// Never logged.
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            send_retry_interval: DEFAULT_SEND_RETRY_INTERVAL,
            max_send_attempts: None,
            max_queued: DEFAULT_MAX_QUEUED,
            resubscribe_on_reconnect: false,
            token: None,
        }
    }
}

impl ClientConfig {
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_send_retry_interval(mut self, interval: Duration) -> Self {
        self.send_retry_interval = interval;
        self
    }

    pub fn with_max_send_attempts(mut self, attempts: u32) -> Self {
        self.max_send_attempts = Some(attempts);
        self
    }

    pub fn with_max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued;
        self
    }

    pub fn with_resubscribe_on_reconnect(mut self, enabled: bool) -> Self {
        self.resubscribe_on_reconnect = enabled;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("ClientConfig");
        dbg.field("reconnect_interval", &self.reconnect_interval)
            .field("send_retry_interval", &self.send_retry_interval)
            .field("max_send_attempts", &self.max_send_attempts)
            .field("max_queued", &self.max_queued)
            .field("resubscribe_on_reconnect", &self.resubscribe_on_reconnect);
        if let Some(token) = &self.token {
            dbg.field("token", &format_args!("<redacted:{} bytes>", token.len()));
        } else {
            dbg.field("token", &Option::<String>::None);
        }
        dbg.finish()
    }
}
