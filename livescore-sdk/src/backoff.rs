//! Reconnect backoff policy for live stream consumers.

use std::time::Duration;

/// First reconnect delay, and the delay after any successful `init`.
pub const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(2);
/// Upper bound on the reconnect delay.
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);
/// Fixed delay after a failed poll. Never grows.
pub const POLL_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Exponential reconnect backoff: 2s, 4s, 8s, ... capped at 60s.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    next: Duration,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self {
            next: INITIAL_RECONNECT_DELAY,
        }
    }

    /// Returns the delay to wait now and doubles the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_RECONNECT_DELAY);
        delay
    }

    /// The delay the next call to [`next_delay`](Self::next_delay) will return.
    pub fn peek(&self) -> Duration {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = INITIAL_RECONNECT_DELAY;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new()
    }
}
