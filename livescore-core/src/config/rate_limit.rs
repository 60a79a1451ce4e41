//! Per-host rate limit configuration.

use std::time::Duration;

/// Minimum spacing between requests to one upstream host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub host: String,
    pub min_interval: Duration,
}
