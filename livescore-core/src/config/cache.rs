//! Cache tier configuration.

use std::time::Duration;

/// Default TTLs for the cache tiers and the stale fallback store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Live, per-event data.
    pub short_ttl: Duration,
    /// Aggregates that change a few times an hour.
    pub medium_ttl: Duration,
    /// Schedules and settled results.
    pub long_ttl: Duration,
    /// Last-known-good fallback; long enough to bridge an upstream outage.
    pub stale_ttl: Duration,
    /// How often expired entries are swept from memory.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            short_ttl: Duration::from_secs(30),
            medium_ttl: Duration::from_secs(5 * 60),
            long_ttl: Duration::from_secs(15 * 60),
            stale_ttl: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}
