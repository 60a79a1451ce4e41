//! Per-host outbound request throttling.
//!
//! Each configured host gets a minimum interval between requests. Callers
//! reserve the next free slot for the host under a short-lived lock, then
//! sleep until that slot outside the lock, so concurrent callers for the
//! same host are spaced out and callers for different hosts never wait on
//! each other.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::config::RateLimitConfig;

/// Process-wide per-host rate limiter.
pub struct DomainRateLimiter {
    intervals: RwLock<HashMap<String, Duration>>,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl DomainRateLimiter {
    pub fn new(limits: &[RateLimitConfig]) -> Self {
        Self {
            intervals: RwLock::new(interval_table(limits)),
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the configured intervals (config reload). Request history is
    /// kept so a reload never lets a burst through.
    pub async fn replace_limits(&self, limits: &[RateLimitConfig]) {
        *self.intervals.write().await = interval_table(limits);
    }

    /// Wait until a request to `url`'s host is allowed, then claim it.
    ///
    /// Returns how long the caller waited. Hosts without a configured
    /// interval return immediately.
    pub async fn throttle(&self, url: &Url) -> Duration {
        let Some(host) = url.host_str() else {
            return Duration::ZERO;
        };
        let host = host.to_ascii_lowercase();

        let Some(interval) = self.intervals.read().await.get(&host).copied() else {
            return Duration::ZERO;
        };

        let now = Instant::now();
        let slot = {
            let mut last_request = self.last_request.lock().await;
            let slot = match last_request.get(&host) {
                Some(previous) => (*previous + interval).max(now),
                None => now,
            };
            last_request.insert(host.clone(), slot);
            slot
        };

        let wait = slot.saturating_duration_since(now);
        if !wait.is_zero() {
            debug!(%host, wait_ms = wait.as_millis() as u64, "Throttling upstream request");
            tokio::time::sleep_until(slot).await;
        }
        wait
    }
}

fn interval_table(limits: &[RateLimitConfig]) -> HashMap<String, Duration> {
    limits
        .iter()
        .map(|l| (l.host.to_ascii_lowercase(), l.min_interval))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(ms: u64) -> DomainRateLimiter {
        DomainRateLimiter::new(&[RateLimitConfig {
            host: "stats.example.com".into(),
            min_interval: Duration::from_millis(ms),
        }])
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_calls_are_spaced() {
        let limiter = limiter(500);
        let target = url("https://stats.example.com/events?date=2025-06-01");

        limiter.throttle(&target).await;
        let first_done = Instant::now();
        limiter.throttle(&target).await;
        let second_done = Instant::now();

        assert!(second_done - first_done >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_get_distinct_slots() {
        let limiter = Arc::new(limiter(500));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter
                        .throttle(&url("https://STATS.example.com/a"))
                        .await;
                    Instant::now()
                })
            })
            .collect();

        let mut done = Vec::new();
        for handle in handles {
            done.push(handle.await.unwrap() - start);
        }
        done.sort();
        assert!(done[1] - done[0] >= Duration::from_millis(500));
        assert!(done[2] - done[1] >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hosts_do_not_block_each_other() {
        let limiter = DomainRateLimiter::new(&[
            RateLimitConfig {
                host: "a.example.com".into(),
                min_interval: Duration::from_secs(10),
            },
            RateLimitConfig {
                host: "b.example.com".into(),
                min_interval: Duration::from_secs(10),
            },
        ]);
        let start = Instant::now();

        limiter.throttle(&url("https://a.example.com/x")).await;
        let waited = limiter.throttle(&url("https://b.example.com/x")).await;

        assert_eq!(waited, Duration::ZERO);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_host_is_not_throttled() {
        let limiter = limiter(500);
        let target = url("https://other.example.com/");
        assert_eq!(limiter.throttle(&target).await, Duration::ZERO);
        assert_eq!(limiter.throttle(&target).await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_elapsed_means_no_wait() {
        let limiter = limiter(500);
        let target = url("https://stats.example.com/");
        limiter.throttle(&target).await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(limiter.throttle(&target).await, Duration::ZERO);
    }
}
