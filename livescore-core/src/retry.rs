//! Bounded exponential-backoff retry for upstream fetches.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `retries + 1` attempts in total.
    pub retries: u32,
    /// Delay after the first failed attempt. Doubles after each further one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based):
    /// `base_delay * 2^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Run `op` until it succeeds or `policy.retries` retries are exhausted.
///
/// Returns the first success, or the error of the last attempt unchanged.
pub async fn with_retry<T, E, F, Fut>(label: &str, policy: RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    with_retry_if(label, policy, op, |_| true).await
}

/// Like [`with_retry`], but gives up immediately on errors for which
/// `should_retry` returns `false`.
pub async fn with_retry_if<T, E, F, Fut, P>(
    label: &str,
    policy: RetryPolicy,
    mut op: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt <= policy.retries && should_retry(&e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    %label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let delays: Vec<u128> = (1..=4).map(|a| policy.delay_after(a).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_op_is_attempted_retries_plus_one_times() {
        let calls = AtomicU32::new(0);
        let stamps = Mutex::new(Vec::new());
        let policy = RetryPolicy::new(2, Duration::from_millis(100));

        let result: Result<(), String> = with_retry("test", policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            stamps.lock().unwrap().push(Instant::now());
            async move { Err(format!("failure #{n}")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "failure #3");

        let stamps = stamps.into_inner().unwrap();
        let first_wait = stamps[1] - stamps[0];
        let second_wait = stamps[2] - stamps[1];
        assert!(first_wait >= Duration::from_millis(100) && first_wait < Duration::from_millis(110));
        assert!(second_wait >= Duration::from_millis(200) && second_wait < Duration::from_millis(210));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_stops_retrying() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(100));

        let result: Result<u32, String> = with_retry("test", policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { if n < 2 { Err("flaky".to_string()) } else { Ok(n) } }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<(), &str> = with_retry("test", RetryPolicy::new(0, Duration::from_secs(1)), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = with_retry_if(
            "test",
            RetryPolicy::new(3, Duration::from_millis(10)),
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("bad payload") }
            },
            |e| *e != "bad payload",
        )
        .await;

        assert_eq!(result, Err("bad payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
