//! The fan-out/fan-in aggregation pass.
//!
//! [`Aggregator::build_result`] fetches every source concurrently, each in
//! its own failure domain, and merges the outcomes in priority order:
//!
//! - success with games: a fresh league group;
//! - success without games: an empty group if the source is `always_show`,
//!   otherwise nothing;
//! - failure: the last-known-good games from the stale store marked
//!   `stale`, or an error group with no games.
//!
//! A pass never fails as a whole. Sources that succeeded are written to
//! the stale store once the pass has settled.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::join_all;
use livescore_sdk::objects::{
    AggregationResult, Event, EventDetail, LeagueGroup, SourceHealthReport,
};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::cache::{Tier, TieredCache};
use crate::config::{CacheConfig, RateLimitConfig, RetryPolicy};
use crate::health::SourceHealthTracker;
use crate::rate_limit::DomainRateLimiter;
use crate::retry::with_retry_if;
use crate::sources::{FetchError, SourceAdapter};

/// Error from a [`ResultProvider`].
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("aggregation failed: {message}")]
    Failed { message: String },

    #[error("aggregation task aborted: {0}")]
    Aborted(#[from] JoinError),
}

/// Anything that can produce an aggregation result for a date.
///
/// Live sessions depend on this rather than on [`Aggregator`] directly.
#[async_trait]
pub trait ResultProvider: Send + Sync {
    async fn build(&self, date: Date) -> Result<AggregationResult, AggregateError>;
}

/// Error from [`Aggregator::event_detail`].
#[derive(Debug, Error)]
pub enum DetailError {
    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Shared state used by every aggregation pass.
pub struct AggregatorContext {
    pub health: SourceHealthTracker,
    pub rate_limiter: DomainRateLimiter,
    pub cache: Arc<TieredCache>,
    retry: RwLock<RetryPolicy>,
}

impl AggregatorContext {
    pub fn new(
        health: SourceHealthTracker,
        rate_limiter: DomainRateLimiter,
        cache: Arc<TieredCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            health,
            rate_limiter,
            cache,
            retry: RwLock::new(retry),
        }
    }

    /// Build a fresh context for `sources` from configuration.
    pub fn from_config<I, S>(
        sources: I,
        cache: &CacheConfig,
        rate_limits: &[RateLimitConfig],
        retry: RetryPolicy,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            SourceHealthTracker::new(sources),
            DomainRateLimiter::new(rate_limits),
            Arc::new(TieredCache::new(cache)),
            retry,
        )
    }

    pub async fn retry_policy(&self) -> RetryPolicy {
        *self.retry.read().await
    }

    /// Apply reloaded rate limits and retry policy.
    pub async fn reload(&self, rate_limits: &[RateLimitConfig], retry: RetryPolicy) {
        self.rate_limiter.replace_limits(rate_limits).await;
        *self.retry.write().await = retry;
        info!(
            rate_limits = rate_limits.len(),
            retries = retry.retries,
            base_delay_ms = retry.base_delay.as_millis() as u64,
            "Aggregator configuration reloaded"
        );
    }
}

/// A source together with its merge policy.
pub struct SourceSlot {
    pub adapter: Arc<dyn SourceAdapter>,
    /// Emit the league even when a successful fetch returned no games.
    pub always_show: bool,
}

impl SourceSlot {
    pub fn new(adapter: Arc<dyn SourceAdapter>, always_show: bool) -> Self {
        Self {
            adapter,
            always_show,
        }
    }

    fn id(&self) -> &str {
        self.adapter.id()
    }
}

/// Aggregates a fixed list of sources, kept in priority order.
pub struct Aggregator {
    sources: Vec<SourceSlot>,
    ctx: AggregatorContext,
}

impl Aggregator {
    pub fn new(sources: Vec<SourceSlot>, ctx: AggregatorContext) -> Self {
        Self { sources, ctx }
    }

    pub fn context(&self) -> &AggregatorContext {
        &self.ctx
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(SourceSlot::id)
    }

    /// Health of every source, in priority order.
    pub async fn health_report(&self) -> Vec<SourceHealthReport> {
        self.ctx.health.report(OffsetDateTime::now_utc()).await
    }

    /// Run one aggregation pass for `date`.
    pub async fn build_result(&self, date: Date) -> AggregationResult {
        let started = Instant::now();
        let policy = self.ctx.retry_policy().await;

        let outcomes = join_all(
            self.sources
                .iter()
                .map(|slot| self.fetch_slot(slot, date, policy)),
        )
        .await;

        let mut leagues = Vec::with_capacity(self.sources.len());
        let mut succeeded = Vec::new();
        for (slot, outcome) in self.sources.iter().zip(outcomes) {
            let id = slot.id();
            let name = slot.adapter.name();
            match outcome {
                Ok(games) => {
                    if !games.is_empty() || slot.always_show {
                        leagues.push(LeagueGroup::fresh(id, name, games.clone()));
                    }
                    succeeded.push((id, games));
                }
                Err(e) => match self.ctx.cache.stale().get(id, date).await {
                    Some(games) => {
                        debug!(source = %id, %date, games = games.len(), "Serving stale games");
                        leagues.push(LeagueGroup::stale(id, name, games));
                    }
                    None => leagues.push(LeagueGroup::failed(id, name, e.to_string())),
                },
            }
        }

        for (id, games) in succeeded {
            self.ctx.cache.stale().put(id, date, games).await;
        }

        let result = AggregationResult::new(date, leagues);
        debug!(
            %date,
            leagues = result.leagues.len(),
            has_live = result.has_live,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation pass complete"
        );
        result
    }

    /// Fetch one source's games through the primary cache, retrying
    /// transient failures. Panics in the adapter are contained here.
    async fn fetch_slot(
        &self,
        slot: &SourceSlot,
        date: Date,
        policy: RetryPolicy,
    ) -> Result<Vec<Event>, FetchError> {
        let id = slot.id();
        let key = events_key(id, date);
        if let Some(games) = self.ctx.cache.get_any::<Vec<Event>>(&key).await {
            debug!(source = %id, %date, "Primary cache hit");
            return Ok(games);
        }

        let label = format!("{id} events");
        let fetch = with_retry_if(
            &label,
            policy,
            || slot.adapter.fetch_events(date, &self.ctx.rate_limiter),
            FetchError::is_transient,
        );
        let result = match AssertUnwindSafe(fetch).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!(source = %id, %date, "Source adapter panicked");
                Err(FetchError::Transient {
                    message: "source adapter panicked".to_string(),
                })
            }
        };
        // Events always belong to the slot's league, whatever label the
        // provider uses.
        let result = result.map(|mut games| {
            for game in &mut games {
                game.league = id.to_string();
            }
            games
        });

        match &result {
            Ok(games) => {
                self.ctx.health.record_success(id).await;
                self.ctx
                    .cache
                    .set_in(Tier::for_events(games), &key, games.clone())
                    .await;
            }
            Err(e) => self.ctx.health.record_failure(id, &e.to_string()).await,
        }
        result
    }

    /// Detail for one event, served from the short tier when possible.
    pub async fn event_detail(&self, source: &str, id: &str) -> Result<EventDetail, DetailError> {
        let slot = self
            .sources
            .iter()
            .find(|s| s.id() == source)
            .ok_or_else(|| DetailError::UnknownSource(source.to_string()))?;

        let key = detail_key(source, id);
        let short = self.ctx.cache.tier(Tier::Short);
        if let Some(detail) = short.get::<EventDetail>(&key).await {
            return Ok(detail);
        }

        let label = format!("{source} detail {id}");
        let policy = self.ctx.retry_policy().await;
        let mut detail = with_retry_if(
            &label,
            policy,
            || slot.adapter.fetch_event_detail(id, &self.ctx.rate_limiter),
            FetchError::is_transient,
        )
        .await?;
        detail.event.league = source.to_string();

        short.set(key, detail.clone(), None).await;
        Ok(detail)
    }
}

#[async_trait]
impl ResultProvider for Aggregator {
    async fn build(&self, date: Date) -> Result<AggregationResult, AggregateError> {
        Ok(self.build_result(date).await)
    }
}

fn events_key(source: &str, date: Date) -> String {
    format!("events:{source}:{date}")
}

fn detail_key(source: &str, id: &str) -> String {
    format!("detail:{source}:{id}")
}
