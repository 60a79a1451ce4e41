//! In-memory caching.
//!
//! [`TieredCache`] holds three [`CacheStore`]s whose default TTLs match how
//! quickly the data in them changes, plus the [`StaleStore`] fallback. All
//! of them expire entries lazily on read; [`TieredCache::spawn_sweeper`]
//! reclaims the memory of expired entries in the background.

mod stale;
mod store;

use std::sync::Arc;
use std::time::Duration;

use livescore_sdk::objects::Event;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::shutdown::stopped;

pub use stale::StaleStore;
pub use store::CacheStore;

/// Volatility tier of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Live, per-event data.
    Short,
    /// Aggregates that change a few times an hour.
    Medium,
    /// Schedules and settled results.
    Long,
}

impl Tier {
    /// Pick the tier for one source's event list: short while anything is
    /// live, long once everything is settled, medium otherwise.
    pub fn for_events(games: &[Event]) -> Self {
        if games.iter().any(Event::is_live) {
            Tier::Short
        } else if !games.is_empty() && games.iter().all(|g| g.status.is_settled()) {
            Tier::Long
        } else {
            Tier::Medium
        }
    }
}

/// The three TTL tiers plus the stale fallback store.
pub struct TieredCache {
    short: CacheStore,
    medium: CacheStore,
    long: CacheStore,
    stale: StaleStore,
}

impl TieredCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            short: CacheStore::new("short", config.short_ttl),
            medium: CacheStore::new("medium", config.medium_ttl),
            long: CacheStore::new("long", config.long_ttl),
            stale: StaleStore::new(config.stale_ttl),
        }
    }

    pub fn tier(&self, tier: Tier) -> &CacheStore {
        match tier {
            Tier::Short => &self.short,
            Tier::Medium => &self.medium,
            Tier::Long => &self.long,
        }
    }

    pub fn stale(&self) -> &StaleStore {
        &self.stale
    }

    /// Look `key` up in every tier, shortest TTL first.
    ///
    /// A value is only ever written to one tier, so the order only matters
    /// after a value moved tiers (e.g. a game went final).
    pub async fn get_any<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        for tier in [Tier::Short, Tier::Medium, Tier::Long] {
            if let Some(value) = self.tier(tier).get(key).await {
                return Some(value);
            }
        }
        None
    }

    /// Store `value` in `tier` with the tier's default TTL, evicting any
    /// copy of `key` from the other tiers.
    pub async fn set_in<T>(&self, tier: Tier, key: &str, value: T)
    where
        T: Send + Sync + 'static,
    {
        for other in [Tier::Short, Tier::Medium, Tier::Long] {
            if other != tier {
                self.tier(other).remove(key).await;
            }
        }
        self.tier(tier).set(key, value, None).await;
    }

    /// Sweep every tier and the stale store once. Returns the number of
    /// entries removed.
    pub async fn sweep_all(&self) -> usize {
        let mut removed = 0;
        for store in [&self.short, &self.medium, &self.long, self.stale.store()] {
            let n = store.sweep().await;
            if n > 0 {
                debug!(store = store.name(), removed = n, "Swept expired cache entries");
            }
            removed += n;
        }
        removed
    }

    /// Spawn a background task sweeping expired entries every `interval`
    /// until `shutdown_rx` flips to `true` or its sender is dropped.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Cache sweeper started");
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately and there is nothing to sweep yet.
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;

                    _ = stopped(&mut shutdown_rx) => break,

                    _ = ticker.tick() => {
                        self.sweep_all().await;
                    }
                }
            }
            info!("Cache sweeper shutdown complete");
        })
    }
}
