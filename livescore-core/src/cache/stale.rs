//! Last-known-good fallback store.

use std::time::Duration;

use livescore_sdk::objects::Event;
use time::Date;

use super::store::CacheStore;

/// Long-lived copy of each source's last successful event list per date.
///
/// Written only after a successful fetch and read only when a fresh fetch
/// failed. It is never used as a primary cache.
pub struct StaleStore {
    store: CacheStore,
}

impl StaleStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: CacheStore::new("stale", ttl),
        }
    }

    pub async fn put(&self, source: &str, date: Date, games: Vec<Event>) {
        self.store.set(stale_key(source, date), games, None).await;
    }

    pub async fn get(&self, source: &str, date: Date) -> Option<Vec<Event>> {
        self.store.get(&stale_key(source, date)).await
    }

    pub(crate) fn store(&self) -> &CacheStore {
        &self.store
    }
}

fn stale_key(source: &str, date: Date) -> String {
    format!("stale:{source}:{date}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use livescore_sdk::objects::{Competitor, EventStatus};
    use time::macros::{date, datetime};

    fn game(id: &str) -> Event {
        Event {
            id: id.into(),
            league: "mlb".into(),
            status: EventStatus::Final,
            home: Competitor {
                name: "Home".into(),
                abbreviation: None,
                score: Some(4),
            },
            away: Competitor {
                name: "Away".into(),
                abbreviation: None,
                score: Some(2),
            },
            situation: None,
            start_time: datetime!(2025-06-01 23:05 UTC),
            updated_at: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_are_keyed_by_source_and_date() {
        let stale = StaleStore::new(Duration::from_secs(600));
        stale.put("mlb", date!(2025 - 06 - 01), vec![game("1")]).await;

        assert_eq!(
            stale.get("mlb", date!(2025 - 06 - 01)).await.map(|g| g.len()),
            Some(1)
        );
        assert!(stale.get("mlb", date!(2025 - 06 - 02)).await.is_none());
        assert!(stale.get("nba", date!(2025 - 06 - 01)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let stale = StaleStore::new(Duration::from_secs(600));
        stale.put("mlb", date!(2025 - 06 - 01), vec![game("1")]).await;

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(stale.get("mlb", date!(2025 - 06 - 01)).await.is_none());
    }
}
