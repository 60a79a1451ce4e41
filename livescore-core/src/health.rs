//! Per-source health tracking.
//!
//! Every aggregation slot reports its outcome here. The tracker keeps the
//! success/failure streak for each source and classifies it as
//! `unknown`, `healthy`, `degraded` or `down`. Transitions between
//! classifications are logged.

use livescore_sdk::objects::{HealthStatus, SourceHealthReport};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Consecutive failures at which a source is considered down.
pub const DOWN_THRESHOLD: u32 = 3;

/// Health record of a single source. Lives for the process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceHealth {
    pub last_success_at: Option<OffsetDateTime>,
    pub last_error_at: Option<OffsetDateTime>,
    pub last_error: Option<String>,
    pub consecutive_fails: u32,
}

impl SourceHealth {
    pub fn classify(&self) -> HealthStatus {
        match self.consecutive_fails {
            n if n >= DOWN_THRESHOLD => HealthStatus::Down,
            0 if self.last_success_at.is_some() => HealthStatus::Healthy,
            0 => HealthStatus::Unknown,
            _ => HealthStatus::Degraded,
        }
    }

    fn report(&self, source: &str, now: OffsetDateTime) -> SourceHealthReport {
        SourceHealthReport {
            source: source.to_string(),
            status: self.classify(),
            last_success_ago: self.last_success_at.map(|t| (now - t).whole_seconds()),
            last_error_ago: self.last_error_at.map(|t| (now - t).whole_seconds()),
            last_error: self.last_error.clone(),
            consecutive_fails: self.consecutive_fails,
        }
    }
}

/// Health records for all sources.
///
/// The number of sources is small, so records are kept in a `Vec` in
/// registration order and searched linearly.
pub struct SourceHealthTracker {
    records: RwLock<Vec<(String, SourceHealth)>>,
}

impl SourceHealthTracker {
    /// Create a tracker with an empty record for each source.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let records = sources
            .into_iter()
            .map(|s| (s.into(), SourceHealth::default()))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn record_success(&self, source: &str) {
        let mut records = self.records.write().await;
        let record = entry(&mut records, source);
        let before = record.classify();

        record.last_success_at = Some(OffsetDateTime::now_utc());
        record.last_error = None;
        record.consecutive_fails = 0;

        let after = record.classify();
        if before != after {
            info!(%source, from = %before, to = %after, "Source health changed");
        }
    }

    pub async fn record_failure(&self, source: &str, error: &str) {
        let mut records = self.records.write().await;
        let record = entry(&mut records, source);
        let before = record.classify();

        record.last_error_at = Some(OffsetDateTime::now_utc());
        record.last_error = Some(error.to_string());
        record.consecutive_fails = record.consecutive_fails.saturating_add(1);

        let after = record.classify();
        warn!(
            %source,
            consecutive_fails = record.consecutive_fails,
            %error,
            "Source fetch failed"
        );
        if before != after {
            warn!(%source, from = %before, to = %after, "Source health changed");
        }
    }

    pub async fn classify(&self, source: &str) -> HealthStatus {
        let records = self.records.read().await;
        records
            .iter()
            .find(|(id, _)| id == source)
            .map(|(_, r)| r.classify())
            .unwrap_or(HealthStatus::Unknown)
    }

    /// Copy of the record for `source`, if it has been registered or seen.
    pub async fn get(&self, source: &str) -> Option<SourceHealth> {
        let records = self.records.read().await;
        records
            .iter()
            .find(|(id, _)| id == source)
            .map(|(_, r)| r.clone())
    }

    /// Report for every known source, in registration order.
    pub async fn report(&self, now: OffsetDateTime) -> Vec<SourceHealthReport> {
        let records = self.records.read().await;
        records.iter().map(|(id, r)| r.report(id, now)).collect()
    }
}

fn entry<'a>(records: &'a mut Vec<(String, SourceHealth)>, source: &str) -> &'a mut SourceHealth {
    let idx = match records.iter().position(|(id, _)| id == source) {
        Some(idx) => idx,
        None => {
            records.push((source.to_string(), SourceHealth::default()));
            records.len() - 1
        }
    };
    &mut records[idx].1
}
