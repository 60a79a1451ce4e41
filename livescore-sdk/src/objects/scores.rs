//! Aggregated scoreboard types returned by `GET /scores` and carried by the
//! live stream's `init` message.

use serde::{Deserialize, Serialize};
use time::Date;

use super::event::Event;

/// Error text shown when a failed source was backfilled from the stale store.
pub const STALE_NOTICE: &str = "live data may be delayed";

/// One provider's events for one date, plus its fetch status.
///
/// `error` and a non-empty `games` list only coexist when `stale` is set,
/// i.e. the games were substituted from the last-known-good store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueGroup {
    /// Source id, also used as `Event::league`.
    pub id: String,
    /// Human-readable league name.
    pub name: String,
    #[serde(default)]
    pub games: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub stale: bool,
}

impl LeagueGroup {
    /// A successfully fetched group.
    pub fn fresh(id: impl Into<String>, name: impl Into<String>, games: Vec<Event>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            games,
            error: None,
            stale: false,
        }
    }

    /// A failed group with no games to show.
    pub fn failed(id: impl Into<String>, name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            games: Vec::new(),
            error: Some(error.into()),
            stale: false,
        }
    }

    /// A failed group backfilled with last-known-good games.
    pub fn stale(id: impl Into<String>, name: impl Into<String>, games: Vec<Event>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            games,
            error: Some(STALE_NOTICE.to_string()),
            stale: true,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The unified result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    #[serde(with = "super::iso_date")]
    pub date: Date,
    pub leagues: Vec<LeagueGroup>,
    /// Always equal to "any game in any league is live".
    pub has_live: bool,
}

impl AggregationResult {
    /// Build a result, deriving `has_live` from the leagues.
    pub fn new(date: Date, leagues: Vec<LeagueGroup>) -> Self {
        let has_live = leagues.iter().flat_map(|l| &l.games).any(Event::is_live);
        Self {
            date,
            leagues,
            has_live,
        }
    }

    /// Iterate every game across all leagues.
    pub fn games(&self) -> impl Iterator<Item = &Event> {
        self.leagues.iter().flat_map(|l| l.games.iter())
    }
}
