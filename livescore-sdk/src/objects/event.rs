//! The uniform event model every source adapter normalizes into.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Lifecycle status of a single contest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Scheduled,
    Live,
    Final,
    Postponed,
    Delayed,
}

impl EventStatus {
    /// Returns `true` when no further score changes are expected.
    pub fn is_settled(self) -> bool {
        matches!(self, EventStatus::Final | EventStatus::Postponed)
    }
}

/// Which half of an inning is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InningHalf {
    Top,
    Bottom,
}

/// One side of a contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

/// Occupied bases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runners {
    #[serde(default)]
    pub first: bool,
    #[serde(default)]
    pub second: bool,
    #[serde(default)]
    pub third: bool,
}

/// In-progress game situation. Only present while a game is live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Situation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inning: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half: Option<InningHalf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outs: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balls: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikes: Option<u8>,
    #[serde(default)]
    pub runners: Runners,
}

/// One scheduled, live or finished contest.
///
/// Events are values: a changed event is a new `Event`, never a mutation
/// of one that was already handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Provider-scoped identifier, stable across fetches.
    pub id: String,
    /// Id of the league group (source) this event belongs to.
    pub league: String,
    pub status: EventStatus,
    pub home: Competitor,
    pub away: Competitor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub situation: Option<Situation>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub updated_at: Option<OffsetDateTime>,
}

impl Event {
    pub fn is_live(&self) -> bool {
        self.status == EventStatus::Live
    }

    /// The subset of fields that count as a visible change for live
    /// subscribers.
    pub fn projection(&self) -> VolatileProjection {
        let situation = self.situation.as_ref();
        VolatileProjection {
            home_score: self.home.score,
            away_score: self.away.score,
            status: self.status,
            inning: situation.and_then(|s| s.inning),
            half: situation.and_then(|s| s.half),
            outs: situation.and_then(|s| s.outs),
        }
    }
}

/// Comparable projection of an event's volatile fields.
///
/// Count, runners, names and timestamps are deliberately absent so they
/// never trigger an update on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolatileProjection {
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub status: EventStatus,
    pub inning: Option<u8>,
    pub half: Option<InningHalf>,
    pub outs: Option<u8>,
}

/// Full detail for a single event as returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Provider-specific payload (box score, play log, ...), passed through.
    #[serde(default)]
    pub extra: serde_json::Value,
}
