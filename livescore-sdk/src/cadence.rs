//! Adaptive refresh cadence shared by the server push loop and the polling
//! client.

use std::time::Duration;

use time::OffsetDateTime;

use crate::objects::{AggregationResult, EventStatus};

/// Refresh interval while any game is live.
pub const LIVE_INTERVAL: Duration = Duration::from_secs(15);
/// Refresh interval while a game is about to start.
pub const PREGAME_INTERVAL: Duration = Duration::from_secs(60);
/// Refresh interval when nothing is happening.
pub const IDLE_INTERVAL: Duration = Duration::from_secs(300);

/// How close to its start time a scheduled game counts as imminent.
pub const IMMINENT_WINDOW: time::Duration = time::Duration::minutes(30);

/// Returns the delay before the next refresh of `result`.
///
/// A scheduled game is imminent when its start time lies within
/// [`IMMINENT_WINDOW`] of `now` on either side, so a game that should have
/// started but is not yet reported live keeps the faster cadence.
pub fn refresh_interval(result: &AggregationResult, now: OffsetDateTime) -> Duration {
    if result.has_live || result.games().any(|g| g.is_live()) {
        return LIVE_INTERVAL;
    }

    let imminent = result.games().any(|g| {
        g.status == EventStatus::Scheduled && (g.start_time - now).abs() <= IMMINENT_WINDOW
    });
    if imminent {
        PREGAME_INTERVAL
    } else {
        IDLE_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Competitor, Event, LeagueGroup};
    use time::macros::{date, datetime};

    fn game(status: EventStatus, start_time: OffsetDateTime) -> Event {
        Event {
            id: "1".into(),
            league: "mlb".into(),
            status,
            home: Competitor {
                name: "H".into(),
                abbreviation: None,
                score: None,
            },
            away: Competitor {
                name: "A".into(),
                abbreviation: None,
                score: None,
            },
            situation: None,
            start_time,
            updated_at: None,
        }
    }

    fn result(games: Vec<Event>) -> AggregationResult {
        AggregationResult::new(
            date!(2025 - 06 - 01),
            vec![LeagueGroup::fresh("mlb", "MLB", games)],
        )
    }

    #[test]
    fn test_live_interval() {
        let now = datetime!(2025-06-01 19:00 UTC);
        let r = result(vec![
            game(EventStatus::Live, datetime!(2025-06-01 18:00 UTC)),
            game(EventStatus::Scheduled, datetime!(2025-06-01 19:10 UTC)),
        ]);
        assert_eq!(refresh_interval(&r, now), LIVE_INTERVAL);
    }

    #[test]
    fn test_pregame_interval() {
        let now = datetime!(2025-06-01 19:00 UTC);
        let r = result(vec![
            game(EventStatus::Final, datetime!(2025-06-01 13:00 UTC)),
            game(EventStatus::Scheduled, datetime!(2025-06-01 19:25 UTC)),
        ]);
        assert_eq!(refresh_interval(&r, now), PREGAME_INTERVAL);

        let late_start = result(vec![game(
            EventStatus::Scheduled,
            datetime!(2025-06-01 18:50 UTC),
        )]);
        assert_eq!(refresh_interval(&late_start, now), PREGAME_INTERVAL);
    }

    #[test]
    fn test_idle_interval() {
        let now = datetime!(2025-06-01 19:00 UTC);
        let r = result(vec![
            game(EventStatus::Final, datetime!(2025-06-01 13:00 UTC)),
            game(EventStatus::Scheduled, datetime!(2025-06-01 20:05 UTC)),
            // Imminent by time, but not scheduled.
            game(EventStatus::Postponed, datetime!(2025-06-01 19:05 UTC)),
        ]);
        assert_eq!(refresh_interval(&r, now), IDLE_INTERVAL);
        assert_eq!(refresh_interval(&result(vec![]), now), IDLE_INTERVAL);
    }
}
