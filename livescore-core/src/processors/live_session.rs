//! Per-connection live update loop.
//!
//! A [`LiveSession`] sends the full result once, then re-aggregates on an
//! adaptive cadence and pushes only what visibly changed. Each tick arms
//! the next delay only after it has finished, so a slow rebuild delays the
//! following tick instead of overlapping it.

use std::collections::HashMap;
use std::sync::Arc;

use livescore_sdk::cadence::refresh_interval;
use livescore_sdk::objects::{AggregationResult, Event, LiveMessage, VolatileProjection};
use time::{Date, OffsetDateTime};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::aggregator::{AggregateError, ResultProvider};
use crate::shutdown::stopped;

/// Event ids are only unique within a league.
type SnapshotKey = (String, String);

fn snapshot_key(game: &Event) -> SnapshotKey {
    (game.league.clone(), game.id.clone())
}

/// Last projection sent to one connection, keyed by league and event id.
///
/// Owned by a single session and dropped with it.
#[derive(Debug, Default)]
pub struct ConnectionSnapshot {
    entries: HashMap<SnapshotKey, VolatileProjection>,
}

impl ConnectionSnapshot {
    pub fn from_result(result: &AggregationResult) -> Self {
        Self {
            entries: result
                .games()
                .map(|g| (snapshot_key(g), g.projection()))
                .collect(),
        }
    }

    /// Events in `result` that are new or whose projection differs from
    /// the snapshot. Their entries are updated in place.
    pub fn diff_and_update(&mut self, result: &AggregationResult) -> Vec<Event> {
        let mut changed = Vec::new();
        for game in result.games() {
            let key = snapshot_key(game);
            let projection = game.projection();
            if self.entries.get(&key) != Some(&projection) {
                self.entries.insert(key, projection);
                changed.push(game.clone());
            }
        }
        changed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Live update loop for one subscriber and one date.
pub struct LiveSession {
    provider: Arc<dyn ResultProvider>,
    date: Date,
}

impl LiveSession {
    pub fn new(provider: Arc<dyn ResultProvider>, date: Date) -> Self {
        Self { provider, date }
    }

    /// Run until `cancel_rx` flips to `true` or the receiving side of `tx`
    /// is dropped.
    ///
    /// Fails only when the initial aggregation fails; nothing has been sent
    /// in that case. Failed rebuilds later on are reported to the
    /// subscriber as a keepalive.
    pub async fn run(
        self,
        tx: mpsc::Sender<LiveMessage>,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> Result<(), AggregateError> {
        let date = self.date;
        let mut current = self.rebuild().await?;
        let mut snapshot = ConnectionSnapshot::from_result(&current);
        info!(%date, games = snapshot.len(), "Live session started");

        if tx.send(LiveMessage::Init(current.clone())).await.is_err() {
            info!(%date, "Live session ended, subscriber gone");
            return Ok(());
        }

        loop {
            let delay = refresh_interval(&current, OffsetDateTime::now_utc());
            debug!(%date, delay_secs = delay.as_secs(), "Next live tick scheduled");

            tokio::select! {
                biased;

                _ = stopped(&mut cancel_rx) => break,
                _ = tx.closed() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            // A rebuild still in flight when the session is cancelled runs to
            // completion in its own task; its result is discarded.
            let rebuilt = tokio::select! {
                biased;

                _ = stopped(&mut cancel_rx) => break,
                rebuilt = self.rebuild() => rebuilt,
            };

            let message = match rebuilt {
                Ok(result) => {
                    let changed = snapshot.diff_and_update(&result);
                    let has_live = result.has_live;
                    current = result;
                    if changed.is_empty() {
                        LiveMessage::ping_now()
                    } else {
                        debug!(%date, changed = changed.len(), "Sending live update");
                        LiveMessage::Update {
                            games: changed,
                            has_live,
                        }
                    }
                }
                Err(e) => {
                    warn!(%date, error = %e, "Live rebuild failed, sending keepalive");
                    LiveMessage::ping_now()
                }
            };

            if tx.send(message).await.is_err() {
                break;
            }
        }

        info!(%date, "Live session ended");
        Ok(())
    }

    /// Rebuild in a separate task so a panicking provider surfaces as an
    /// error instead of tearing down the session.
    async fn rebuild(&self) -> Result<AggregationResult, AggregateError> {
        let provider = self.provider.clone();
        let date = self.date;
        tokio::spawn(async move { provider.build(date).await }).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use livescore_sdk::cadence::{IDLE_INTERVAL, LIVE_INTERVAL};
    use livescore_sdk::objects::{Competitor, EventStatus, LeagueGroup, Situation};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use time::macros::{date, datetime};
    use tokio::time::Instant;

    const DAY: Date = date!(2025 - 06 - 01);

    fn game(id: &str, status: EventStatus, home_score: u32) -> Event {
        Event {
            id: id.into(),
            league: "mlb".into(),
            status,
            home: Competitor {
                name: "Home".into(),
                abbreviation: None,
                score: Some(home_score),
            },
            away: Competitor {
                name: "Away".into(),
                abbreviation: None,
                score: Some(0),
            },
            situation: Some(Situation {
                inning: Some(3),
                ..Situation::default()
            }),
            start_time: datetime!(2025-06-01 18:00 UTC),
            updated_at: None,
        }
    }

    fn result(games: Vec<Event>) -> AggregationResult {
        AggregationResult::new(DAY, vec![LeagueGroup::fresh("mlb", "MLB", games)])
    }

    fn live_games() -> Vec<Event> {
        (1..=7)
            .map(|i| game(&i.to_string(), EventStatus::Live, 1))
            .collect()
    }

    /// Replays scripted results in order; the last one repeats. `None`
    /// scripts a failed rebuild.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Option<AggregationResult>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Option<AggregationResult>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl ResultProvider for ScriptedProvider {
        async fn build(&self, _date: Date) -> Result<AggregationResult, AggregateError> {
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().flatten()
                } else {
                    script.front().cloned().flatten()
                }
            };
            next.ok_or_else(|| AggregateError::Failed {
                message: "all sources unreachable".into(),
            })
        }
    }

    fn spawn_session(
        provider: Arc<ScriptedProvider>,
    ) -> (
        mpsc::Receiver<LiveMessage>,
        watch::Sender<bool>,
        tokio::task::JoinHandle<Result<(), AggregateError>>,
    ) {
        let (tx, rx) = mpsc::channel(16);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(LiveSession::new(provider, DAY).run(tx, cancel_rx));
        (rx, cancel_tx, handle)
    }

    #[test]
    fn test_snapshot_reports_new_and_changed_events_only() {
        let mut snapshot = ConnectionSnapshot::from_result(&result(vec![
            game("1", EventStatus::Live, 1),
            game("2", EventStatus::Live, 1),
        ]));

        let mut next = vec![
            game("1", EventStatus::Live, 1),
            game("2", EventStatus::Live, 2),
            game("3", EventStatus::Scheduled, 0),
        ];
        next[0].home.name = "Renamed".into();
        let changed = snapshot.diff_and_update(&result(next.clone()));

        let ids: Vec<&str> = changed.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.diff_and_update(&result(next)).is_empty());
    }

    #[test]
    fn test_snapshot_keeps_colliding_ids_apart() {
        let mut nba_game = game("1", EventStatus::Live, 90);
        nba_game.league = "nba".into();
        let two_leagues = |mlb_score: u32| {
            AggregationResult::new(
                DAY,
                vec![
                    LeagueGroup::fresh(
                        "mlb",
                        "MLB",
                        vec![game("1", EventStatus::Live, mlb_score)],
                    ),
                    LeagueGroup::fresh("nba", "NBA", vec![nba_game.clone()]),
                ],
            )
        };

        let mut snapshot = ConnectionSnapshot::from_result(&two_leagues(3));
        assert_eq!(snapshot.len(), 2);
        for _ in 0..3 {
            assert!(snapshot.diff_and_update(&two_leagues(3)).is_empty());
        }

        let changed = snapshot.diff_and_update(&two_leagues(4));
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].league, "mlb");
        assert_eq!(changed[0].home.score, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_contains_exactly_the_changed_event() {
        let mut changed = live_games();
        changed[6].home.score = Some(4);
        let provider = ScriptedProvider::new(vec![
            Some(result(live_games())),
            Some(result(changed)),
        ]);
        let (mut rx, _cancel_tx, _handle) = spawn_session(provider);

        assert!(matches!(rx.recv().await, Some(LiveMessage::Init(_))));
        let started = Instant::now();
        match rx.recv().await {
            Some(LiveMessage::Update { games, has_live }) => {
                assert_eq!(games.len(), 1);
                assert_eq!(games[0].id, "7");
                assert_eq!(games[0].home.score, Some(4));
                assert!(has_live);
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert!(started.elapsed() >= LIVE_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_change_sends_ping() {
        let provider = ScriptedProvider::new(vec![Some(result(live_games()))]);
        let (mut rx, _cancel_tx, _handle) = spawn_session(provider);

        assert!(matches!(rx.recv().await, Some(LiveMessage::Init(_))));
        assert!(matches!(rx.recv().await, Some(LiveMessage::Ping { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrelevant_field_change_sends_ping() {
        let mut counted = live_games();
        if let Some(situation) = counted[0].situation.as_mut() {
            situation.balls = Some(3);
            situation.runners.first = true;
        }
        let provider = ScriptedProvider::new(vec![
            Some(result(live_games())),
            Some(result(counted)),
        ]);
        let (mut rx, _cancel_tx, _handle) = spawn_session(provider);

        assert!(matches!(rx.recv().await, Some(LiveMessage::Init(_))));
        assert!(matches!(rx.recv().await, Some(LiveMessage::Ping { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_rebuild_sends_ping_and_keeps_snapshot() {
        let mut changed = live_games();
        changed[2].status = EventStatus::Final;
        let provider = ScriptedProvider::new(vec![
            Some(result(live_games())),
            None,
            Some(result(changed)),
        ]);
        let (mut rx, _cancel_tx, _handle) = spawn_session(provider);

        assert!(matches!(rx.recv().await, Some(LiveMessage::Init(_))));
        assert!(matches!(rx.recv().await, Some(LiveMessage::Ping { .. })));
        match rx.recv().await {
            Some(LiveMessage::Update { games, .. }) => {
                assert_eq!(games.len(), 1);
                assert_eq!(games[0].id, "3");
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_cadence_when_everything_is_final() {
        let finals = vec![game("1", EventStatus::Final, 5)];
        let provider = ScriptedProvider::new(vec![Some(result(finals))]);
        let (mut rx, _cancel_tx, _handle) = spawn_session(provider);

        assert!(matches!(rx.recv().await, Some(LiveMessage::Init(_))));
        let started = Instant::now();
        assert!(matches!(rx.recv().await, Some(LiveMessage::Ping { .. })));
        assert!(started.elapsed() >= IDLE_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_the_session() {
        let provider = ScriptedProvider::new(vec![Some(result(live_games()))]);
        let (mut rx, cancel_tx, handle) = spawn_session(provider);

        assert!(matches!(rx.recv().await, Some(LiveMessage::Init(_))));
        cancel_tx.send(true).unwrap();

        assert!(handle.await.unwrap().is_ok());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_subscriber_stops_the_session() {
        let provider = ScriptedProvider::new(vec![Some(result(live_games()))]);
        let (rx, _cancel_tx, handle) = spawn_session(provider);

        drop(rx);
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_initial_build_sends_nothing() {
        let provider = ScriptedProvider::new(vec![None]);
        let (mut rx, _cancel_tx, handle) = spawn_session(provider);

        assert!(matches!(
            handle.await.unwrap(),
            Err(AggregateError::Failed { .. })
        ));
        assert!(rx.recv().await.is_none());
    }
}
