//! Client-side scoreboard state fed by live stream messages or polls.

use crate::objects::{AggregationResult, Event, LiveMessage};

/// What applying a message did to the local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// State was replaced wholesale (`init` or poll).
    Replaced,
    /// `n` games were merged in from an `update`.
    Merged(usize),
    /// Keepalive, or an update that arrived before any `init`.
    Unchanged,
}

/// Local copy of the scoreboard for one date.
#[derive(Debug, Clone, Default)]
pub struct LiveState {
    result: Option<AggregationResult>,
}

impl LiveState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> Option<&AggregationResult> {
        self.result.as_ref()
    }

    /// Replace local state with a full result.
    pub fn replace(&mut self, result: AggregationResult) {
        self.result = Some(result);
    }

    /// Apply a live stream message.
    pub fn apply(&mut self, message: LiveMessage) -> Applied {
        match message {
            LiveMessage::Init(result) => {
                self.replace(result);
                Applied::Replaced
            }
            LiveMessage::Update { games, has_live } => {
                let Some(current) = self.result.as_mut() else {
                    return Applied::Unchanged;
                };
                let mut merged = 0;
                for game in games {
                    if merge_game(current, game) {
                        merged += 1;
                    }
                }
                current.has_live = has_live;
                Applied::Merged(merged)
            }
            LiveMessage::Ping { .. } => Applied::Unchanged,
        }
    }
}

/// Replace the game with the same id in its league, or append it there.
///
/// Returns `false` if the game belongs to a league the local state does not
/// know about.
fn merge_game(result: &mut AggregationResult, game: Event) -> bool {
    let Some(league) = result.leagues.iter_mut().find(|l| l.id == game.league) else {
        return false;
    };
    match league.games.iter_mut().find(|g| g.id == game.id) {
        Some(slot) => *slot = game,
        None => league.games.push(game),
    }
    true
}
