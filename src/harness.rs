//! The seam between the pure engine and whatever hosts it. Storage, realtime
//! fan-out and stats persistence are traits; the in-memory implementations
//! back the simulator and the test suite.

use std::collections::HashMap;

use thiserror::Error;

use crate::euchre::bot;
use crate::euchre::recovery::{self, FreezeDetector, StallRecord};
use crate::euchre::{Action, EuchreGame, Phase, PlayerStats};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("no table stored under id {0:?}")]
    MissingTable(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Durable table snapshots, keyed by table id. The whole game state is one
/// blob; every write replaces it.
pub trait Storage {
    fn load(&self, table_id: &str) -> Result<Option<EuchreGame>, HarnessError>;
    fn save(&mut self, table_id: &str, game: &EuchreGame) -> Result<(), HarnessError>;
    fn delete(&mut self, table_id: &str) -> Result<(), HarnessError>;
}

/// Realtime fan-out of actions to the other replicas of a table. Delivery is
/// at-least-once and possibly out of order; the reducer's idempotence is what
/// keeps replicas converging.
pub trait Broadcast {
    fn publish(&mut self, table_id: &str, action: &Action) -> Result<(), HarnessError>;
}

/// Lifetime per-player counters, persisted outside any one table.
pub trait StatSink {
    fn load_stats(&self, player: &str) -> Result<PlayerStats, HarnessError>;
    fn store_stats(&mut self, player: &str, stats: &PlayerStats) -> Result<(), HarnessError>;
}

/// Storage over serialized JSON blobs in a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
}

impl Storage for MemoryStore {
    fn load(&self, table_id: &str) -> Result<Option<EuchreGame>, HarnessError> {
        match self.blobs.get(table_id) {
            Some(blob) => Ok(Some(serde_json::from_str(blob)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, table_id: &str, game: &EuchreGame) -> Result<(), HarnessError> {
        let blob = serde_json::to_string(game)?;
        self.blobs.insert(table_id.to_string(), blob);
        Ok(())
    }

    fn delete(&mut self, table_id: &str) -> Result<(), HarnessError> {
        self.blobs.remove(table_id);
        Ok(())
    }
}

/// Broadcast that records every published action, newest last.
#[derive(Debug, Default)]
pub struct MemoryBus {
    pub published: Vec<(String, Action)>,
}

impl Broadcast for MemoryBus {
    fn publish(&mut self, table_id: &str, action: &Action) -> Result<(), HarnessError> {
        self.published.push((table_id.to_string(), action.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStatSink {
    stats: HashMap<String, PlayerStats>,
}

impl StatSink for MemoryStatSink {
    fn load_stats(&self, player: &str) -> Result<PlayerStats, HarnessError> {
        Ok(self.stats.get(player).copied().unwrap_or_default())
    }

    fn store_stats(&mut self, player: &str, stats: &PlayerStats) -> Result<(), HarnessError> {
        self.stats.insert(player.to_string(), *stats);
        Ok(())
    }
}

/// One hosted table: the live state plus its storage, fan-out, stats sink and
/// freeze watchdog. Locally originated actions go through [`Table::dispatch`];
/// actions arriving from other replicas go through [`Table::on_remote`]. Both
/// funnel into the same reducer, so every mutation stays inside the action
/// vocabulary.
pub struct Table<S, B, K> {
    pub table_id: String,
    pub game: EuchreGame,
    storage: S,
    bus: B,
    sink: K,
    detector: FreezeDetector,
    pub stalls: Vec<StallRecord>,
}

impl<S: Storage, B: Broadcast, K: StatSink> Table<S, B, K> {
    pub fn new(
        table_id: impl Into<String>,
        game: EuchreGame,
        storage: S,
        bus: B,
        sink: K,
    ) -> Result<Self, HarnessError> {
        let mut table = Table {
            table_id: table_id.into(),
            game,
            storage,
            bus,
            sink,
            detector: FreezeDetector::new(),
            stalls: Vec::new(),
        };
        table.persist()?;
        Ok(table)
    }

    /// Reload from storage, e.g. after a process restart or a late join.
    pub fn resume(
        table_id: impl Into<String>,
        storage: S,
        bus: B,
        sink: K,
    ) -> Result<Self, HarnessError> {
        let table_id = table_id.into();
        let game = storage
            .load(&table_id)?
            .ok_or_else(|| HarnessError::MissingTable(table_id.clone()))?;
        Ok(Table {
            table_id,
            game,
            storage,
            bus,
            sink,
            detector: FreezeDetector::new(),
            stalls: Vec::new(),
        })
    }

    /// Apply a locally originated action, persist the result and fan the
    /// action out to the other replicas. Rejected actions degrade to no-ops
    /// inside the reducer, so dispatch never fails on bad input.
    pub fn dispatch(&mut self, action: &Action) -> Result<(), HarnessError> {
        self.bus.publish(&self.table_id, action)?;
        self.apply(action)
    }

    /// An action arrived from another replica. Applied but not re-published;
    /// duplicates and replays are absorbed by the reducer's idempotence.
    pub fn on_remote(&mut self, action: &Action) -> Result<(), HarnessError> {
        self.apply(action)
    }

    fn apply(&mut self, action: &Action) -> Result<(), HarnessError> {
        self.game = self.game.clone_and_apply(action);
        self.detector.reset();
        if self.game.phase == Phase::GameOver {
            self.finish()?;
        } else {
            self.persist()?;
        }
        Ok(())
    }

    /// Let the bots act until a human is on turn (or the game is over).
    /// Structural transitions between phases are driven here too.
    pub fn poll_bots(&mut self) -> Result<(), HarnessError> {
        // far above the action count of any real game
        for _ in 0..20_000 {
            let action = match self.game.phase {
                Phase::WaitingForTrick => Action::ClearTrick,
                Phase::Scoring => Action::FinishHand,
                Phase::WaitingForNextDeal | Phase::RandomizingDealer => {
                    Action::DealHand { payload: None }
                }
                Phase::Bidding | Phase::Discard | Phase::Playing => {
                    if !self.game.current_player_is_bot() {
                        return Ok(());
                    }
                    match bot::choose_action(&self.game) {
                        Some(action) => action,
                        None => return Ok(()),
                    }
                }
                Phase::Lobby | Phase::GameOver => return Ok(()),
            };
            self.dispatch(&action)?;
            if self.game.phase == Phase::GameOver {
                return Ok(());
            }
        }
        tracing::warn!(table = %self.table_id, "bot polling hit its action cap");
        Ok(())
    }

    /// Periodic watchdog tick. When the table has stalled, the diagnosed
    /// remedy is dispatched as an ordinary action and recorded.
    pub fn check_freeze(&mut self, now_ms: u64) -> Result<(), HarnessError> {
        let Some(remedy) = self.detector.observe(&self.game, now_ms) else {
            return Ok(());
        };
        let phase = self.game.phase;
        let resolved = match recovery::remedy_action(&self.game, remedy) {
            Some(action) => {
                let before = (self.game.phase, self.game.current_player);
                self.dispatch(&action)?;
                (self.game.phase, self.game.current_player) != before
            }
            None => false,
        };
        self.stalls.push(StallRecord {
            at_ms: now_ms,
            phase,
            remedy,
            resolved,
        });
        Ok(())
    }

    /// Flush every seated player's counters and retire the stored record once
    /// the game is over.
    fn finish(&mut self) -> Result<(), HarnessError> {
        for player in &self.game.players {
            let Some(name) = &player.name else { continue };
            let mut stats = self.sink.load_stats(name)?;
            stats.merge_max(&player.stats);
            self.sink.store_stats(name, &stats)?;
        }
        self.storage.delete(&self.table_id)
    }

    fn persist(&mut self) -> Result<(), HarnessError> {
        self.storage.save(&self.table_id, &self.game)
    }

    pub fn stats_for(&self, player: &str) -> Result<PlayerStats, HarnessError> {
        self.sink.load_stats(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euchre::game::WINNING_SCORE;

    fn bot_table() -> Table<MemoryStore, MemoryBus, MemoryStatSink> {
        Table::new(
            "table-1",
            EuchreGame::new_with_bots(),
            MemoryStore::default(),
            MemoryBus::default(),
            MemoryStatSink::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_bot_table_plays_to_completion() {
        let mut table = bot_table();
        table.game.with_no_changes();
        table.poll_bots().unwrap();
        assert_eq!(table.game.phase, Phase::GameOver);
        assert!(table.game.scores.iter().any(|&s| s >= WINNING_SCORE));
        // the finished game flushed lifetime stats and retired the record
        let stats = table.stats_for("bot-0").unwrap();
        assert_eq!(stats.games_played, 1);
        assert!(stats.hands_played > 0);
        assert!(table.storage.load("table-1").unwrap().is_none());
        // every action was fanned out under the table's id
        assert!(!table.bus.published.is_empty());
        assert!(table.bus.published.iter().all(|(id, _)| id == "table-1"));
    }

    #[test]
    fn test_dispatch_persists_and_publishes() {
        let mut table = bot_table();
        let published_before = table.bus.published.len();
        table.dispatch(&Action::DealHand { payload: None }).unwrap();
        assert_eq!(table.game.phase, Phase::Bidding);
        assert_eq!(table.bus.published.len(), published_before + 1);
        let stored = table.storage.load("table-1").unwrap().unwrap();
        assert_eq!(stored.phase, Phase::Bidding);
    }

    #[test]
    fn test_remote_actions_are_applied_but_not_republished() {
        let mut table = bot_table();
        let published_before = table.bus.published.len();
        table.on_remote(&Action::DealHand { payload: None }).unwrap();
        assert_eq!(table.game.phase, Phase::Bidding);
        assert_eq!(table.bus.published.len(), published_before);
    }

    #[test]
    fn test_duplicate_remote_delivery_is_absorbed() {
        let mut table = bot_table();
        table.on_remote(&Action::DealHand { payload: None }).unwrap();
        let action = Action::Bid {
            seat: table.game.current_player,
            call: crate::euchre::BidCall::Pass,
        };
        table.on_remote(&action).unwrap();
        let after_first = table.game.current_player;
        // at-least-once delivery: the replayed bid is out of turn now and
        // changes nothing
        table.on_remote(&action).unwrap();
        assert_eq!(table.game.current_player, after_first);
    }

    #[test]
    fn test_resume_restores_stored_state() {
        let mut store = MemoryStore::default();
        let game = {
            let mut table = Table::new(
                "table-2",
                EuchreGame::new_with_bots(),
                MemoryStore::default(),
                MemoryBus::default(),
                MemoryStatSink::default(),
            )
            .unwrap();
            table.dispatch(&Action::DealHand { payload: None }).unwrap();
            table.game.clone()
        };
        store.save("table-2", &game).unwrap();
        let resumed = Table::resume(
            "table-2",
            store,
            MemoryBus::default(),
            MemoryStatSink::default(),
        )
        .unwrap();
        assert_eq!(resumed.game.phase, Phase::Bidding);
        assert_eq!(resumed.game.dealer, game.dealer);
    }

    #[test]
    fn test_resume_missing_table_errors() {
        let err = Table::resume(
            "nope",
            MemoryStore::default(),
            MemoryBus::default(),
            MemoryStatSink::default(),
        )
        .err()
        .expect("missing table must error");
        assert!(matches!(err, HarnessError::MissingTable(_)));
    }

    #[test]
    fn test_check_freeze_recovers_a_stalled_table() {
        let mut table = bot_table();
        table.dispatch(&Action::DealHand { payload: None }).unwrap();
        table.game.last_active = 100_000;
        // first observation arms the detector, second diagnoses
        table.check_freeze(101_000).unwrap();
        assert!(table.stalls.is_empty());
        let bidder = table.game.current_player;
        table.check_freeze(130_000).unwrap();
        assert_eq!(table.stalls.len(), 1);
        assert!(table.stalls[0].resolved);
        assert_ne!(table.game.current_player, bidder);
    }
}
