use serde::{Deserialize, Serialize};

use super::bot;
use super::game::{Action, EuchreGame, Phase};

/// How long a table may sit unchanged before it is declared stuck.
/// Chosen empirically; exposed as a tunable on [`FreezeDetector`].
pub const DEFAULT_STALL_THRESHOLD_MS: u64 = 15_000;

/// What the detector looks at: just enough of the live state to tell
/// "thinking" apart from "wedged".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub phase: Phase,
    pub current_player: usize,
    pub current_is_bot: bool,
    pub last_active: u64,
    pub is_loner: bool,
    pub trump_caller: Option<usize>,
    pub sitting_out: Option<usize>,
    pub overlay_pending: bool,
    pub trick_len: usize,
    pub taken_at: u64,
}

impl Snapshot {
    pub fn capture(game: &EuchreGame, now_ms: u64) -> Snapshot {
        Snapshot {
            phase: game.phase,
            current_player: game.current_player,
            current_is_bot: game.current_player_is_bot(),
            last_active: game.last_active,
            is_loner: game.is_loner,
            trump_caller: game.trump_caller,
            sitting_out: game.sitting_out(),
            overlay_pending: game.overlay_message.is_some(),
            trick_len: game.current_trick.iter().flatten().count(),
            taken_at: now_ms,
        }
    }

    fn same_position(&self, other: &Snapshot) -> bool {
        self.phase == other.phase && self.current_player == other.current_player
    }
}

/// The corrective action class for a diagnosed stall. Ordered: the first
/// matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Remedy {
    ForceDeal,
    ClearTrick,
    FinishHand,
    AdvancePastPartner,
    ForcePass,
    ForceDiscard,
    ForceBotPlay,
    ClearOverlay,
}

/// Audit record for one detected stall and the remedy applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StallRecord {
    pub at_ms: u64,
    pub phase: Phase,
    pub remedy: Remedy,
    pub resolved: bool,
}

/// Periodic consistency check over a replicated table. The detector only ever
/// observes and proposes ordinary reducer actions; it never mutates state
/// itself, so the single-writer shape of the engine is preserved.
#[derive(Debug, Clone)]
pub struct FreezeDetector {
    threshold_ms: u64,
    last: Option<Snapshot>,
}

impl Default for FreezeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FreezeDetector {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_STALL_THRESHOLD_MS)
    }

    pub fn with_threshold(threshold_ms: u64) -> Self {
        FreezeDetector {
            threshold_ms,
            last: None,
        }
    }

    /// Feed one periodic snapshot. Returns a remedy when the table has sat in
    /// the same phase and turn past the stall threshold.
    pub fn observe(&mut self, game: &EuchreGame, now_ms: u64) -> Option<Remedy> {
        let snapshot = Snapshot::capture(game, now_ms);
        let previous = self.last.replace(snapshot);
        let previous = previous?;
        if !snapshot.same_position(&previous) {
            return None;
        }
        if now_ms.saturating_sub(snapshot.last_active) <= self.threshold_ms {
            return None;
        }
        let remedy = diagnose(&snapshot);
        if let Some(remedy) = remedy {
            tracing::warn!(
                phase = ?snapshot.phase,
                current_player = snapshot.current_player,
                ?remedy,
                "table stalled, proposing remedy"
            );
        }
        remedy
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// The remedy table. First matching rule wins; unmatched stalls (e.g. a human
/// taking their time in the lobby) are left alone.
fn diagnose(snapshot: &Snapshot) -> Option<Remedy> {
    match snapshot.phase {
        Phase::WaitingForNextDeal | Phase::RandomizingDealer => Some(Remedy::ForceDeal),
        Phase::WaitingForTrick => Some(Remedy::ClearTrick),
        Phase::Scoring => Some(Remedy::FinishHand),
        _ => {
            if snapshot.sitting_out == Some(snapshot.current_player) {
                // rotation landed on the loner's partner, who will never act
                return Some(Remedy::AdvancePastPartner);
            }
            if !snapshot.current_is_bot {
                return None;
            }
            match snapshot.phase {
                Phase::Bidding => Some(Remedy::ForcePass),
                Phase::Discard => Some(Remedy::ForceDiscard),
                Phase::Playing => {
                    if snapshot.overlay_pending {
                        // an unacknowledged overlay is holding the bot's
                        // client back
                        Some(Remedy::ClearOverlay)
                    } else {
                        Some(Remedy::ForceBotPlay)
                    }
                }
                _ => None,
            }
        }
    }
}

/// Turn a remedy into the concrete action to dispatch against the table.
pub fn remedy_action(game: &EuchreGame, remedy: Remedy) -> Option<Action> {
    match remedy {
        Remedy::ForceDeal => Some(Action::DealHand { payload: None }),
        Remedy::ClearTrick => Some(Action::ClearTrick),
        Remedy::FinishHand => Some(Action::FinishHand),
        Remedy::AdvancePastPartner => Some(Action::AdvancePlayer),
        Remedy::ForcePass => Some(Action::Bid {
            seat: game.current_player,
            call: super::game::BidCall::Pass,
        }),
        Remedy::ForceDiscard => Some(Action::Discard {
            seat: game.current_player,
            card_id: bot::choose_discard(game),
        }),
        Remedy::ForceBotPlay => bot::choose_action(game),
        Remedy::ClearOverlay => Some(Action::ClearOverlay),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euchre::game::{Action, BidCall};

    fn stalled_detector() -> FreezeDetector {
        FreezeDetector::with_threshold(10_000)
    }

    fn bot_table_in_bidding() -> EuchreGame {
        let mut game = EuchreGame::new_with_bots();
        game = game.clone_and_apply(&Action::DealHand { payload: None });
        game
    }

    #[test]
    fn test_no_stall_before_threshold() {
        let mut game = bot_table_in_bidding();
        game.last_active = 100_000;
        let mut detector = stalled_detector();
        assert_eq!(detector.observe(&game, 101_000), None);
        assert_eq!(detector.observe(&game, 105_000), None);
    }

    #[test]
    fn test_first_snapshot_never_stalls() {
        let mut game = bot_table_in_bidding();
        game.last_active = 0;
        let mut detector = stalled_detector();
        // well past the threshold, but there is no previous snapshot yet
        assert_eq!(detector.observe(&game, 500_000), None);
    }

    #[test]
    fn test_progress_resets_detection() {
        let mut game = bot_table_in_bidding();
        game.last_active = 100_000;
        let mut detector = stalled_detector();
        assert_eq!(detector.observe(&game, 101_000), None);
        // the table moved on between checks
        let moved = game.clone_and_apply(&Action::Bid {
            seat: game.current_player,
            call: BidCall::Pass,
        });
        assert_eq!(detector.observe(&moved, 200_000), None);
    }

    #[test]
    fn test_stuck_bot_bidding_forces_pass() {
        let mut game = bot_table_in_bidding();
        game.last_active = 100_000;
        let mut detector = stalled_detector();
        assert_eq!(detector.observe(&game, 101_000), None);
        let remedy = detector.observe(&game, 120_000);
        assert_eq!(remedy, Some(Remedy::ForcePass));
        let action = remedy_action(&game, remedy.unwrap()).unwrap();
        let next = game.clone_and_apply(&action);
        assert_ne!(next.current_player, game.current_player);
    }

    #[test]
    fn test_stuck_bot_playing_forces_legal_play() {
        let mut game = bot_table_in_bidding();
        // drive to the playing phase with bot bids
        let mut guard = 0;
        while game.phase != crate::euchre::Phase::Playing {
            guard += 1;
            assert!(guard < 20);
            let action = crate::euchre::bot::choose_action(&game).unwrap();
            game = game.clone_and_apply(&action);
        }
        // the trump announcement overlay would otherwise be diagnosed first
        game = game.clone_and_apply(&Action::ClearOverlay);
        game.last_active = 100_000;
        let mut detector = stalled_detector();
        assert_eq!(detector.observe(&game, 101_000), None);
        let remedy = detector.observe(&game, 120_000).unwrap();
        assert_eq!(remedy, Remedy::ForceBotPlay);
        let action = remedy_action(&game, remedy).unwrap();
        let next = game.try_apply(&action).expect("forced play must be legal");
        assert_ne!(next.current_player, game.current_player);
        assert_eq!(
            next.current_trick.iter().flatten().count(),
            game.current_trick.iter().flatten().count() + 1
        );
    }

    #[test]
    fn test_stuck_phases_map_to_structural_remedies() {
        let cases = [
            (crate::euchre::Phase::WaitingForNextDeal, Remedy::ForceDeal),
            (crate::euchre::Phase::WaitingForTrick, Remedy::ClearTrick),
            (crate::euchre::Phase::Scoring, Remedy::FinishHand),
        ];
        for (phase, expected) in cases {
            let mut game = bot_table_in_bidding();
            game.phase = phase;
            game.last_active = 100_000;
            let mut detector = stalled_detector();
            assert_eq!(detector.observe(&game, 101_000), None);
            assert_eq!(detector.observe(&game, 120_000), Some(expected), "{:?}", phase);
        }
    }

    #[test]
    fn test_stuck_on_sitting_out_partner_advances() {
        let mut game = bot_table_in_bidding();
        game.phase = crate::euchre::Phase::Playing;
        game.trump = Some(crate::euchre::Suit::Hearts);
        game.trump_caller = Some(0);
        game.is_loner = true;
        // a stale replica left the turn on the partner who is sitting out
        game.current_player = 2;
        game.last_active = 100_000;
        let mut detector = stalled_detector();
        assert_eq!(detector.observe(&game, 101_000), None);
        let remedy = detector.observe(&game, 120_000).unwrap();
        assert_eq!(remedy, Remedy::AdvancePastPartner);
        let next = game.clone_and_apply(&remedy_action(&game, remedy).unwrap());
        assert_ne!(next.current_player, 2);
    }

    #[test]
    fn test_overlay_blocking_bot_play_is_cleared() {
        let mut game = bot_table_in_bidding();
        game.phase = crate::euchre::Phase::Playing;
        game.trump = Some(crate::euchre::Suit::Hearts);
        game.trump_caller = Some(0);
        game.overlay_message = Some("Team 1 scores".into());
        game.last_active = 100_000;
        let mut detector = stalled_detector();
        assert_eq!(detector.observe(&game, 101_000), None);
        let remedy = detector.observe(&game, 120_000).unwrap();
        assert_eq!(remedy, Remedy::ClearOverlay);
        let next = game.clone_and_apply(&remedy_action(&game, remedy).unwrap());
        assert!(next.overlay_message.is_none());
    }
}
