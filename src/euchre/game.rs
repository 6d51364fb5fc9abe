use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bid::{Personality, ARCHETYPES};
use super::deck::{create_deck, deal_hands, shuffle_deck, Card, DeckError, Suit, DECK_SIZE,
    HAND_SIZE, KITTY_SIZE};
use super::rules;
use super::stats::PlayerStats;

pub const WINNING_SCORE: i32 = 10;
pub const TRICKS_PER_HAND: i32 = 5;
const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Lobby,
    RandomizingDealer,
    Bidding,
    Discard,
    Playing,
    WaitingForTrick,
    Scoring,
    WaitingForNextDeal,
    GameOver,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    #[default]
    Shuffle,
    Deal,
    Upcard,
    PickUp,
    Discard,
    Play,
    TricksToWinner,
    Score,
    Message,
    GameOver,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum Location {
    #[default]
    Deck,
    Hand,
    Kitty,
    Play,
    DiscardPile,
    TricksTaken,
    Score,
    Message,
}

/// One normalized entry in the append-only event log. The UI replays these as
/// animations; tools replay them as an audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    #[serde(rename(serialize = "type", deserialize = "type"))]
    pub change_type: ChangeType,
    object_id: i32,
    dest: Location,
    player: usize,
    tricks_taken: i32,
    start_score: i32,
    end_score: i32,
    message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: usize,
    pub name: Option<String>,
    pub is_computer: bool,
    pub hand: Vec<Card>,
    pub stats: PlayerStats,
    pub personality: Option<Personality>,
}

impl Player {
    pub fn is_seated(&self) -> bool {
        self.name.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandResult {
    pub dealer: usize,
    pub maker: usize,
    pub trump: Suit,
    pub is_loner: bool,
    pub tricks: [i32; 4],
    pub winning_team: usize,
    pub points: i32,
    pub euchre: bool,
    pub sweep: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BidCall {
    Pass,
    /// Round 1: order the upcard's suit up to the dealer.
    OrderUp { alone: bool },
    /// Round 2: name any suit other than the turned-down one.
    CallSuit { suit: Suit, alone: bool },
}

/// An externally dealt hand, e.g. from whichever client won the race to deal.
/// Structurally invalid payloads fall back to a local deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealPayload {
    pub dealer: usize,
    pub hands: [Vec<Card>; 4],
    pub kitty: Vec<Card>,
}

impl DealPayload {
    fn is_structurally_valid(&self) -> bool {
        if self.dealer > 3
            || self.kitty.len() != KITTY_SIZE
            || self.hands.iter().any(|h| h.len() != HAND_SIZE)
        {
            return false;
        }
        let ids: HashSet<i32> = self
            .hands
            .iter()
            .flatten()
            .chain(self.kitty.iter())
            .map(|c| c.id)
            .collect();
        ids.len() == DECK_SIZE
    }
}

/// Everything a client (or a diagnostic tool) may legally do to a table.
/// Freeze-recovery remedies are expressed in this same vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Action {
    JoinSeat {
        seat: usize,
        name: String,
        is_computer: bool,
        personality: Option<Personality>,
    },
    LeaveSeat {
        seat: usize,
    },
    StartGame,
    DealHand {
        payload: Option<DealPayload>,
    },
    Bid {
        seat: usize,
        call: BidCall,
    },
    Discard {
        seat: usize,
        card_id: i32,
    },
    PlayCard {
        seat: usize,
        card_id: i32,
    },
    ClearTrick,
    FinishHand,
    AdvancePlayer,
    AcknowledgeOverlay {
        seat: usize,
    },
    ClearOverlay,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("action is not valid during {0:?}")]
    WrongPhase(Phase),
    #[error("seat {0} is out of range")]
    SeatOutOfRange(usize),
    #[error("seat {0} is already occupied")]
    SeatOccupied(usize),
    #[error("it is seat {current}'s turn, not seat {seat}'s")]
    NotYourTurn { seat: usize, current: usize },
    #[error("card {card_id} is not in seat {seat}'s hand")]
    CardNotInHand { seat: usize, card_id: i32 },
    #[error("card {card_id} does not follow the lead suit")]
    MustFollowSuit { card_id: i32 },
    #[error("that bid is not allowed in round {round}")]
    IllegalBid { round: u8 },
    #[error("the table needs 4 seated players to start")]
    TableNotFull,
    #[error("no hand result is pending")]
    NothingToScore,
    #[error(transparent)]
    Deck(#[from] DeckError),
}

/// The single source of truth for one table. Mutation happens only through
/// [`EuchreGame::clone_and_apply`], which replaces the whole state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EuchreGame {
    pub phase: Phase,
    pub players: [Player; 4],
    pub dealer: usize,
    pub current_player: usize,
    pub upcard: Option<Card>,
    pub kitty: Vec<Card>,
    pub discards: Vec<Card>,
    pub bidding_round: u8,
    pub trump: Option<Suit>,
    pub trump_caller: Option<usize>,
    pub is_loner: bool,
    pub current_trick: [Option<Card>; 4],
    pub lead_player: usize,
    pub lead_suit: Option<Suit>,
    pub tricks_won: [i32; 4],
    pub scores: [i32; 2],
    pub pending_result: Option<HandResult>,
    /// Most recent hand results, newest last, bounded.
    pub history: Vec<HandResult>,
    /// Batches of event-log entries produced by the last transition.
    pub changes: Vec<Vec<Change>>,
    /// Skip building changes, used to speed up simulations.
    #[serde(default)]
    pub no_changes: bool,
    pub overlay_message: Option<String>,
    pub overlay_acks: HashSet<usize>,
    pub winner: Option<usize>,
    pub last_active: u64,
}

pub fn partner_of(seat: usize) -> usize {
    (seat + 2) % 4
}

pub fn team_of(seat: usize) -> usize {
    seat % 2
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Point award once the calling team's trick count is known.
/// Returns (makers_won, points).
pub fn points_for_hand(maker_tricks: i32, is_loner: bool) -> (bool, i32) {
    if maker_tricks < 3 {
        // euchre
        return (false, 2);
    }
    if maker_tricks == TRICKS_PER_HAND {
        if is_loner {
            return (true, 4);
        }
        return (true, 2);
    }
    (true, 1)
}

impl EuchreGame {
    pub fn new() -> Self {
        Self {
            changes: vec![vec![]],
            ..Default::default()
        }
    }

    /// Table ready for play: four seated bots cycling through the archetype
    /// table, useful for simulations and tests.
    pub fn new_with_bots() -> Self {
        let mut game = Self::new();
        for seat in 0..4 {
            game = game.clone_and_apply(&Action::JoinSeat {
                seat,
                name: format!("bot-{}", seat),
                is_computer: true,
                personality: Some(ARCHETYPES[seat % ARCHETYPES.len()].clone()),
            });
        }
        game.clone_and_apply(&Action::StartGame)
    }

    pub fn with_no_changes(&mut self) {
        self.no_changes = true;
    }

    /// The pure reducer. Invalid or out-of-phase actions leave the state
    /// unchanged; nothing here ever panics past this boundary.
    pub fn clone_and_apply(&self, action: &Action) -> Self {
        match self.try_apply(action) {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!(?action, %err, "rejected action");
                self.clone()
            }
        }
    }

    /// Same as [`clone_and_apply`](Self::clone_and_apply) but surfaces the
    /// rejection reason.
    pub fn try_apply(&self, action: &Action) -> Result<Self, EngineError> {
        let mut next = self.clone();
        next.changes = vec![vec![]];
        next.apply_internal(action)?;
        next.last_active = now_millis();
        Ok(next)
    }

    fn apply_internal(&mut self, action: &Action) -> Result<(), EngineError> {
        match action {
            Action::JoinSeat {
                seat,
                name,
                is_computer,
                personality,
            } => self.join_seat(*seat, name.clone(), *is_computer, personality.clone()),
            Action::LeaveSeat { seat } => self.leave_seat(*seat),
            Action::StartGame => self.start_game(),
            Action::DealHand { payload } => self.deal_hand(payload.as_ref()),
            Action::Bid { seat, call } => self.bid(*seat, *call),
            Action::Discard { seat, card_id } => self.discard(*seat, *card_id),
            Action::PlayCard { seat, card_id } => self.play_card(*seat, *card_id),
            Action::ClearTrick => self.clear_trick(),
            Action::FinishHand => self.finish_hand(),
            Action::AdvancePlayer => self.advance_player(),
            Action::AcknowledgeOverlay { seat } => self.acknowledge_overlay(*seat),
            Action::ClearOverlay => {
                self.clear_overlay();
                Ok(())
            }
        }
    }

    // ----- lobby -----

    fn join_seat(
        &mut self,
        seat: usize,
        name: String,
        is_computer: bool,
        personality: Option<Personality>,
    ) -> Result<(), EngineError> {
        if self.phase != Phase::Lobby {
            return Err(EngineError::WrongPhase(self.phase));
        }
        if seat > 3 {
            return Err(EngineError::SeatOutOfRange(seat));
        }
        if self.players[seat].is_seated() {
            return Err(EngineError::SeatOccupied(seat));
        }
        self.players[seat] = Player {
            id: seat,
            name: Some(name),
            is_computer,
            personality: if is_computer {
                Some(personality.unwrap_or_default())
            } else {
                personality
            },
            ..Default::default()
        };
        Ok(())
    }

    fn leave_seat(&mut self, seat: usize) -> Result<(), EngineError> {
        if self.phase != Phase::Lobby {
            return Err(EngineError::WrongPhase(self.phase));
        }
        if seat > 3 {
            return Err(EngineError::SeatOutOfRange(seat));
        }
        self.players[seat] = Player {
            id: seat,
            ..Default::default()
        };
        Ok(())
    }

    fn start_game(&mut self) -> Result<(), EngineError> {
        if self.phase != Phase::Lobby {
            return Err(EngineError::WrongPhase(self.phase));
        }
        if !self.players.iter().all(|p| p.is_seated()) {
            return Err(EngineError::TableNotFull);
        }
        self.phase = Phase::RandomizingDealer;
        Ok(())
    }

    // ----- dealing -----

    fn deal_hand(&mut self, payload: Option<&DealPayload>) -> Result<(), EngineError> {
        match self.phase {
            Phase::RandomizingDealer | Phase::WaitingForNextDeal => {}
            _ => return Err(EngineError::WrongPhase(self.phase)),
        }
        let payload = payload.filter(|p| p.is_structurally_valid());
        if self.phase == Phase::RandomizingDealer {
            self.dealer = match payload {
                Some(p) => p.dealer,
                // deal locally rather than failing
                None => thread_rng().gen_range(0..4),
            };
        }
        let (hands, kitty) = match payload {
            Some(p) => (p.hands.clone(), p.kitty.clone()),
            None => {
                let deck = shuffle_deck(&create_deck(), &mut thread_rng());
                let deal = deal_hands(&deck)?;
                (deal.hands, deal.kitty)
            }
        };

        let shuffle_index = self.new_change();
        let deal_index = self.new_change();
        self.add_change(
            shuffle_index,
            Change {
                change_type: ChangeType::Shuffle,
                dest: Location::Deck,
                ..Default::default()
            },
        );
        for (player, hand) in hands.iter().enumerate() {
            for card in hand {
                self.add_change(
                    deal_index,
                    Change {
                        change_type: ChangeType::Deal,
                        object_id: card.id,
                        dest: Location::Hand,
                        player,
                        ..Default::default()
                    },
                );
            }
        }
        self.upcard = Some(kitty[0]);
        self.add_change(
            deal_index,
            Change {
                change_type: ChangeType::Upcard,
                object_id: kitty[0].id,
                dest: Location::Kitty,
                ..Default::default()
            },
        );

        for (player, hand) in hands.into_iter().enumerate() {
            self.players[player].hand = hand;
        }
        self.kitty = kitty;
        self.discards = vec![];
        self.bidding_round = 1;
        self.trump = None;
        self.trump_caller = None;
        self.is_loner = false;
        self.current_trick = [None; 4];
        self.lead_suit = None;
        self.tricks_won = [0; 4];
        self.pending_result = None;
        self.clear_overlay();
        self.current_player = (self.dealer + 1) % 4;
        self.lead_player = self.current_player;
        self.phase = Phase::Bidding;
        Ok(())
    }

    // ----- bidding -----

    fn bid(&mut self, seat: usize, call: BidCall) -> Result<(), EngineError> {
        if self.phase != Phase::Bidding {
            return Err(EngineError::WrongPhase(self.phase));
        }
        if seat != self.current_player {
            return Err(EngineError::NotYourTurn {
                seat,
                current: self.current_player,
            });
        }
        match call {
            BidCall::Pass => self.pass(seat),
            BidCall::OrderUp { alone } => {
                if self.bidding_round != 1 {
                    return Err(EngineError::IllegalBid {
                        round: self.bidding_round,
                    });
                }
                let Some(upcard) = self.upcard else {
                    // a corrupted or stale replica state, not a reason to
                    // panic past the reducer boundary
                    return Err(EngineError::IllegalBid { round: 1 });
                };
                self.accept_trump(seat, upcard.suit, alone);
                // the dealer picks the upcard up, out of the kitty, and must
                // shed a card
                self.players[self.dealer].hand.push(upcard);
                self.kitty.retain(|c| c.id != upcard.id);
                self.add_change(
                    0,
                    Change {
                        change_type: ChangeType::PickUp,
                        object_id: upcard.id,
                        dest: Location::Hand,
                        player: self.dealer,
                        ..Default::default()
                    },
                );
                self.upcard = None;
                self.phase = Phase::Discard;
                self.current_player = self.dealer;
                Ok(())
            }
            BidCall::CallSuit { suit, alone } => {
                let turned_down = self.kitty.first().map(|c| c.suit);
                if self.bidding_round != 2 || Some(suit) == turned_down {
                    return Err(EngineError::IllegalBid {
                        round: self.bidding_round,
                    });
                }
                self.accept_trump(seat, suit, alone);
                self.begin_play();
                Ok(())
            }
        }
    }

    fn pass(&mut self, seat: usize) -> Result<(), EngineError> {
        self.set_message(format!("{} passes", self.seat_name(seat)));
        if seat != self.dealer {
            self.current_player = (seat + 1) % 4;
            return Ok(());
        }
        if self.bidding_round == 1 {
            // upcard is turned down, a second round of bidding starts
            self.bidding_round = 2;
            self.upcard = None;
            self.current_player = (self.dealer + 1) % 4;
            return Ok(());
        }
        // stick the dealer: everyone passed twice, the dealer calls spades
        self.set_message(format!(
            "{} is stuck and calls spades",
            self.seat_name(self.dealer)
        ));
        self.accept_trump(self.dealer, Suit::Spades, false);
        self.begin_play();
        Ok(())
    }

    fn accept_trump(&mut self, seat: usize, suit: Suit, alone: bool) {
        self.trump = Some(suit);
        self.trump_caller = Some(seat);
        self.is_loner = alone;
        let announcement = if alone {
            format!("{} calls {:?} and goes alone", self.seat_name(seat), suit)
        } else {
            format!("{} calls {:?}", self.seat_name(seat), suit)
        };
        self.set_message(announcement.clone());
        self.overlay_message = Some(announcement);
        self.overlay_acks = HashSet::new();
    }

    fn begin_play(&mut self) {
        self.phase = Phase::Playing;
        self.current_player = self.next_seat(self.dealer);
        self.lead_player = self.current_player;
        self.lead_suit = None;
    }

    // ----- discard -----

    fn discard(&mut self, seat: usize, card_id: i32) -> Result<(), EngineError> {
        if self.phase != Phase::Discard {
            return Err(EngineError::WrongPhase(self.phase));
        }
        if seat != self.current_player {
            return Err(EngineError::NotYourTurn {
                seat,
                current: self.current_player,
            });
        }
        let hand = &mut self.players[seat].hand;
        let pos = hand
            .iter()
            .position(|c| c.id == card_id)
            .ok_or(EngineError::CardNotInHand { seat, card_id })?;
        let card = hand.remove(pos);
        self.discards.push(card);
        self.add_change(
            0,
            Change {
                change_type: ChangeType::Discard,
                object_id: card.id,
                dest: Location::DiscardPile,
                player: seat,
                ..Default::default()
            },
        );
        self.begin_play();
        Ok(())
    }

    // ----- trick play -----

    fn play_card(&mut self, seat: usize, card_id: i32) -> Result<(), EngineError> {
        if self.phase != Phase::Playing {
            return Err(EngineError::WrongPhase(self.phase));
        }
        if seat != self.current_player {
            return Err(EngineError::NotYourTurn {
                seat,
                current: self.current_player,
            });
        }
        let hand = self.players[seat].hand.clone();
        let card = *hand
            .iter()
            .find(|c| c.id == card_id)
            .ok_or(EngineError::CardNotInHand { seat, card_id })?;
        if !rules::is_valid_play(&card, &hand, self.lead_suit, self.trump) {
            return Err(EngineError::MustFollowSuit { card_id });
        }
        if self.lead_suit.is_none() {
            self.lead_suit = Some(rules::effective_suit(&card, self.trump));
        }
        self.players[seat].hand.retain(|c| c.id != card_id);
        self.current_trick[seat] = Some(card);
        self.add_change(
            0,
            Change {
                change_type: ChangeType::Play,
                object_id: card.id,
                dest: Location::Play,
                player: seat,
                ..Default::default()
            },
        );
        self.current_player = self.next_seat(seat);

        let played = self.current_trick.iter().flatten().count();
        if played == self.required_trick_size() {
            let winner = rules::trick_winner(&self.current_trick, self.trump, self.lead_suit);
            self.tricks_won[winner] += 1;
            self.players[winner].stats.tricks_taken += 1;
            self.lead_player = winner;
            self.phase = Phase::WaitingForTrick;
        }
        Ok(())
    }

    fn clear_trick(&mut self) -> Result<(), EngineError> {
        if self.phase != Phase::WaitingForTrick {
            return Err(EngineError::WrongPhase(self.phase));
        }
        let index = self.new_change();
        let trick = self.current_trick;
        for card in trick.iter().flatten() {
            self.add_change(
                index,
                Change {
                    change_type: ChangeType::TricksToWinner,
                    object_id: card.id,
                    dest: Location::TricksTaken,
                    player: self.lead_player,
                    tricks_taken: self.tricks_won[self.lead_player],
                    ..Default::default()
                },
            );
        }
        self.current_trick = [None; 4];
        self.lead_suit = None;

        if self.tricks_won.iter().sum::<i32>() >= TRICKS_PER_HAND {
            self.score_hand();
            return Ok(());
        }
        // winner of the trick leads
        self.phase = Phase::Playing;
        self.current_player = self.seat_or_next(self.lead_player);
        Ok(())
    }

    fn score_hand(&mut self) {
        let maker = self.trump_caller.expect("a played hand always has a maker");
        let maker_team = team_of(maker);
        let maker_tricks = self.tricks_won[maker] + self.tricks_won[partner_of(maker)];
        let (makers_won, points) = points_for_hand(maker_tricks, self.is_loner);
        let winning_team = if makers_won {
            maker_team
        } else {
            1 - maker_team
        };
        let result = HandResult {
            dealer: self.dealer,
            maker,
            trump: self.trump.expect("a played hand always has trump"),
            is_loner: self.is_loner,
            tricks: self.tricks_won,
            winning_team,
            points,
            euchre: !makers_won,
            sweep: makers_won && maker_tricks == TRICKS_PER_HAND,
        };
        let index = self.new_change();
        self.add_change(
            index,
            Change {
                change_type: ChangeType::Score,
                dest: Location::Score,
                player: winning_team,
                start_score: self.scores[winning_team],
                end_score: self.scores[winning_team] + points,
                ..Default::default()
            },
        );
        let summary = if result.euchre {
            format!("Team {} euchred the makers for {} points", winning_team + 1, points)
        } else {
            format!("Team {} scores {} point(s)", winning_team + 1, points)
        };
        self.set_message(summary.clone());
        self.overlay_message = Some(summary);
        self.overlay_acks = HashSet::new();
        self.pending_result = Some(result);
        self.phase = Phase::Scoring;
    }

    fn finish_hand(&mut self) -> Result<(), EngineError> {
        if self.phase != Phase::Scoring {
            return Err(EngineError::WrongPhase(self.phase));
        }
        let result = self.pending_result.take().ok_or(EngineError::NothingToScore)?;
        self.scores[result.winning_team] += result.points;

        for seat in 0..4 {
            let stats = &mut self.players[seat].stats;
            stats.hands_played += 1;
            if seat == result.maker {
                stats.trumps_called += 1;
                if result.is_loner {
                    stats.loners_called += 1;
                }
            }
            if team_of(seat) == result.winning_team {
                if result.euchre {
                    stats.euchres_inflicted += 1;
                }
                if result.sweep {
                    stats.sweeps += 1;
                }
            }
        }

        self.history.push(result);
        if self.history.len() > HISTORY_LIMIT {
            let overflow = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..overflow);
        }

        // trump only exists while a hand is live
        self.trump = None;
        self.trump_caller = None;
        self.is_loner = false;
        self.upcard = None;
        self.clear_overlay();
        self.dealer = (self.dealer + 1) % 4;

        if let Some(winning_team) = self.scores.iter().position(|&s| s >= WINNING_SCORE) {
            self.winner = Some(winning_team);
            self.phase = Phase::GameOver;
            for seat in 0..4 {
                let stats = &mut self.players[seat].stats;
                stats.games_played += 1;
                if team_of(seat) == winning_team {
                    stats.games_won += 1;
                }
            }
            let index = self.new_change();
            self.add_change(
                index,
                Change {
                    change_type: ChangeType::GameOver,
                    dest: Location::Score,
                    player: winning_team,
                    ..Default::default()
                },
            );
            self.set_message(format!("Team {} wins the game", winning_team + 1));
        } else {
            self.phase = Phase::WaitingForNextDeal;
        }
        Ok(())
    }

    // ----- recovery helpers -----

    fn advance_player(&mut self) -> Result<(), EngineError> {
        match self.phase {
            Phase::Bidding | Phase::Discard | Phase::Playing => {
                self.current_player = self.next_seat(self.current_player);
                Ok(())
            }
            _ => Err(EngineError::WrongPhase(self.phase)),
        }
    }

    fn acknowledge_overlay(&mut self, seat: usize) -> Result<(), EngineError> {
        if seat > 3 {
            return Err(EngineError::SeatOutOfRange(seat));
        }
        if self.overlay_message.is_none() {
            return Ok(());
        }
        self.overlay_acks.insert(seat);
        let humans: HashSet<usize> = (0..4)
            .filter(|&s| self.players[s].is_seated() && !self.players[s].is_computer)
            .collect();
        if humans.is_subset(&self.overlay_acks) {
            self.clear_overlay();
        }
        Ok(())
    }

    fn clear_overlay(&mut self) {
        self.overlay_message = None;
        self.overlay_acks = HashSet::new();
    }

    // ----- shared helpers -----

    /// The loner's partner sits the hand out entirely.
    pub fn sitting_out(&self) -> Option<usize> {
        if self.is_loner {
            self.trump_caller.map(partner_of)
        } else {
            None
        }
    }

    pub fn next_seat(&self, seat: usize) -> usize {
        let mut next = (seat + 1) % 4;
        if Some(next) == self.sitting_out() {
            next = (next + 1) % 4;
        }
        next
    }

    fn seat_or_next(&self, seat: usize) -> usize {
        if Some(seat) == self.sitting_out() {
            self.next_seat(seat)
        } else {
            seat
        }
    }

    pub fn required_trick_size(&self) -> usize {
        if self.is_loner {
            3
        } else {
            4
        }
    }

    pub fn seat_name(&self, seat: usize) -> String {
        self.players[seat]
            .name
            .clone()
            .unwrap_or_else(|| format!("seat {}", seat))
    }

    pub fn current_player_is_bot(&self) -> bool {
        self.players[self.current_player].is_computer
    }

    /// Ids of every card the current player may legally play.
    pub fn playable_card_ids(&self) -> Vec<i32> {
        rules::valid_plays(
            &self.players[self.current_player].hand,
            self.lead_suit,
            self.trump,
        )
        .iter()
        .map(|c| c.id)
        .collect()
    }

    #[inline]
    fn new_change(&mut self) -> usize {
        self.changes.push(vec![]);
        self.changes.len() - 1
    }

    #[inline]
    fn add_change(&mut self, index: usize, change: Change) {
        if self.no_changes {
            return;
        }
        if self.changes.is_empty() {
            self.changes.push(vec![]);
        }
        self.changes[index].push(change);
    }

    fn set_message(&mut self, message: String) {
        let index = self.changes.len().saturating_sub(1);
        self.add_change(
            index,
            Change {
                change_type: ChangeType::Message,
                dest: Location::Message,
                message: Some(message),
                ..Default::default()
            },
        );
    }
}
