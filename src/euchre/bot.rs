use std::collections::HashMap;

use super::bid::{self, is_trump, BidContext, Personality};
use super::deck::{same_color, Card, Suit, ACE, KING, QUEEN};
use super::game::{partner_of, team_of, Action, BidCall, EuchreGame, Phase};
use super::rules::{self, effective_suit, value_for_card};

/// The bot's next move for the current phase, expressed as an ordinary
/// reducer action. `None` when it is not a phase bots act in.
pub fn choose_action(game: &EuchreGame) -> Option<Action> {
    let seat = game.current_player;
    match game.phase {
        Phase::Bidding => Some(Action::Bid {
            seat,
            call: choose_bid(game),
        }),
        Phase::Discard => Some(Action::Discard {
            seat,
            card_id: choose_discard(game),
        }),
        Phase::Playing => Some(Action::PlayCard {
            seat,
            card_id: choose_play(game),
        }),
        _ => None,
    }
}

fn personality(game: &EuchreGame, seat: usize) -> Personality {
    game.players[seat].personality.clone().unwrap_or_default()
}

fn bid_context(game: &EuchreGame, seat: usize, candidate: Suit) -> BidContext {
    let turned_down = game.kitty.first().map(|c| c.suit);
    BidContext {
        is_dealer: seat == game.dealer,
        is_assist: seat == partner_of(game.dealer),
        is_next_call: game.bidding_round == 2
            && seat == (game.dealer + 1) % 4
            && turned_down.map(|t| same_color(t, candidate)).unwrap_or(false),
    }
}

/// Round 1: order the upcard suit up or pass. Round 2: name the best other
/// suit or pass; sticking the dealer is the reducer's job. Bots never go
/// alone.
pub fn choose_bid(game: &EuchreGame) -> BidCall {
    let seat = game.current_player;
    let hand = &game.players[seat].hand;
    let personality = personality(game, seat);
    if game.bidding_round == 1 {
        let Some(upcard) = game.upcard else {
            return BidCall::Pass;
        };
        let decision =
            bid::should_call_trump(hand, upcard.suit, &personality, bid_context(game, seat, upcard.suit));
        if decision.call {
            return BidCall::OrderUp { alone: false };
        }
        return BidCall::Pass;
    }
    let turned_down = game.kitty.first().map(|c| c.suit);
    match bid::best_bid(hand, turned_down, &personality, |suit| {
        bid_context(game, seat, suit)
    }) {
        Some((suit, _)) => BidCall::CallSuit { suit, alone: false },
        None => BidCall::Pass,
    }
}

/// Dealer shed after picking the upcard up: lowest bare rank, nothing fancy.
pub fn choose_discard(game: &EuchreGame) -> i32 {
    let hand = &game.players[game.current_player].hand;
    hand.iter()
        .min_by_key(|c| c.value)
        .map(|c| c.id)
        .unwrap_or(-1)
}

/// Card id to play. Callers must treat an id that is no longer in hand as
/// stale and fall back to the first legal card instead of stalling.
pub fn choose_play(game: &EuchreGame) -> i32 {
    let seat = game.current_player;
    let hand = &game.players[seat].hand;
    let legal = rules::valid_plays(hand, game.lead_suit, game.trump);
    if legal.is_empty() {
        return -1;
    }
    let position = game.current_trick.iter().flatten().count();
    let chosen = match position {
        0 => choose_lead(game, seat, &legal),
        1 => choose_second(game, seat, &legal),
        _ => choose_late(game, seat, hand, &legal),
    };
    if hand.iter().any(|c| c.id == chosen.id) {
        chosen.id
    } else {
        // stale state; never stall the table over it
        legal[0].id
    }
}

fn trick_value(game: &EuchreGame, card: &Card) -> i32 {
    value_for_card(card, game.trump, game.lead_suit)
}

fn highest_by<'a>(game: &EuchreGame, cards: impl Iterator<Item = &'a Card>) -> Option<Card> {
    cards.max_by_key(|c| trick_value(game, c)).copied()
}

fn lowest_by<'a>(game: &EuchreGame, cards: impl Iterator<Item = &'a Card>) -> Option<Card> {
    cards.min_by_key(|c| trick_value(game, c)).copied()
}

fn on_making_team(game: &EuchreGame, seat: usize) -> bool {
    game.trump_caller
        .map(|maker| team_of(maker) == team_of(seat))
        .unwrap_or(false)
}

fn choose_lead(game: &EuchreGame, seat: usize, legal: &[Card]) -> Card {
    let trump = game.trump;
    let trumps: Vec<Card> = legal
        .iter()
        .filter(|c| trump.map(|t| is_trump(c, t)).unwrap_or(false))
        .copied()
        .collect();
    if on_making_team(game, seat) {
        // draw out the opponents' trump, but not from weakness
        if let Some(best_trump) = highest_by(game, trumps.iter()) {
            let strong = best_trump.value >= KING || trick_value(game, &best_trump) >= 900;
            if strong {
                return best_trump;
            }
        }
        if let Some(ace) = legal
            .iter()
            .find(|c| c.value == ACE && trump.map(|t| !is_trump(c, t)).unwrap_or(true))
        {
            return *ace;
        }
    } else if game.trump_caller == Some(game.next_seat(seat)) {
        // sitting right before the maker: lead low off-suit and make them
        // commit early
        let off: Vec<Card> = legal
            .iter()
            .filter(|c| trump.map(|t| !is_trump(c, t)).unwrap_or(true))
            .copied()
            .collect();
        if let Some(low) = lowest_by(game, off.iter()) {
            return low;
        }
    }
    highest_by(game, legal.iter()).expect("legal plays are never empty")
}

fn choose_second(game: &EuchreGame, seat: usize, legal: &[Card]) -> Card {
    let lead_card = game
        .current_trick
        .iter()
        .flatten()
        .next()
        .copied();
    if let (Some(lead_card), false) = (lead_card, on_making_team(game, seat)) {
        let lead_is_trump = game
            .trump
            .map(|t| is_trump(&lead_card, t))
            .unwrap_or(false);
        // second hand low: do not burn a bower over a weak lead
        if !lead_is_trump && lead_card.value < QUEEN {
            return lowest_by(game, legal.iter()).expect("legal plays are never empty");
        }
    }
    choose_late(game, seat, &game.players[seat].hand, legal)
}

fn choose_late(game: &EuchreGame, seat: usize, hand: &[Card], legal: &[Card]) -> Card {
    let high = game
        .current_trick
        .iter()
        .enumerate()
        .filter_map(|(player, card)| card.map(|c| (player, trick_value(game, &c))))
        .max_by_key(|&(_, value)| value);
    if let Some((high_seat, high_value)) = high {
        if high_seat == partner_of(seat) {
            // partner has the trick, sluff
            return lowest_by(game, legal.iter()).expect("legal plays are never empty");
        }
        let winners: Vec<Card> = legal
            .iter()
            .filter(|c| trick_value(game, c) > high_value)
            .copied()
            .collect();
        if let Some(cheapest) = lowest_by(game, winners.iter()) {
            return cheapest;
        }
        // can't win: shed toward a void from the longest suit
        return discard_toward_void(game, hand, legal);
    }
    highest_by(game, legal.iter()).expect("legal plays are never empty")
}

fn discard_toward_void(game: &EuchreGame, hand: &[Card], legal: &[Card]) -> Card {
    let mut suit_counts: HashMap<Suit, usize> = HashMap::new();
    for card in hand {
        *suit_counts.entry(effective_suit(card, game.trump)).or_insert(0) += 1;
    }
    *legal
        .iter()
        .max_by_key(|c| {
            let count = suit_counts
                .get(&effective_suit(c, game.trump))
                .copied()
                .unwrap_or(0);
            // most-held suit first, then the lowest rank within it
            (count, -(c.value as i64))
        })
        .expect("legal plays are never empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euchre::deck::JACK;

    fn card(suit: Suit, value: i32) -> Card {
        Card::new(suit, value)
    }

    /// A playing-phase game with rigged trick state. Seat layout: dealer 0,
    /// trump hearts called by seat 1.
    fn playing_game() -> EuchreGame {
        let mut game = EuchreGame::new_with_bots();
        game.phase = Phase::Playing;
        game.dealer = 0;
        game.trump = Some(Suit::Hearts);
        game.trump_caller = Some(1);
        game.current_player = 1;
        game.lead_player = 1;
        game
    }

    #[test]
    fn test_maker_leads_high_trump() {
        let mut game = playing_game();
        game.players[1].hand = vec![
            card(Suit::Hearts, JACK),
            card(Suit::Hearts, 9),
            card(Suit::Clubs, ACE),
        ];
        let id = choose_play(&game);
        assert_eq!(id, card(Suit::Hearts, JACK).id);
    }

    #[test]
    fn test_maker_with_weak_trump_leads_off_ace() {
        let mut game = playing_game();
        game.players[1].hand = vec![
            card(Suit::Hearts, 10),
            card(Suit::Clubs, ACE),
            card(Suit::Spades, 9),
        ];
        let id = choose_play(&game);
        assert_eq!(id, card(Suit::Clubs, ACE).id);
    }

    #[test]
    fn test_defender_before_maker_leads_low() {
        let mut game = playing_game();
        // seat 0 defends and sits right before the maker at seat 1
        game.current_player = 0;
        game.players[0].hand = vec![
            card(Suit::Clubs, ACE),
            card(Suit::Spades, 9),
            card(Suit::Hearts, KING),
        ];
        let id = choose_play(&game);
        assert_eq!(id, card(Suit::Spades, 9).id);
    }

    #[test]
    fn test_second_hand_low_preserves_right_bower() {
        let mut game = playing_game();
        // seat 1 led a weak club; seat 2 defends holding the right bower and
        // clubs
        game.current_trick[1] = Some(card(Suit::Clubs, 9));
        game.lead_suit = Some(Suit::Clubs);
        game.current_player = 2;
        game.trump_caller = Some(1);
        game.players[2].hand = vec![
            card(Suit::Clubs, 10),
            card(Suit::Clubs, ACE),
            card(Suit::Hearts, JACK),
        ];
        let id = choose_play(&game);
        assert_eq!(id, card(Suit::Clubs, 10).id);
    }

    #[test]
    fn test_sluffs_when_partner_has_the_trick() {
        let mut game = playing_game();
        // partner of seat 3 is seat 1, who holds the best card so far
        game.current_trick[1] = Some(card(Suit::Clubs, ACE));
        game.current_trick[2] = Some(card(Suit::Clubs, 9));
        game.lead_suit = Some(Suit::Clubs);
        game.current_player = 3;
        game.players[3].hand = vec![
            card(Suit::Clubs, KING),
            card(Suit::Clubs, 10),
            card(Suit::Hearts, ACE),
        ];
        let id = choose_play(&game);
        assert_eq!(id, card(Suit::Clubs, 10).id);
    }

    #[test]
    fn test_wins_with_cheapest_winning_card() {
        let mut game = playing_game();
        game.current_trick[1] = Some(card(Suit::Clubs, QUEEN));
        game.current_trick[2] = Some(card(Suit::Clubs, 9));
        game.lead_suit = Some(Suit::Clubs);
        game.current_player = 0;
        // seat 2 is seat 0's partner but seat 1 holds the high card
        game.players[0].hand = vec![
            card(Suit::Clubs, ACE),
            card(Suit::Clubs, KING),
            card(Suit::Clubs, 10),
        ];
        let id = choose_play(&game);
        assert_eq!(id, card(Suit::Clubs, KING).id);
    }

    #[test]
    fn test_discards_from_longest_suit_when_beaten() {
        let mut game = playing_game();
        game.current_trick[1] = Some(card(Suit::Hearts, JACK));
        game.lead_suit = Some(Suit::Hearts);
        game.current_player = 2;
        // void in hearts, cannot beat the right bower; sheds the low spade to
        // work toward a void
        game.players[2].hand = vec![
            card(Suit::Spades, KING),
            card(Suit::Spades, 10),
            card(Suit::Spades, 9),
            card(Suit::Clubs, QUEEN),
        ];
        let id = choose_play(&game);
        assert_eq!(id, card(Suit::Spades, 9).id);
    }

    #[test]
    fn test_bot_bids_powerhouse_and_passes_trash() {
        let mut game = EuchreGame::new_with_bots();
        game.phase = Phase::Bidding;
        game.bidding_round = 1;
        game.dealer = 0;
        game.current_player = 1;
        game.upcard = Some(card(Suit::Hearts, 10));
        game.kitty = vec![card(Suit::Hearts, 10)];
        game.players[1].hand = vec![
            card(Suit::Hearts, JACK),
            card(Suit::Diamonds, JACK),
            card(Suit::Hearts, ACE),
            card(Suit::Hearts, KING),
            card(Suit::Clubs, ACE),
        ];
        assert_eq!(choose_bid(&game), BidCall::OrderUp { alone: false });

        game.players[1].hand = vec![
            card(Suit::Hearts, 9),
            card(Suit::Clubs, 9),
            card(Suit::Diamonds, 9),
            card(Suit::Spades, 10),
            card(Suit::Spades, 9),
        ];
        assert_eq!(choose_bid(&game), BidCall::Pass);
    }

    #[test]
    fn test_round_two_bid_never_names_turned_down_suit() {
        let mut game = EuchreGame::new_with_bots();
        game.phase = Phase::Bidding;
        game.bidding_round = 2;
        game.dealer = 0;
        game.current_player = 1;
        game.upcard = None;
        game.kitty = vec![card(Suit::Hearts, 10)];
        game.players[1].hand = vec![
            card(Suit::Hearts, JACK),
            card(Suit::Diamonds, JACK),
            card(Suit::Diamonds, ACE),
            card(Suit::Diamonds, KING),
            card(Suit::Clubs, ACE),
        ];
        match choose_bid(&game) {
            BidCall::Pass => {}
            BidCall::CallSuit { suit, .. } => assert_ne!(suit, Suit::Hearts),
            BidCall::OrderUp { .. } => panic!("round 2 cannot order up"),
        }
    }

    #[test]
    fn test_discard_is_lowest_rank() {
        let mut game = EuchreGame::new_with_bots();
        game.phase = Phase::Discard;
        game.current_player = 0;
        game.players[0].hand = vec![
            card(Suit::Hearts, ACE),
            card(Suit::Clubs, 9),
            card(Suit::Spades, QUEEN),
        ];
        assert_eq!(choose_discard(&game), card(Suit::Clubs, 9).id);
    }

    #[test]
    fn test_choose_action_matches_phase() {
        let mut game = playing_game();
        game.players[1].hand = vec![card(Suit::Hearts, 9)];
        match choose_action(&game) {
            Some(Action::PlayCard { seat: 1, .. }) => {}
            other => panic!("expected a play, got {:?}", other),
        }
        game.phase = Phase::WaitingForTrick;
        assert_eq!(choose_action(&game), None);
    }

    #[test]
    fn test_bot_moves_are_always_legal() {
        // drive full bot games and assert the reducer accepts every move
        for _ in 0..5 {
            let mut game = EuchreGame::new_with_bots();
            game.with_no_changes();
            game = game.clone_and_apply(&Action::DealHand { payload: None });
            let mut guard = 0;
            while game.phase != Phase::GameOver {
                guard += 1;
                assert!(guard < 20_000, "bot game should terminate");
                let action = match game.phase {
                    Phase::WaitingForTrick => Action::ClearTrick,
                    Phase::Scoring => Action::FinishHand,
                    Phase::WaitingForNextDeal => Action::DealHand { payload: None },
                    _ => choose_action(&game).expect("bots act in every live phase"),
                };
                let next = game.try_apply(&action).expect("bot actions are legal");
                game = next;
            }
            assert!(game.scores.iter().any(|&s| s >= 10));
        }
    }
}
