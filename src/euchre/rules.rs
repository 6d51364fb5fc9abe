use std::cmp::Reverse;
use std::collections::HashMap;

use super::deck::{same_color, Card, Suit, JACK};

/// A card's suit for play purposes: the left bower counts as trump.
pub fn effective_suit(card: &Card, trump: Option<Suit>) -> Suit {
    match trump {
        Some(trump) if card.value == JACK && same_color(card.suit, trump) => trump,
        _ => card.suit,
    }
}

/// Relative strength of a card in a trick.
/// Right bower beats everything, then the left bower, then the rest of the
/// trump suit, then the lead suit, then everything else by bare rank.
pub fn value_for_card(card: &Card, trump: Option<Suit>, lead: Option<Suit>) -> i32 {
    if let Some(trump) = trump {
        if card.value == JACK && card.suit == trump {
            return 1000;
        }
        if card.value == JACK && same_color(card.suit, trump) {
            return 900;
        }
        if card.suit == trump {
            return card.value + 500;
        }
    }
    if Some(card.suit) == lead {
        return card.value + 100;
    }
    card.value
}

/// Whether a card may legally be played from `hand`. Following the effective
/// lead suit is mandatory when the hand can.
pub fn is_valid_play(card: &Card, hand: &[Card], lead: Option<Suit>, trump: Option<Suit>) -> bool {
    let Some(lead) = lead else {
        // no lead suit established, anything goes
        return true;
    };
    let can_follow = hand.iter().any(|c| effective_suit(c, trump) == lead);
    if !can_follow {
        return true;
    }
    effective_suit(card, trump) == lead
}

/// The legal subset of a hand given the current lead and trump.
pub fn valid_plays(hand: &[Card], lead: Option<Suit>, trump: Option<Suit>) -> Vec<Card> {
    if let Some(lead) = lead {
        let following: Vec<Card> = hand
            .iter()
            .filter(|c| effective_suit(c, trump) == lead)
            .copied()
            .collect();
        if !following.is_empty() {
            return following;
        }
    }
    hand.to_vec()
}

/// Seat of the winning card. Ranks and ids are unique within a trick so there
/// are no ties.
pub fn trick_winner(trick: &[Option<Card>; 4], trump: Option<Suit>, lead: Option<Suit>) -> usize {
    let mut card_id_to_player: HashMap<i32, usize> = HashMap::new();
    for (player, card) in trick.iter().enumerate() {
        if let Some(card) = card {
            card_id_to_player.insert(card.id, player);
        }
    }
    let mut cards: Vec<Card> = trick.iter().filter_map(|&c| c).collect();
    cards.sort_by_key(|c| Reverse(value_for_card(c, trump, lead)));
    *card_id_to_player
        .get(&cards.first().expect("there should be a winning card").id)
        .expect("card_id_to_player missing card")
}

/// Display ordering: trump first (bowers on top), then the remaining suits in
/// a fixed order, high to low within each suit. Not a rules invariant.
pub fn sort_hand(hand: &mut [Card], trump: Option<Suit>) {
    hand.sort_by_key(|c| {
        let suit = effective_suit(c, trump);
        let suit_rank = match trump {
            Some(trump) if suit == trump => -1,
            _ => match suit {
                Suit::Hearts => 0,
                Suit::Clubs => 1,
                Suit::Diamonds => 2,
                Suit::Spades => 3,
            },
        };
        (suit_rank, Reverse(value_for_card(c, trump, None)))
    });
}
