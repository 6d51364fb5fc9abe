use enum_iterator::{all, Sequence};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const JACK: i32 = 11;
pub const QUEEN: i32 = 12;
pub const KING: i32 = 13;
pub const ACE: i32 = 14;

pub const DECK_SIZE: usize = 24;
pub const HAND_SIZE: usize = 5;
pub const KITTY_SIZE: usize = 4;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Suit {
    #[default]
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

impl Suit {
    pub fn color(&self) -> Color {
        match self {
            Suit::Hearts | Suit::Diamonds => Color::Red,
            Suit::Clubs | Suit::Spades => Color::Black,
        }
    }

    /// The other suit of the same color; the suit the left bower comes from.
    pub fn same_color_suit(&self) -> Suit {
        match self {
            Suit::Hearts => Suit::Diamonds,
            Suit::Diamonds => Suit::Hearts,
            Suit::Clubs => Suit::Spades,
            Suit::Spades => Suit::Clubs,
        }
    }

    fn index(&self) -> i32 {
        match self {
            Suit::Hearts => 0,
            Suit::Diamonds => 1,
            Suit::Clubs => 2,
            Suit::Spades => 3,
        }
    }
}

pub fn same_color(suita: Suit, suitb: Suit) -> bool {
    suita != suitb && suita.color() == suitb.color()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i32,
    pub suit: Suit,
    pub value: i32,
}

impl Card {
    pub fn new(suit: Suit, value: i32) -> Card {
        Card {
            id: suit.index() * 6 + (value - 9),
            suit,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("expected a deck of {DECK_SIZE} cards, got {0}")]
    WrongSize(usize),
}

/// The 24 canonical cards (9 through ace in 4 suits) with deterministic ids.
pub fn create_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for suit in all::<Suit>() {
        for value in 9..=ACE {
            deck.push(Card::new(suit, value));
        }
    }
    deck
}

/// Uniform random permutation of the deck. The input is left untouched.
pub fn shuffle_deck(deck: &[Card], rng: &mut impl Rng) -> Vec<Card> {
    let mut shuffled = deck.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub hands: [Vec<Card>; 4],
    pub kitty: Vec<Card>,
}

impl Deal {
    /// The top card of the kitty, turned face-up to start round-1 bidding.
    pub fn upcard(&self) -> Card {
        self.kitty[0]
    }
}

/// Deal 5 cards to each of 4 players round-robin; the remaining 4 form the
/// kitty. Only the first kitty card is ever revealed.
pub fn deal_hands(deck: &[Card]) -> Result<Deal, DeckError> {
    if deck.len() != DECK_SIZE {
        return Err(DeckError::WrongSize(deck.len()));
    }
    let mut cards = deck.to_vec();
    let mut hands: [Vec<Card>; 4] = [vec![], vec![], vec![], vec![]];
    for _ in 0..HAND_SIZE {
        for hand in &mut hands {
            hand.push(cards.pop().expect("the deck should have enough cards"));
        }
    }
    cards.reverse();
    Ok(Deal {
        hands,
        kitty: cards,
    })
}
