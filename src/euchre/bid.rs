use enum_iterator::all;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::deck::{same_color, Card, Suit, ACE, JACK, KING};

const BASE_THRESHOLD: f64 = 7.0;
const POWERHOUSE_STRENGTH: f64 = 8.5;
const MIN_TRUMP_COUNT: usize = 2;

/// Bot archetype. Aggressiveness runs 0 (timid) to 10 (reckless); 5 bids at
/// the base threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personality {
    pub name: String,
    pub aggressiveness: i32,
}

impl Default for Personality {
    fn default() -> Self {
        Personality {
            name: "steady".to_string(),
            aggressiveness: 5,
        }
    }
}

pub static ARCHETYPES: Lazy<Vec<Personality>> = Lazy::new(|| {
    vec![
        Personality {
            name: "cautious".to_string(),
            aggressiveness: 3,
        },
        Personality {
            name: "steady".to_string(),
            aggressiveness: 5,
        },
        Personality {
            name: "bold".to_string(),
            aggressiveness: 7,
        },
        Personality {
            name: "reckless".to_string(),
            aggressiveness: 9,
        },
    ]
});

impl Personality {
    pub fn threshold(&self) -> f64 {
        BASE_THRESHOLD + (5 - self.aggressiveness) as f64 * 0.4
    }
}

/// Where the bidder sits relative to the dealer, plus the round-2 next-call
/// situation. Only one discount ever applies; when several hold, the
/// last-computed one wins (next-call over assist over dealer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidContext {
    pub is_dealer: bool,
    pub is_assist: bool,
    /// First bidder in round 2 considering the same color as the turned-down
    /// suit.
    pub is_next_call: bool,
}

impl BidContext {
    fn discount(&self) -> f64 {
        let mut discount = 0.0;
        if self.is_dealer {
            discount = 0.5;
        }
        if self.is_assist {
            discount = 1.0;
        }
        if self.is_next_call {
            discount = 1.5;
        }
        discount
    }
}

pub fn is_right_bower(card: &Card, trump: Suit) -> bool {
    card.value == JACK && card.suit == trump
}

pub fn is_left_bower(card: &Card, trump: Suit) -> bool {
    card.value == JACK && same_color(card.suit, trump)
}

pub fn is_trump(card: &Card, trump: Suit) -> bool {
    card.suit == trump || is_left_bower(card, trump)
}

/// How strong a hand is with `trump` as the candidate suit.
pub fn hand_strength(hand: &[Card], trump: Suit) -> f64 {
    let mut strength = 0.0;
    for card in hand {
        if is_right_bower(card, trump) {
            strength += 3.0;
        } else if is_left_bower(card, trump) {
            strength += 2.5;
        } else if card.suit == trump {
            strength += match card.value {
                ACE => 2.0,
                KING => 1.0,
                _ => 0.5,
            };
        } else if card.value == ACE {
            strength += 1.0;
        }
    }
    // voids in off suits let trump ruff early; the left bower is trump, so it
    // does not stop its face suit from counting as void
    for suit in all::<Suit>() {
        if suit == trump {
            continue;
        }
        let holds_suit = hand
            .iter()
            .any(|c| c.suit == suit && !is_left_bower(c, trump));
        if !holds_suit {
            strength += 0.8;
        }
    }
    strength
}

fn trump_count(hand: &[Card], trump: Suit) -> usize {
    hand.iter().filter(|c| is_trump(c, trump)).count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidDecision {
    pub call: bool,
    pub strength: f64,
    pub threshold: f64,
    /// Audit-only; never consulted by gameplay logic.
    pub reason: String,
}

/// Whether a bot at this position should name `trump`.
pub fn should_call_trump(
    hand: &[Card],
    trump: Suit,
    personality: &Personality,
    context: BidContext,
) -> BidDecision {
    let strength = hand_strength(hand, trump);
    let threshold = personality.threshold() - context.discount();
    let trumps = trump_count(hand, trump);
    let has_right = hand.iter().any(|c| is_right_bower(c, trump));

    if trumps < MIN_TRUMP_COUNT && !(has_right && strength >= POWERHOUSE_STRENGTH) {
        return BidDecision {
            call: false,
            strength,
            threshold,
            reason: format!("only {} trump in {:?}, not a powerhouse", trumps, trump),
        };
    }
    let call = strength >= threshold;
    BidDecision {
        call,
        strength,
        threshold,
        reason: format!(
            "{:?} strength {:.1} vs threshold {:.1}",
            trump, strength, threshold
        ),
    }
}

/// The strongest callable suit, or None when every suit falls short.
/// `exclude` removes the turned-down suit in round 2.
pub fn best_bid(
    hand: &[Card],
    exclude: Option<Suit>,
    personality: &Personality,
    context: impl Fn(Suit) -> BidContext,
) -> Option<(Suit, BidDecision)> {
    let mut best: Option<(Suit, BidDecision)> = None;
    for suit in all::<Suit>() {
        if Some(suit) == exclude {
            continue;
        }
        let decision = should_call_trump(hand, suit, personality, context(suit));
        if !decision.call {
            continue;
        }
        match &best {
            Some((_, current)) if current.strength >= decision.strength => {}
            _ => best = Some((suit, decision)),
        }
    }
    best
}
