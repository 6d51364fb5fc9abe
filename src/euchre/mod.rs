/*
Game: Euchre
A four-player partnership trick-taking game played to 10 points with a
24-card deck, bower trump rules, loner hands and stick-the-dealer bidding.
*/

pub mod bid;
pub mod bot;
pub mod deck;
pub mod game;
pub mod recovery;
pub mod rules;
pub mod stats;

pub use deck::{create_deck, deal_hands, shuffle_deck, Card, Deal, DeckError, Suit};
pub use game::{Action, BidCall, Change, ChangeType, EuchreGame, HandResult, Phase, Player};
pub use recovery::{FreezeDetector, Remedy, Snapshot, StallRecord};
pub use stats::PlayerStats;
