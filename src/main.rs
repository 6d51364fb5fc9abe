use std::collections::HashMap;
use std::time::Instant;

use colored::Colorize;
use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing_subscriber::EnvFilter;

use euchretable_rs::euchre::{bot, Action, BidCall, EuchreGame, Phase};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    random_play();
    policy_play();
}

/// Pure throughput: every seat plays an arbitrary legal card.
fn random_play() {
    let start = Instant::now();
    for _ in 0..1000 {
        let mut game = EuchreGame::new_with_bots();
        game.with_no_changes();
        while game.winner.is_none() {
            let action =
                structural_action(&game).unwrap_or_else(|| RandomMove {}.get_move(&game));
            game = game.clone_and_apply(&action);
        }
    }
    let duration = start.elapsed();
    println!("Time elapsed for 1,000 random games: {:?}", duration);
}

/// Phase transitions no seat owns: trick sweeps, scoring, the next deal.
fn structural_action(game: &EuchreGame) -> Option<Action> {
    match game.phase {
        Phase::WaitingForTrick => Some(Action::ClearTrick),
        Phase::Scoring => Some(Action::FinishHand),
        Phase::WaitingForNextDeal | Phase::RandomizingDealer => {
            Some(Action::DealHand { payload: None })
        }
        _ => None,
    }
}

trait MoveMaker {
    fn get_move(&self, game: &EuchreGame) -> Action;
    fn get_name(&self) -> &str;
}

struct PolicyMove {}
struct RandomMove {}

impl MoveMaker for PolicyMove {
    fn get_move(&self, game: &EuchreGame) -> Action {
        bot::choose_action(game).expect("should have a move to make")
    }

    fn get_name(&self) -> &str {
        "policy"
    }
}

impl MoveMaker for RandomMove {
    fn get_move(&self, game: &EuchreGame) -> Action {
        let seat = game.current_player;
        match game.phase {
            Phase::Bidding => Action::Bid {
                seat,
                call: BidCall::Pass,
            },
            Phase::Discard => {
                let mut hand = game.players[seat].hand.clone();
                hand.shuffle(&mut thread_rng());
                Action::Discard {
                    seat,
                    card_id: hand.first().expect("dealer holds six cards").id,
                }
            }
            _ => {
                let mut ids = game.playable_card_ids();
                ids.shuffle(&mut thread_rng());
                Action::PlayCard {
                    seat,
                    card_id: *ids.first().expect("should have a move to make"),
                }
            }
        }
    }

    fn get_name(&self) -> &str {
        "random"
    }
}

/// Team 1 (seats 1 and 3) runs the bidding and play policy against a team
/// that passes every bid and plays at random.
fn policy_play() {
    let players: [Box<dyn MoveMaker>; 4] = [
        Box::new(RandomMove {}),
        Box::new(PolicyMove {}),
        Box::new(RandomMove {}),
        Box::new(PolicyMove {}),
    ];
    let mut wins: HashMap<String, usize> = HashMap::new();
    let games = 100;
    for _ in 0..games {
        let mut game = EuchreGame::new_with_bots();
        game.with_no_changes();
        while game.winner.is_none() {
            let action = structural_action(&game)
                .unwrap_or_else(|| players[game.current_player].get_move(&game));
            game = game.clone_and_apply(&action);
        }
        let winning_team = game.winner.expect("finished game has a winner");
        *wins
            .entry(players[winning_team].get_name().to_owned())
            .or_insert(0) += 1;
    }
    println!("wins over {} games: {:?}", games, wins);
    let policy_wins = *wins.get("policy").unwrap_or(&0);
    let line = format!(
        "policy team won {:.0}%",
        100.0 * policy_wins as f64 / games as f64
    );
    if policy_wins * 2 > games {
        println!("{}", line.green());
    } else {
        println!("{}", line.red());
    }
}
