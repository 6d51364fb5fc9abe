use serde::{Deserialize, Serialize};

/// Per-player lifetime counters. These only ever accumulate; merging stats
/// from multiple sources takes the element-wise maximum so a stale replica can
/// never shrink a counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub games_played: u32,
    pub games_won: u32,
    pub hands_played: u32,
    pub tricks_taken: u32,
    pub trumps_called: u32,
    pub loners_called: u32,
    pub euchres_inflicted: u32,
    pub sweeps: u32,
}

impl PlayerStats {
    pub fn merge_max(&mut self, other: &PlayerStats) {
        self.games_played = self.games_played.max(other.games_played);
        self.games_won = self.games_won.max(other.games_won);
        self.hands_played = self.hands_played.max(other.hands_played);
        self.tricks_taken = self.tricks_taken.max(other.tricks_taken);
        self.trumps_called = self.trumps_called.max(other.trumps_called);
        self.loners_called = self.loners_called.max(other.loners_called);
        self.euchres_inflicted = self.euchres_inflicted.max(other.euchres_inflicted);
        self.sweeps = self.sweeps.max(other.sweeps);
    }
}
