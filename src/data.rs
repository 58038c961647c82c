//! Wire/on-disk data model: placements, outcomes, round results, status
//! snapshots, and the compiled tape. Everything that crosses the on-disk
//! or status-stream boundary derives `Serialize`/`Deserialize` with
//! `camelCase` field names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::PlayerConfig;

/// One player's result in one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub player_id: String,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deck: Vec<String>,
}

/// The result of one 4-seat match. Always present, even on failure: a
/// failed game is represented with all scores zero and empty decks, never
/// omitted from the round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOutcome {
    pub index_within_round: usize,
    pub placements: Vec<Placement>,
}

impl GameOutcome {
    /// The all-zero, empty-deck outcome produced when the table executor
    /// catches a fault: the game still fills a slot in the round.
    pub fn failed(index_within_round: usize, player_ids: &[String]) -> Self {
        GameOutcome {
            index_within_round,
            placements: player_ids
                .iter()
                .map(|id| Placement {
                    player_id: id.clone(),
                    score: 0,
                    deck: vec![],
                })
                .collect(),
        }
    }
}

/// A balanced 4-seat assignment for one game. Invariant: exactly 4
/// distinct players drawn from the tournament's roster.
#[derive(Debug, Clone)]
pub struct GameAssignment {
    pub seats: Vec<PlayerConfig>,
}

impl GameAssignment {
    pub fn player_ids(&self) -> Vec<String> {
        self.seats.iter().map(|p| p.id.clone()).collect()
    }
}

/// The 10 action-card identifiers in play for a round, in sampled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KingdomSelection(pub Vec<String>);

impl KingdomSelection {
    pub fn cards(&self) -> &[String] {
        &self.0
    }
}

/// One table's outcomes within a round-file. `outcomes` holds exactly one
/// `GameOutcome` in this implementation (one table plays one game per
/// round; see `DESIGN.md`), kept as a list to match the on-disk schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub table_number: usize,
    pub player_ids: Vec<String>,
    pub outcomes: Vec<GameOutcomeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcomeRecord {
    pub game_index: usize,
    pub placements: Vec<Placement>,
}

/// A round's complete result. Invariant: after write, every game in
/// the round is represented exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round_number: u32,
    pub kingdom_cards: Vec<String>,
    pub matches: Vec<MatchRecord>,
}

impl RoundResult {
    pub fn new(round_number: u32, kingdom: &KingdomSelection, outcomes: Vec<(GameAssignment, GameOutcome)>) -> Self {
        let matches = outcomes
            .into_iter()
            .map(|(assignment, outcome)| MatchRecord {
                table_number: outcome.index_within_round,
                player_ids: assignment.player_ids(),
                outcomes: vec![GameOutcomeRecord {
                    game_index: outcome.index_within_round,
                    placements: outcome.placements,
                }],
            })
            .collect();
        RoundResult {
            round_number,
            kingdom_cards: kingdom.cards().to_vec(),
            matches,
        }
    }
}

/// Tournament lifecycle state. Monotonic except a `Failed` terminal
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TournamentState {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TournamentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TournamentState::Completed | TournamentState::Failed)
    }
}

/// A full status snapshot, the unit pushed by the Broadcaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentStatus {
    pub id: String,
    pub state: TournamentState,
    pub current_round: u32,
    pub total_rounds: u32,
    pub completed_games: u64,
    pub total_games: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings: Option<HashMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TournamentStatus {
    pub fn queued(id: impl Into<String>, total_rounds: u32, total_games: u64) -> Self {
        TournamentStatus {
            id: id.into(),
            state: TournamentState::Queued,
            current_round: 0,
            total_rounds,
            completed_games: 0,
            total_games,
            ratings: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapePlayer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scoring {
    pub model: String,
    pub initial: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapePlacement {
    pub id: String,
    pub score: u32,
}

/// One compiled replay event: a (round, within-round game index, table)
/// triple plus the rating snapshot *after* applying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapeEvent {
    pub seq: u64,
    pub round: u32,
    pub game: usize,
    pub table: usize,
    pub tables: usize,
    pub games_in_round: usize,
    pub kingdom_cards: Vec<String>,
    pub placements: Vec<TapePlacement>,
    pub ratings: HashMap<String, f64>,
    pub mu: HashMap<String, f64>,
    pub sigma: HashMap<String, f64>,
    pub points: HashMap<String, i64>,
}

/// The post-run replay artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tape {
    pub players: Vec<TapePlayer>,
    pub scoring: Scoring,
    pub events: Vec<TapeEvent>,
    pub deck_stats: HashMap<String, HashMap<String, u64>>,
}

/// On-disk mirror of a [`crate::config::TournamentConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentMetadata {
    pub name: String,
    pub config: TournamentMetadataConfig,
    pub players: Vec<TournamentMetadataPlayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentMetadataConfig {
    pub rounds: u32,
    pub games_per_player: u32,
    pub max_turns: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentMetadataPlayer {
    pub id: String,
    pub name: String,
    pub endpoint: String,
}
