//! Table Executor.
//!
//! Materialize players, drive the game once, collect per-player scores,
//! never let a fault escape the function. Stateless and safe for
//! concurrent invocation from multiple worker threads.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::warn;

use crate::data::{GameAssignment, GameOutcome, KingdomSelection, Placement};
use crate::engine::{EngineLoader, EnginePlayer};
use crate::player::PlayerFactory;

/// Builds and drives one game. Stateless: holds only shared, read-only
/// collaborators.
pub struct TableExecutor {
    players: PlayerFactory,
    engine_loader: Arc<dyn EngineLoader>,
}

impl TableExecutor {
    pub fn new(players: PlayerFactory, engine_loader: Arc<dyn EngineLoader>) -> Self {
        TableExecutor { players, engine_loader }
    }

    /// Runs one game for `assignment` under `kingdom`. Any fault during
    /// player construction or the engine's `play()` (including a panic,
    /// caught via `catch_unwind`) produces an all-zero/empty-deck outcome
    /// instead of propagating.
    pub fn execute(
        &self,
        table_index: usize,
        assignment: &GameAssignment,
        kingdom: &KingdomSelection,
        max_turns: u32,
        cancel: Arc<AtomicBool>,
    ) -> GameOutcome {
        let player_ids = assignment.player_ids();

        match self.try_execute(table_index, assignment, kingdom, max_turns, cancel) {
            Ok(outcome) => outcome,
            Err(err) => {
                let fault = crate::error::TournamentFault::Game(err);
                debug_assert!(!fault.is_fatal());
                warn!(table = table_index, error = %fault, "game failed; recording all-zero outcome");
                GameOutcome::failed(table_index, &player_ids)
            }
        }
    }

    fn try_execute(
        &self,
        table_index: usize,
        assignment: &GameAssignment,
        kingdom: &KingdomSelection,
        max_turns: u32,
        cancel: Arc<AtomicBool>,
    ) -> anyhow::Result<GameOutcome> {
        let mut name_to_id = HashMap::with_capacity(assignment.seats.len());
        let mut engine_players = Vec::with_capacity(assignment.seats.len());
        for seat in &assignment.seats {
            let player = self.players.resolve(seat, cancel.clone())?;
            name_to_id.insert(player.name().to_string(), seat.id.clone());
            engine_players.push(EnginePlayer {
                id: seat.id.clone(),
                name: seat.name.clone(),
                player,
            });
        }

        let mut engine = self.engine_loader.create(engine_players, kingdom, max_turns)?;
        let outcome = catch_unwind(AssertUnwindSafe(|| engine.play()))
            .map_err(|_| anyhow::anyhow!("engine panicked during play()"))??;

        let placements = outcome
            .player_results
            .into_iter()
            .map(|result| {
                let player_id = name_to_id
                    .get(&result.name)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("engine reported unknown player {:?}", result.name))?;
                Ok(Placement {
                    player_id,
                    score: result.score,
                    deck: result.deck,
                })
            })
            .collect::<anyhow::Result<Vec<Placement>>>()?;

        Ok(GameOutcome {
            index_within_round: table_index,
            placements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::engine::fakes;
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::atomic::AtomicBool;

    fn assignment(n: usize) -> GameAssignment {
        GameAssignment {
            seats: (0..n)
                .map(|i| PlayerConfig::new(format!("p{i}"), format!("Player {i}"), "random").unwrap())
                .collect(),
        }
    }

    #[test]
    fn maps_engine_results_to_placements_by_name() {
        let executor = TableExecutor::new(PlayerFactory::new(), Arc::new(fakes::loader()));
        let mut rng = StdRng::seed_from_u64(1);
        let kingdom = crate::schedule::select_kingdom(&mut rng);
        let cancel = Arc::new(AtomicBool::new(false));

        let outcome = executor.execute(0, &assignment(4), &kingdom, 100, cancel);
        assert_eq!(outcome.placements.len(), 4);
        for placement in &outcome.placements {
            assert!(placement.player_id.starts_with('p'));
        }
    }

    #[test]
    fn engine_panic_produces_all_zero_outcome() {
        let executor = TableExecutor::new(PlayerFactory::new(), Arc::new(fakes::panicking_loader()));
        let mut rng = StdRng::seed_from_u64(1);
        let kingdom = crate::schedule::select_kingdom(&mut rng);
        let cancel = Arc::new(AtomicBool::new(false));

        let outcome = executor.execute(0, &assignment(4), &kingdom, 100, cancel);
        assert_eq!(outcome.placements.len(), 4);
        assert!(outcome.placements.iter().all(|p| p.score == 0 && p.deck.is_empty()));
    }

    #[test]
    fn unresolvable_player_produces_all_zero_outcome() {
        let executor = TableExecutor::new(PlayerFactory::new(), Arc::new(fakes::loader()));
        let mut assignment = assignment(4);
        assignment.seats[0].endpoint = crate::config::PlayerEndpoint::Module("does-not-exist".into());
        let mut rng = StdRng::seed_from_u64(1);
        let kingdom = crate::schedule::select_kingdom(&mut rng);
        let cancel = Arc::new(AtomicBool::new(false));

        let outcome = executor.execute(0, &assignment, &kingdom, 100, cancel);
        assert!(outcome.placements.iter().all(|p| p.score == 0 && p.deck.is_empty()));
    }
}
