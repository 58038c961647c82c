//! Tournament Runner — the scheduling core.
//!
//! A bounded pool of OS threads, a single `std::sync::mpsc` completion
//! channel drained on one control thread, and a shared job queue behind an
//! `Arc<Mutex<Receiver<Job>>>`. No async runtime: this workload is a fixed
//! number of independent, short-lived synchronous calls, which a thread
//! pool expresses directly without the bookkeeping a runtime would add.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, instrument, warn};

use crate::broadcaster::Broadcaster;
use crate::config::TournamentConfig;
use crate::data::{GameAssignment, GameOutcome, KingdomSelection, Tape, TournamentState, TournamentStatus};
use crate::engine::EngineLoader;
use crate::executor::TableExecutor;
use crate::options::RunnerOptions;
use crate::player::PlayerFactory;
use crate::rating::Tracker;
use crate::schedule::{adjust_games_per_player, generate_balanced_games, select_kingdom};
use crate::store::{round_result, ResultStore};

struct RoundPlan {
    round: u32,
    kingdom: Arc<KingdomSelection>,
    assignments: Vec<GameAssignment>,
}

struct Job {
    round: u32,
    table_index: usize,
    assignment: GameAssignment,
    kingdom: Arc<KingdomSelection>,
}

struct Completion {
    round: u32,
    kingdom: Arc<KingdomSelection>,
    assignment: GameAssignment,
    outcome: GameOutcome,
}

/// Turns a [`TournamentConfig`] into a completed artifact set, emitting a
/// continuous stream of status deltas through the shared [`Broadcaster`].
pub struct TournamentRunner {
    options: RunnerOptions,
    engine_loader: Arc<dyn EngineLoader>,
    player_factory: PlayerFactory,
    broadcaster: Arc<Broadcaster>,
}

impl TournamentRunner {
    pub fn new(
        options: RunnerOptions,
        engine_loader: Arc<dyn EngineLoader>,
        player_factory: PlayerFactory,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        TournamentRunner {
            options,
            engine_loader,
            player_factory,
            broadcaster,
        }
    }

    /// Runs `config` to completion, returning the compiled [`Tape`].
    ///
    /// State machine: `QUEUED` the moment this is called, `RUNNING` once
    /// the first game of this run dispatches (or the moment a resumed
    /// round is replayed, if every round resumes), `COMPLETED` on success,
    /// `FAILED` on any fatal planning/IO error. An individual game failure
    /// never fails the tournament.
    #[instrument(skip_all, fields(tournament = %config.name))]
    pub fn run(&self, config: TournamentConfig) -> anyhow::Result<Tape> {
        let store = ResultStore::new(&self.options.data_dir, &config.name);
        let max_turns = config.max_turns;

        let n = config.players.len();
        let adjusted_g = adjust_games_per_player(n, config.games_per_player);
        let games_per_round = (n as u32 * adjusted_g / 4) as usize;
        let total_games = config.rounds as u64 * games_per_round as u64;

        self.broadcaster
            .publish(TournamentStatus::queued(&config.name, config.rounds, total_games));

        if let Err(e) = store.write_metadata(&config) {
            return self.fail(&config.name, config.rounds, total_games, e);
        }

        let mut tracker = Tracker::new(config.players.iter().map(|p| p.id.clone()), self.options.model);
        let mut completed_games: u64 = 0;
        let mut current_round: u32 = 0;
        let mut plan = Vec::new();

        let mut rng = StdRng::from_entropy();
        for round in 1..=config.rounds {
            if store.round_exists(round) {
                match replay_resumed_round(&store, round, &mut tracker) {
                    Ok(games_in_round) => {
                        completed_games += games_in_round as u64;
                        current_round = round;
                        self.emit_running(&config.name, config.rounds, total_games, completed_games, current_round, &tracker);
                    }
                    Err(e) => return self.fail(&config.name, config.rounds, total_games, e),
                }
            } else {
                let kingdom = select_kingdom(&mut rng);
                let assignments = generate_balanced_games(&config.players, adjusted_g, &mut rng);
                plan.push(RoundPlan {
                    round,
                    kingdom: Arc::new(kingdom),
                    assignments,
                });
            }
        }

        if !plan.is_empty() {
            let outcome = self.dispatch_and_drain(
                &config,
                max_turns,
                plan,
                games_per_round,
                &store,
                &mut tracker,
                &mut completed_games,
                &mut current_round,
                total_games,
            );
            if let Err(e) = outcome {
                return self.fail(&config.name, config.rounds, total_games, e);
            }
        }

        let tape = match store.build_tape(config.rounds, self.options.model) {
            Ok(tape) => tape,
            Err(e) => return self.fail(&config.name, config.rounds, total_games, e),
        };

        let mut status = TournamentStatus::queued(&config.name, config.rounds, total_games);
        status.state = TournamentState::Completed;
        status.current_round = config.rounds;
        status.completed_games = total_games;
        status.ratings = Some(tracker.display_ratings());
        self.broadcaster.publish(status);

        info!(
            non_convergence = tracker.non_convergence_count(),
            "tournament completed"
        );

        Ok(tape)
    }

    /// Spawns the worker pool, staggers submission of every job from every
    /// planned (non-resumed) round, and drains completions on this
    /// (control) thread until all jobs have reported in. Writes each
    /// round's file the moment its buffer fills.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_and_drain(
        &self,
        config: &TournamentConfig,
        max_turns: u32,
        plan: Vec<RoundPlan>,
        games_per_round: usize,
        store: &ResultStore,
        tracker: &mut Tracker,
        completed_games: &mut u64,
        current_round: &mut u32,
        total_games: u64,
    ) -> anyhow::Result<()> {
        let executor = Arc::new(TableExecutor::new(self.player_factory.clone(), self.engine_loader.clone()));
        let cancel = Arc::new(AtomicBool::new(false));

        let (job_tx, job_rx) = channel::<Job>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (completion_tx, completion_rx) = channel::<Completion>();

        let total_jobs: usize = plan.iter().map(|p| p.assignments.len()).sum();

        let workers: Vec<_> = (0..self.options.pool_size)
            .map(|_| {
                let job_rx = job_rx.clone();
                let completion_tx = completion_tx.clone();
                let executor = executor.clone();
                let cancel = cancel.clone();
                std::thread::spawn(move || loop {
                    let job = {
                        let rx = job_rx.lock().expect("job queue mutex poisoned");
                        rx.recv()
                    };
                    let Ok(job) = job else { break };
                    let outcome = executor.execute(job.table_index, &job.assignment, &job.kingdom, max_turns, cancel.clone());
                    let _ = completion_tx.send(Completion {
                        round: job.round,
                        kingdom: job.kingdom,
                        assignment: job.assignment,
                        outcome,
                    });
                })
            })
            .collect();
        drop(completion_tx);

        let stagger = self.options.stagger;
        let pool_size = self.options.pool_size;
        let submitter_cancel = cancel.clone();
        let submitter = std::thread::spawn(move || {
            let mut submitted = 0usize;
            'rounds: for round_plan in plan {
                for (table_index, assignment) in round_plan.assignments.into_iter().enumerate() {
                    if submitter_cancel.load(Ordering::Relaxed) {
                        break 'rounds;
                    }
                    if job_tx
                        .send(Job {
                            round: round_plan.round,
                            table_index,
                            assignment,
                            kingdom: round_plan.kingdom.clone(),
                        })
                        .is_err()
                    {
                        break 'rounds;
                    }
                    submitted += 1;
                    if submitted <= pool_size {
                        std::thread::sleep(stagger);
                    }
                }
            }
        });

        let mut round_buffers: HashMap<u32, Vec<(GameAssignment, GameOutcome)>> = HashMap::new();
        let mut round_kingdoms: HashMap<u32, Arc<KingdomSelection>> = HashMap::new();
        let mut fatal: Option<anyhow::Error> = None;

        for _ in 0..total_jobs {
            let completion = match completion_rx.recv() {
                Ok(c) => c,
                Err(_) => break,
            };
            tracker.process_game(&completion.outcome);
            *completed_games += 1;
            *current_round = (*current_round).max(completion.round);

            self.emit_running(&config.name, config.rounds, total_games, *completed_games, *current_round, tracker);

            round_kingdoms.entry(completion.round).or_insert_with(|| completion.kingdom.clone());
            let buffer = round_buffers.entry(completion.round).or_default();
            buffer.push((completion.assignment, completion.outcome));

            if buffer.len() >= games_per_round {
                let outcomes = round_buffers.remove(&completion.round).unwrap_or_default();
                let kingdom = round_kingdoms.remove(&completion.round).expect("kingdom recorded alongside buffer");
                let round_file = round_result(completion.round, kingdom.as_ref(), outcomes);
                if let Err(e) = store.write_round(&round_file) {
                    fatal = Some(e);
                    cancel.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }

        let _ = submitter.join();
        for worker in workers {
            let _ = worker.join();
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn emit_running(
        &self,
        name: &str,
        total_rounds: u32,
        total_games: u64,
        completed_games: u64,
        current_round: u32,
        tracker: &Tracker,
    ) {
        let mut status = TournamentStatus::queued(name, total_rounds, total_games);
        status.state = TournamentState::Running;
        status.current_round = current_round;
        status.completed_games = completed_games;
        status.ratings = Some(tracker.display_ratings());
        self.broadcaster.publish(status);
    }

    fn fail(&self, name: &str, total_rounds: u32, total_games: u64, error: anyhow::Error) -> anyhow::Result<Tape> {
        let fault = crate::error::TournamentFault::Fatal(error);
        debug_assert!(fault.is_fatal());
        warn!(error = %fault, "tournament failed");
        let mut status = TournamentStatus::queued(name, total_rounds, total_games);
        status.state = TournamentState::Failed;
        status.error = Some(fault.to_string());
        self.broadcaster.publish(status);
        Err(fault.into())
    }
}

/// Replays one already-written round through `tracker` during resume,
/// returning the number of games it contained: a resumed round's counters
/// are advanced but no work is scheduled for it.
fn replay_resumed_round(store: &ResultStore, round: u32, tracker: &mut Tracker) -> anyhow::Result<usize> {
    let round_result = store.read_round_for_resume(round)?;
    let mut game_count = 0;
    let mut matches = round_result.matches.clone();
    matches.sort_by_key(|m| m.table_number);
    for record in &matches {
        let mut outcomes = record.outcomes.clone();
        outcomes.sort_by_key(|o| o.game_index);
        for outcome_record in outcomes {
            let outcome = GameOutcome {
                index_within_round: outcome_record.game_index,
                placements: outcome_record.placements,
            };
            tracker.process_game(&outcome);
            game_count += 1;
        }
    }
    Ok(game_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::engine::fakes;

    fn config(name: &str, rounds: u32, games_per_player: u32) -> TournamentConfig {
        let players = (0..4)
            .map(|i| PlayerConfig::new(format!("p{i}"), format!("Player {i}"), "random").unwrap())
            .collect();
        TournamentConfig::new(name, rounds, games_per_player, 50, players).unwrap()
    }

    fn runner(data_dir: &std::path::Path) -> TournamentRunner {
        TournamentRunner::new(
            RunnerOptions::new().with_pool_size(4).with_stagger(std::time::Duration::from_millis(0)).with_data_dir(data_dir),
            Arc::new(fakes::loader()),
            PlayerFactory::new(),
            Arc::new(Broadcaster::new()),
        )
    }

    #[test]
    fn single_round_single_game_produces_one_tape_event() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let tape = runner.run(config("cup-1", 1, 1)).unwrap();
        assert_eq!(tape.events.len(), 1);
    }

    #[test]
    fn multi_round_balanced_load_produces_expected_event_count() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let tape = runner.run(config("cup-2", 2, 4)).unwrap();
        assert_eq!(tape.events.len(), 8);
    }

    #[test]
    fn always_failing_engine_keeps_tournament_completed() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TournamentRunner::new(
            RunnerOptions::new().with_pool_size(4).with_stagger(std::time::Duration::from_millis(0)).with_data_dir(dir.path()),
            Arc::new(fakes::panicking_loader()),
            PlayerFactory::new(),
            Arc::new(Broadcaster::new()),
        );
        let tape = runner.run(config("cup-4", 1, 1)).unwrap();
        assert_eq!(tape.events.len(), 1);
        for event in &tape.events {
            for placement in &event.placements {
                assert_eq!(placement.score, 0);
            }
        }
    }

    #[test]
    fn resume_skips_existing_rounds() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config("cup-5", 3, 1);

        let first_runner = runner(dir.path());
        first_runner.run(cfg.clone()).unwrap();

        let store = ResultStore::new(dir.path(), "cup-5");
        let round1_before = std::fs::read_to_string(store.directory().join("round-01.json")).unwrap();

        let second_runner = runner(dir.path());
        let tape = second_runner.run(cfg).unwrap();
        let round1_after = std::fs::read_to_string(store.directory().join("round-01.json")).unwrap();

        assert_eq!(round1_before, round1_after);
        assert_eq!(tape.events.len(), 3);
    }

    #[test]
    fn status_stream_is_monotone_and_reaches_completed() {
        let dir = tempfile::tempdir().unwrap();
        let broadcaster = Arc::new(Broadcaster::new());
        let runner = TournamentRunner::new(
            RunnerOptions::new().with_pool_size(4).with_stagger(std::time::Duration::from_millis(0)).with_data_dir(dir.path()),
            Arc::new(fakes::loader()),
            PlayerFactory::new(),
            broadcaster.clone(),
        );
        runner.run(config("cup-8", 2, 4)).unwrap();
        let status = broadcaster.status("cup-8").unwrap();
        assert_eq!(status.state, TournamentState::Completed);
        assert_eq!(status.completed_games, status.total_games);
    }
}
