//! End-to-end tests against the public API, using an in-process fake
//! engine in place of a real game module.

use std::sync::Arc;

use kingdom_arena::data::TournamentState;
use kingdom_arena::engine::{Engine, EngineLoader, EngineOutcome, EnginePlayer, EnginePlayerResult};
use kingdom_arena::prelude::*;

/// Scores players by the length of their display name, descending.
struct ScoreByNameLenEngine {
    players: Vec<EnginePlayer>,
}

impl Engine for ScoreByNameLenEngine {
    fn play(&mut self) -> anyhow::Result<EngineOutcome> {
        Ok(EngineOutcome {
            player_results: self
                .players
                .iter()
                .map(|p| EnginePlayerResult {
                    name: p.name.clone(),
                    score: p.name.len() as u32,
                    deck: vec!["village".to_string()],
                })
                .collect(),
        })
    }
}

struct FakeLoader;

impl EngineLoader for FakeLoader {
    fn create(
        &self,
        players: Vec<EnginePlayer>,
        _kingdom: &kingdom_arena::data::KingdomSelection,
        _max_turns: u32,
    ) -> anyhow::Result<Box<dyn Engine>> {
        Ok(Box::new(ScoreByNameLenEngine { players }))
    }
}

fn players(n: usize) -> Vec<PlayerConfig> {
    (0..n)
        .map(|i| PlayerConfig::new(format!("p{i}"), format!("Player-{i}"), "random").unwrap())
        .collect()
}

fn runner(data_dir: &std::path::Path) -> TournamentRunner {
    TournamentRunner::new(
        RunnerOptions::new()
            .with_pool_size(4)
            .with_stagger(std::time::Duration::from_millis(0))
            .with_data_dir(data_dir),
        Arc::new(FakeLoader),
        PlayerFactory::new(),
        Arc::new(Broadcaster::new()),
    )
}

#[test]
fn odd_player_count_adjusts_games_per_player() {
    let dir = tempfile::tempdir().unwrap();
    let config = TournamentConfig::new("five-player-cup", 1, 3, 100, players(5)).unwrap();

    let tape = runner(dir.path()).run(config).unwrap();

    // n=5, requested g=3 adjusts to g'=4 (step = 4/gcd(5,4) = 4), so one
    // round has n*g'/4 = 5 games.
    assert_eq!(tape.events.len(), 5);
}

#[test]
fn rerunning_same_tournament_resumes_instead_of_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let config = TournamentConfig::new("rerun-cup", 2, 2, 100, players(4)).unwrap();

    let first = runner(dir.path()).run(config.clone()).unwrap();
    let second = runner(dir.path()).run(config).unwrap();

    assert_eq!(first.events.len(), second.events.len());
    for (a, b) in first.events.iter().zip(second.events.iter()) {
        assert_eq!(a.round, b.round);
        assert_eq!(a.table, b.table);
        assert_eq!(a.placements.len(), b.placements.len());
    }
}

#[test]
fn broadcaster_reflects_terminal_state_after_run() {
    let dir = tempfile::tempdir().unwrap();
    let broadcaster = Arc::new(Broadcaster::new());
    let runner = TournamentRunner::new(
        RunnerOptions::new()
            .with_pool_size(4)
            .with_stagger(std::time::Duration::from_millis(0))
            .with_data_dir(dir.path()),
        Arc::new(FakeLoader),
        PlayerFactory::new(),
        broadcaster.clone(),
    );
    let config = TournamentConfig::new("broadcast-cup", 1, 1, 100, players(4)).unwrap();

    runner.run(config).unwrap();

    let status = broadcaster.status("broadcast-cup").unwrap();
    assert_eq!(status.state, TournamentState::Completed);
    assert!(status.ratings.is_some());
}

#[test]
fn round_and_tape_files_are_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = TournamentConfig::new("artifact-cup", 2, 4, 100, players(4)).unwrap();
    runner(dir.path()).run(config).unwrap();

    let tournament_dir = dir.path().join("artifact-cup");
    assert!(tournament_dir.join("tournament.json").is_file());
    assert!(tournament_dir.join("round-01.json").is_file());
    assert!(tournament_dir.join("round-02.json").is_file());
    assert!(tournament_dir.join("tape.json").is_file());
}
