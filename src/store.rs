//! Result Store.
//!
//! Atomic round-file and metadata writes, resume detection, and tape
//! compilation, built on `tempfile::NamedTempFile` so every write is either
//! absent, the previous complete file, or the new complete file — never a
//! partial one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;

use crate::config::TournamentConfig;
use crate::data::{
    GameAssignment, GameOutcome, RoundResult, Scoring, Tape, TapeEvent, TapePlacement, TapePlayer,
    TournamentMetadata, TournamentMetadataConfig, TournamentMetadataPlayer,
};
use crate::rating::{ModelParams, Tracker};

/// Durable per-tournament artifact store, rooted at `<data_dir>/<name>/`.
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(data_dir: &Path, tournament_name: &str) -> Self {
        ResultStore {
            dir: data_dir.join(tournament_name),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn round_path(&self, round_number: u32) -> PathBuf {
        self.dir.join(format!("round-{round_number:02}.json"))
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join("tournament.json")
    }

    fn tape_path(&self) -> PathBuf {
        self.dir.join("tape.json")
    }

    /// Writes `tournament.json` atomically. Fatal to the tournament on
    /// failure.
    pub fn write_metadata(&self, config: &TournamentConfig) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir).context("creating tournament directory")?;
        let metadata = TournamentMetadata {
            name: config.name.clone(),
            config: TournamentMetadataConfig {
                rounds: config.rounds,
                games_per_player: config.games_per_player,
                max_turns: config.max_turns,
            },
            players: config
                .players
                .iter()
                .map(|p| TournamentMetadataPlayer {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    endpoint: p.endpoint.as_str(),
                })
                .collect(),
        };
        self.write_atomic(&self.metadata_path(), &metadata)
    }

    /// True iff round `n`'s result file is already present (resume).
    pub fn round_exists(&self, round_number: u32) -> bool {
        self.round_path(round_number).is_file()
    }

    /// Writes a round's result file atomically. Fatal to the tournament on
    /// failure.
    pub fn write_round(&self, round: &RoundResult) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir).context("creating tournament directory")?;
        self.write_atomic(&self.round_path(round.round_number), round)
    }

    fn write_atomic<T: serde::Serialize>(&self, path: &Path, value: &T) -> anyhow::Result<()> {
        let parent = path.parent().unwrap_or(&self.dir);
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("creating temp file in {}", parent.display()))?;
        serde_json::to_writer_pretty(&mut tmp, value).context("serializing artifact")?;
        use std::io::Write;
        tmp.flush().context("flushing temp file")?;
        tmp.persist(path)
            .with_context(|| format!("renaming into place: {}", path.display()))?;
        Ok(())
    }

    fn read_round(&self, round_number: u32) -> anyhow::Result<RoundResult> {
        let contents = fs::read_to_string(self.round_path(round_number))
            .with_context(|| format!("reading round {round_number}"))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing round {round_number}"))
    }

    /// Reads one already-written round's result file, for replaying it into
    /// a live [`Tracker`] during resume.
    pub fn read_round_for_resume(&self, round_number: u32) -> anyhow::Result<RoundResult> {
        self.read_round(round_number)
    }

    fn read_metadata(&self) -> anyhow::Result<TournamentMetadata> {
        let contents = fs::read_to_string(self.metadata_path()).context("reading tournament.json")?;
        serde_json::from_str(&contents).context("parsing tournament.json")
    }

    /// Reads `tournament.json` and every `round-NN.json`, replays all games
    /// through a fresh [`Tracker`] in the canonical order (round ascending;
    /// within a round, game index ascending; for a given game index, table
    /// index ascending — they coincide in this implementation since one
    /// table plays one game per round), and writes `tape.json`.
    pub fn build_tape(&self, total_rounds: u32, model: ModelParams) -> anyhow::Result<Tape> {
        let metadata = self.read_metadata()?;
        let mut tracker = Tracker::new(metadata.players.iter().map(|p| p.id.clone()), model);

        let mut events = Vec::new();
        let mut deck_stats: HashMap<String, HashMap<String, u64>> = HashMap::new();
        let mut seq = 0u64;

        for round_number in 1..=total_rounds {
            let round = self.read_round(round_number)?;
            let mut matches = round.matches.clone();
            matches.sort_by_key(|m| m.table_number);

            for record in &matches {
                let mut outcomes = record.outcomes.clone();
                outcomes.sort_by_key(|o| o.game_index);

                for outcome_record in outcomes {
                    let outcome = GameOutcome {
                        index_within_round: outcome_record.game_index,
                        placements: outcome_record.placements.clone(),
                    };
                    tracker.process_game(&outcome);

                    for placement in &outcome.placements {
                        let counts = deck_stats.entry(placement.player_id.clone()).or_default();
                        for card in &placement.deck {
                            *counts.entry(card.clone()).or_insert(0) += 1;
                        }
                    }

                    let ratings = tracker.ratings();
                    events.push(TapeEvent {
                        seq,
                        round: round_number,
                        game: outcome_record.game_index,
                        table: record.table_number,
                        tables: matches.len(),
                        games_in_round: round.matches.len(),
                        kingdom_cards: round.kingdom_cards.clone(),
                        placements: outcome
                            .placements
                            .iter()
                            .map(|p| TapePlacement {
                                id: p.player_id.clone(),
                                score: p.score,
                            })
                            .collect(),
                        ratings: tracker.display_ratings(),
                        mu: ratings.iter().map(|(id, r)| (id.clone(), r.mu)).collect(),
                        sigma: ratings.iter().map(|(id, r)| (id.clone(), r.sigma)).collect(),
                        points: tracker.points(),
                    });
                    seq += 1;
                }
            }
        }

        let tape = Tape {
            players: metadata
                .players
                .iter()
                .map(|p| TapePlayer {
                    id: p.id.clone(),
                    name: p.name.clone(),
                })
                .collect(),
            scoring: Scoring {
                model: "trueskill".to_string(),
                initial: {
                    let r = crate::rating::Rating {
                        mu: model.mu0,
                        sigma: model.sigma0,
                    };
                    r.display()
                },
            },
            events,
            deck_stats,
        };

        self.write_atomic(&self.tape_path(), &tape)?;
        Ok(tape)
    }
}

/// Convenience used by the Runner to bundle a round's collected outcomes
/// into the wire shape `ResultStore::write_round` expects.
pub fn round_result(
    round_number: u32,
    kingdom: &crate::data::KingdomSelection,
    outcomes: Vec<(GameAssignment, GameOutcome)>,
) -> RoundResult {
    RoundResult::new(round_number, kingdom, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerConfig;
    use crate::data::{KingdomSelection, Placement};

    fn config(name: &str) -> TournamentConfig {
        let players = (0..4)
            .map(|i| PlayerConfig::new(format!("p{i}"), format!("Player {i}"), "random").unwrap())
            .collect();
        TournamentConfig::new(name, 1, 1, 100, players).unwrap()
    }

    fn outcome(i: usize) -> (GameAssignment, GameOutcome) {
        let players = (0..4)
            .map(|n| PlayerConfig::new(format!("p{n}"), format!("Player {n}"), "random").unwrap())
            .collect::<Vec<_>>();
        let assignment = GameAssignment { seats: players };
        let placements = assignment
            .seats
            .iter()
            .enumerate()
            .map(|(rank, p)| Placement {
                player_id: p.id.clone(),
                score: 40 - rank as u32 * 10,
                deck: vec!["village".to_string()],
            })
            .collect();
        (
            assignment,
            GameOutcome {
                index_within_round: i,
                placements,
            },
        )
    }

    #[test]
    fn metadata_round_trip_and_resume_detection() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path(), "cup-1");
        let cfg = config("cup-1");
        store.write_metadata(&cfg).unwrap();

        assert!(!store.round_exists(1));
        let kingdom = KingdomSelection(vec!["village".to_string()]);
        let round = round_result(1, &kingdom, vec![outcome(0)]);
        store.write_round(&round).unwrap();
        assert!(store.round_exists(1));
    }

    #[test]
    fn round_write_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path(), "cup-1");
        let kingdom = KingdomSelection(vec!["village".to_string()]);
        let round = round_result(1, &kingdom, vec![outcome(0)]);
        store.write_round(&round).unwrap();

        let path = store.round_path(1);
        let contents = fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<RoundResult>(&contents).is_ok());

        let tmp_entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
            .collect();
        assert!(tmp_entries.is_empty(), "no leftover temp files after a successful write");
    }

    #[test]
    fn tape_events_are_sequential_and_canonically_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultStore::new(dir.path(), "cup-1");
        let cfg = config("cup-1");
        store.write_metadata(&cfg).unwrap();

        let kingdom = KingdomSelection(vec!["village".to_string()]);
        let round1 = round_result(1, &kingdom, vec![outcome(0), outcome(1)]);
        store.write_round(&round1).unwrap();

        let tape = store.build_tape(1, ModelParams::default()).unwrap();
        assert_eq!(tape.events.len(), 2);
        for (i, event) in tape.events.iter().enumerate() {
            assert_eq!(event.seq, i as u64);
        }
        assert!(tape.events.windows(2).all(|w| w[0].table <= w[1].table));
    }
}
