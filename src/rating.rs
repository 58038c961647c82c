//! Multiplayer Bayesian skill rating.
//!
//! Built on the published `skillratings` crate's multi-team TrueSkill
//! implementation, treating every player as a one-person team. Ranks fed
//! to the model are strictly ordered via a deterministic pseudorandom
//! tie-break (seeded from `(playerId, score)` pairs) so the same game
//! always ranks the same way and the model never has to reason about
//! partial ties — except when every participant's score is exactly equal,
//! in which case this is a genuine draw and is reported to the model as
//! one (see `DESIGN.md`, "all scores equal").

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use skillratings::trueskill::{trueskill_multi_team, TrueSkillConfig, TrueSkillRating};
use skillratings::MultiTeamOutcome;
use tracing::warn;

use crate::data::{GameOutcome, Placement};

/// Rating model parameters. Defaults are the standard TrueSkill-style
/// defaults: `mu0 = 25`, `sigma0 = 25/3`, `beta = sigma0/2`, `tau = sigma0/100`,
/// `draw_probability = 0.10`.
#[derive(Debug, Clone, Copy)]
pub struct ModelParams {
    pub mu0: f64,
    pub sigma0: f64,
    pub beta: f64,
    pub tau: f64,
    pub draw_probability: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        let sigma0 = 25.0 / 3.0;
        ModelParams {
            mu0: 25.0,
            sigma0,
            beta: sigma0 / 2.0,
            tau: sigma0 / 100.0,
            draw_probability: 0.10,
        }
    }
}

impl From<ModelParams> for TrueSkillConfig {
    fn from(p: ModelParams) -> Self {
        TrueSkillConfig {
            draw_probability: p.draw_probability,
            beta: p.beta,
            default_dynamics: p.tau,
        }
    }
}

/// A player's skill estimate: `(mu, sigma)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Rating {
    /// Display value: `mu - 3*sigma`, rounded to one decimal.
    pub fn display(&self) -> f64 {
        ((self.mu - 3.0 * self.sigma) * 10.0).round() / 10.0
    }
}

const MAX_NON_CONVERGENCE_LOGS: u32 = 5;

/// Maintains `(mu, sigma)` and ordinal points per player, updated one game
/// at a time. Not thread-safe by design: the Runner serializes all calls
/// to [`Tracker::process_game`] on its single control thread.
pub struct Tracker {
    ratings: HashMap<String, Rating>,
    points: HashMap<String, i64>,
    model: ModelParams,
    config: TrueSkillConfig,
    non_convergence_count: u32,
}

impl Tracker {
    /// Initializes every player to the model's default rating and zero points.
    pub fn new(player_ids: impl IntoIterator<Item = String>, model: ModelParams) -> Self {
        let mut ratings = HashMap::new();
        let mut points = HashMap::new();
        for id in player_ids {
            ratings.insert(
                id.clone(),
                Rating {
                    mu: model.mu0,
                    sigma: model.sigma0,
                },
            );
            points.insert(id, 0);
        }
        Tracker {
            ratings,
            points,
            model,
            config: model.into(),
            non_convergence_count: 0,
        }
    }

    /// Updates ratings and points for one game's placements. Non-participants
    /// are untouched. If the numerical update does not converge, prior
    /// ratings are retained for the participants and points are still
    /// awarded regardless.
    pub fn process_game(&mut self, outcome: &GameOutcome) {
        let placements = &outcome.placements;
        if placements.is_empty() {
            return;
        }

        let all_tied = placements
            .iter()
            .all(|p| p.score == placements[0].score);

        let ranks: Vec<usize> = if all_tied {
            vec![1; placements.len()]
        } else {
            strict_ranks(placements)
        };

        self.award_points(placements, &ranks);
        self.update_ratings(placements, &ranks);
    }

    fn award_points(&mut self, placements: &[Placement], ranks: &[usize]) {
        let n = placements.len() as i64;
        for (placement, &rank) in placements.iter().zip(ranks) {
            *self.points.entry(placement.player_id.clone()).or_insert(0) += n + 1 - rank as i64;
        }
    }

    fn update_ratings(&mut self, placements: &[Placement], ranks: &[usize]) {
        let current: Vec<TrueSkillRating> = placements
            .iter()
            .map(|p| {
                let r = self.rating_of(&p.player_id);
                TrueSkillRating {
                    rating: r.mu,
                    uncertainty: r.sigma,
                }
            })
            .collect();

        let teams_and_ranks: Vec<(&[TrueSkillRating], MultiTeamOutcome)> = current
            .iter()
            .zip(ranks)
            .map(|(r, &rank)| (std::slice::from_ref(r), MultiTeamOutcome::new(rank)))
            .collect();

        let config = &self.config;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            trueskill_multi_team(&teams_and_ranks, config)
        }));

        let updated = match outcome {
            Ok(teams) if teams.len() == placements.len() && teams.iter().all(valid_team) => teams,
            _ => {
                self.non_convergence_count += 1;
                if self.non_convergence_count <= MAX_NON_CONVERGENCE_LOGS {
                    warn!(
                        count = self.non_convergence_count,
                        "rating update did not converge; retaining prior ratings"
                    );
                }
                return;
            }
        };

        for (placement, team) in placements.iter().zip(updated) {
            let r = team[0];
            self.ratings.insert(
                placement.player_id.clone(),
                Rating {
                    mu: r.rating,
                    sigma: r.uncertainty,
                },
            );
        }
    }

    fn rating_of(&self, id: &str) -> Rating {
        self.ratings.get(id).copied().unwrap_or(Rating {
            mu: self.model.mu0,
            sigma: self.model.sigma0,
        })
    }

    /// Snapshot of every known player's rating.
    pub fn ratings(&self) -> HashMap<String, Rating> {
        self.ratings.clone()
    }

    /// Snapshot of every known player's display rating (`mu - 3*sigma`).
    pub fn display_ratings(&self) -> HashMap<String, f64> {
        self.ratings
            .iter()
            .map(|(id, r)| (id.clone(), r.display()))
            .collect()
    }

    /// Accumulated ordinal points per player.
    pub fn points(&self) -> HashMap<String, i64> {
        self.points.clone()
    }

    /// Number of games whose rating update failed to converge so far.
    pub fn non_convergence_count(&self) -> u32 {
        self.non_convergence_count
    }
}

fn valid_team(team: &Vec<TrueSkillRating>) -> bool {
    team.len() == 1 && team[0].rating.is_finite() && team[0].uncertainty.is_finite() && team[0].uncertainty > 0.0
}

/// Strict 1-based ranks (1 = best) for a game whose scores are not all
/// equal, breaking ties with a pseudorandom permutation seeded from the
/// sorted `(playerId, score)` pairs.
fn strict_ranks(placements: &[Placement]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..placements.len()).collect();
    order.sort_by(|&a, &b| placements[b].score.cmp(&placements[a].score));

    let mut rng = StdRng::seed_from_u64(seed_of(placements));
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && placements[order[j]].score == placements[order[i]].score {
            j += 1;
        }
        if j - i > 1 {
            order[i..j].shuffle(&mut rng);
        }
        i = j;
    }

    let mut ranks = vec![0usize; placements.len()];
    for (position, &original_index) in order.iter().enumerate() {
        ranks[original_index] = position + 1;
    }
    ranks
}

fn seed_of(placements: &[Placement]) -> u64 {
    let mut pairs: Vec<(&str, u32)> = placements
        .iter()
        .map(|p| (p.player_id.as_str(), p.score))
        .collect();
    pairs.sort_unstable();

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for (id, score) in pairs {
        id.hash(&mut hasher);
        score.hash(&mut hasher);
    }
    hasher.finish()
}
