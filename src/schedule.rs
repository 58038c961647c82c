//! Round Generator: kingdom selection and balanced 4-seat scheduling.
//!
//! The pairing heuristic is a documented best-effort, not an optimal
//! balanced-incomplete-block design: greedy, single pass, seeded by `rand`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::PlayerConfig;
use crate::data::{GameAssignment, KingdomSelection};

/// The fixed universe of 15 action-card identifiers a kingdom is drawn
/// from. Names are flavor only — the rules they imply live in the external
/// `Engine`, not in this crate.
pub const ACTION_CARD_UNIVERSE: [&str; 15] = [
    "village", "market", "smithy", "festival", "laboratory", "witch", "militia", "moat", "cellar",
    "workshop", "council-room", "library", "mine", "remodel", "throne-room",
];

/// Picks a uniformly random 10-subset of the 15-card universe, ordered as
/// sampled.
pub fn select_kingdom(rng: &mut StdRng) -> KingdomSelection {
    let mut cards: Vec<&str> = ACTION_CARD_UNIVERSE.to_vec();
    cards.shuffle(rng);
    cards.truncate(10);
    KingdomSelection(cards.into_iter().map(str::to_owned).collect())
}

/// Returns the largest multiple of `4 / gcd(n, 4)` that is `<= g`, clamped
/// up to at least that step, so `n * g'` is divisible by 4.
pub fn adjust_games_per_player(n: usize, g: u32) -> u32 {
    assert!(n >= 4, "need at least 4 players");
    let step = 4 / gcd(n as u32, 4);
    let adjusted = (g / step) * step;
    adjusted.max(step)
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Produces exactly `n * g / 4` 4-seat assignments such that every player
/// appears in exactly `g` games. Callers are expected to pass
/// `g = adjust_games_per_player(players.len(), requested_g)`.
pub fn generate_balanced_games(players: &[PlayerConfig], g: u32, rng: &mut StdRng) -> Vec<GameAssignment> {
    let n = players.len();
    assert!(n >= 4, "need at least 4 players");
    assert_eq!((n as u32 * g) % 4, 0, "n*g must be divisible by 4");

    let total_games = (n as u32 * g / 4) as usize;
    let mut appearances = vec![0u32; n];
    let mut games = Vec::with_capacity(total_games);

    for _ in 0..total_games {
        let mut eligible: Vec<usize> = (0..n).filter(|&i| appearances[i] < g).collect();
        eligible.sort_by_key(|&i| (appearances[i], tie_key(rng)));

        let mut seat_indices: Vec<usize> = Vec::with_capacity(4);
        seat_indices.push(eligible[0]);

        let mut co_appeared: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
        for assignment in &games {
            let idxs: Vec<usize> = assignment_indices(players, assignment);
            for a in 0..idxs.len() {
                for b in (a + 1)..idxs.len() {
                    co_appeared.insert(ordered(idxs[a], idxs[b]));
                    co_appeared.insert(ordered(idxs[b], idxs[a]));
                }
            }
        }

        for &candidate in eligible.iter().skip(1) {
            if seat_indices.len() == 4 {
                break;
            }
            let fresh = seat_indices
                .iter()
                .all(|&chosen| !co_appeared.contains(&(chosen, candidate)));
            if fresh {
                seat_indices.push(candidate);
            }
        }
        for &candidate in &eligible {
            if seat_indices.len() == 4 {
                break;
            }
            if !seat_indices.contains(&candidate) {
                seat_indices.push(candidate);
            }
        }

        seat_indices.shuffle(rng);
        for &i in &seat_indices {
            appearances[i] += 1;
        }

        games.push(GameAssignment {
            seats: seat_indices.iter().map(|&i| players[i].clone()).collect(),
        });
    }

    games.shuffle(rng);
    games
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn assignment_indices(players: &[PlayerConfig], assignment: &GameAssignment) -> Vec<usize> {
    assignment
        .seats
        .iter()
        .map(|seat| players.iter().position(|p| p.id == seat.id).expect("player in roster"))
        .collect()
}

fn tie_key(rng: &mut StdRng) -> u32 {
    use rand::Rng;
    rng.gen()
}
