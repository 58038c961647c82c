//! Fault classification for the tournament core.
//!
//! Most of the crate propagates plain `anyhow::Result`. The one place a
//! typed distinction pays for itself is the Runner's state machine: it
//! needs to know, without string-matching an error message, whether a
//! failure is fatal to the whole tournament or only to the one game that
//! raised it.

use std::fmt;

/// Whether a failure should take down the whole tournament or just one game.
#[derive(Debug)]
pub enum TournamentFault {
    /// Cannot write metadata, cannot plan a round, or the worker pool
    /// rejected a submission. The tournament transitions to `FAILED`.
    Fatal(anyhow::Error),
    /// A single game misbehaved (engine panic, player fault, ...). The
    /// tournament keeps running; the game is recorded as an all-zero
    /// outcome instead.
    Game(anyhow::Error),
}

impl TournamentFault {
    /// True if this fault must end the tournament.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TournamentFault::Fatal(_))
    }
}

impl fmt::Display for TournamentFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentFault::Fatal(e) => write!(f, "fatal: {e}"),
            TournamentFault::Game(e) => write!(f, "game failure: {e}"),
        }
    }
}

impl std::error::Error for TournamentFault {}
