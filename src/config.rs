//! Tournament and player configuration.
//!
//! Plain data plus validating constructors describing *what to run*,
//! distinct from *how the runner behaves* (pool size, stagger, data
//! directory, ...), which lives in [`crate::options::RunnerOptions`].

use std::path::{Path, PathBuf};

use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

/// Where a player's decisions come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerEndpoint {
    /// `http(s)://host:port` — a remote player reached over HTTP.
    Remote(String),
    /// A named built-in strategy (e.g. `"random"`).
    LocalStrategy(String),
    /// `classpath:<name>` — a named local `Player` resolved through the
    /// same factory registry as built-in strategies, kept distinct so
    /// callers can tell "ships with the crate" from "registered by the
    /// embedder" apart when reading a `tournament.json`.
    Module(String),
}

impl PlayerEndpoint {
    /// Parse an endpoint string from its wire form.
    pub fn parse(raw: &str) -> PlayerEndpoint {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            PlayerEndpoint::Remote(raw.to_string())
        } else if let Some(name) = raw.strip_prefix("classpath:") {
            PlayerEndpoint::Module(name.to_string())
        } else {
            PlayerEndpoint::LocalStrategy(raw.to_string())
        }
    }

    /// The string form written back to `tournament.json`.
    pub fn as_str(&self) -> String {
        match self {
            PlayerEndpoint::Remote(url) => url.clone(),
            PlayerEndpoint::LocalStrategy(name) => name.clone(),
            PlayerEndpoint::Module(name) => format!("classpath:{name}"),
        }
    }
}

/// One tournament entrant.
///
/// Invariant: `id` is a lowercase ASCII slug, unique within a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub id: String,
    pub name: String,
    pub endpoint: PlayerEndpoint,
    #[serde(default)]
    pub delay_wrap: bool,
}

impl PlayerConfig {
    /// Build a player config, rejecting ids outside `[a-z0-9-]+`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, endpoint: &str) -> anyhow::Result<Self> {
        let id = id.into();
        ensure!(
            is_slug(&id),
            "player id {id:?} must match ^[a-z0-9-]+$"
        );
        Ok(PlayerConfig {
            id,
            name: name.into(),
            endpoint: PlayerEndpoint::parse(endpoint),
            delay_wrap: false,
        })
    }

    /// Wrap this player's decisions in an artificial-delay decorator.
    pub fn with_delay_wrap(mut self, value: bool) -> Self {
        self.delay_wrap = value;
        self
    }
}

fn is_slug(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Immutable description of one tournament run.
///
/// Invariants: `players.len() >= 4`; `name` matches `^[a-z0-9-]+$`;
/// `players.len() * games_per_player` is made divisible by 4 via
/// [`crate::schedule::adjust_games_per_player`] before scheduling (this
/// type stores the requested value, not the adjusted one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentConfig {
    pub name: String,
    pub rounds: u32,
    pub games_per_player: u32,
    pub max_turns: u32,
    pub players: Vec<PlayerConfig>,
}

impl TournamentConfig {
    /// Build and validate a tournament config. Fails synchronously on a
    /// malformed name, too few players, or duplicate player ids — none of
    /// these ever reach `QUEUED`.
    pub fn new(
        name: impl Into<String>,
        rounds: u32,
        games_per_player: u32,
        max_turns: u32,
        players: Vec<PlayerConfig>,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        ensure!(is_slug(&name), "tournament name {name:?} must match ^[a-z0-9-]+$");
        ensure!(rounds >= 1, "rounds must be >= 1");
        ensure!(games_per_player >= 1, "gamesPerPlayer must be >= 1");
        ensure!(max_turns >= 1, "maxTurns must be >= 1");
        ensure!(players.len() >= 4, "need at least 4 players, got {}", players.len());

        let mut seen = std::collections::HashSet::with_capacity(players.len());
        for p in &players {
            if !seen.insert(&p.id) {
                bail!("duplicate player id {:?}", p.id);
            }
        }

        Ok(TournamentConfig {
            name,
            rounds,
            games_per_player,
            max_turns,
            players,
        })
    }

    /// Directory this tournament's artifacts live under.
    pub fn directory(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players(n: usize) -> Vec<PlayerConfig> {
        (0..n)
            .map(|i| PlayerConfig::new(format!("p{i}"), format!("Player {i}"), "random").unwrap())
            .collect()
    }

    #[test]
    fn rejects_bad_name() {
        let err = TournamentConfig::new("Bad Name!", 1, 1, 100, players(4)).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn rejects_too_few_players() {
        let err = TournamentConfig::new("ok", 1, 1, 100, players(3)).unwrap_err();
        assert!(err.to_string().contains("4 players"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut p = players(4);
        p[1].id = p[0].id.clone();
        let err = TournamentConfig::new("ok", 1, 1, 100, p).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn parses_endpoints() {
        assert_eq!(
            PlayerEndpoint::parse("https://x.test/"),
            PlayerEndpoint::Remote("https://x.test/".into())
        );
        assert_eq!(
            PlayerEndpoint::parse("classpath:greedy"),
            PlayerEndpoint::Module("greedy".into())
        );
        assert_eq!(
            PlayerEndpoint::parse("random"),
            PlayerEndpoint::LocalStrategy("random".into())
        );
    }

    #[test]
    fn accepts_valid_config() {
        TournamentConfig::new("my-cup", 2, 4, 200, players(5)).unwrap();
    }
}
