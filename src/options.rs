//! Runner-wide knobs: pool size, dispatch stagger, data directory, rating
//! model parameters.
//!
//! A builder-with-defaults plus an environment-variable escape hatch,
//! scoped to "how the Runner behaves" rather than "what to run" (that's
//! [`crate::config`]).

use std::path::PathBuf;
use std::time::Duration;

use crate::rating::ModelParams;

/// Runner-wide behavior knobs.
///
/// # Environment Variables
///
/// - `ARENA_POOL_SIZE` — worker pool size (default: `32`)
/// - `ARENA_STAGGER_MS` — per-item submission stagger in ms (default: `50`)
/// - `ARENA_DATA_DIR` — root directory for tournament artifacts (default: `./data`)
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub(crate) pool_size: usize,
    pub(crate) stagger: Duration,
    pub(crate) data_dir: PathBuf,
    pub(crate) model: ModelParams,
}

impl RunnerOptions {
    /// Defaults: a pool size in the tens (the workload is I/O-bound on
    /// remote players, so this is decoupled from core count), a 50ms
    /// submission stagger, `./data` as the artifact root, and the
    /// standard TrueSkill-style rating defaults.
    pub fn new() -> Self {
        Self {
            pool_size: 32,
            stagger: Duration::from_millis(50),
            data_dir: PathBuf::from("data"),
            model: ModelParams::default(),
        }
    }

    /// Build options from `ARENA_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut opts = Self::new();

        if let Ok(v) = std::env::var("ARENA_POOL_SIZE") {
            if let Ok(n) = v.parse() {
                opts.pool_size = n;
            }
        }
        if let Ok(v) = std::env::var("ARENA_STAGGER_MS") {
            if let Ok(ms) = v.parse() {
                opts.stagger = Duration::from_millis(ms);
            }
        }
        if let Ok(v) = std::env::var("ARENA_DATA_DIR") {
            opts.data_dir = PathBuf::from(v);
        }

        opts
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        assert!(size >= 1, "pool size must be >= 1");
        self.pool_size = size;
        self
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_model(mut self, model: ModelParams) -> Self {
        self.model = model;
        self
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::new()
    }
}
