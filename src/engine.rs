//! Engine Loader interface.
//!
//! The core depends only on this two-method-shaped contract, never on how
//! an engine module is actually loaded (dynamic library, subprocess,
//! in-process factory). Dynamic loading is expressed here as a registry of
//! named factories — [`ClosureEngineLoader`] is the in-process instance of
//! that registry, suitable for embedding and for tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::KingdomSelection;
use crate::player::Player;

/// A materialized player handed to the engine: its canonical id, its
/// display name (the engine reports results by name), and the decision
/// capability itself.
pub struct EnginePlayer {
    pub id: String,
    pub name: String,
    pub player: Player,
}

/// One player's raw result as reported by the engine.
#[derive(Debug, Clone)]
pub struct EnginePlayerResult {
    pub name: String,
    pub score: u32,
    pub deck: Vec<String>,
}

/// What `Engine::play` returns.
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub player_results: Vec<EnginePlayerResult>,
}

/// A single game instance, already seeded with players and a kingdom.
/// Implementations are free to be stateful; the core calls `play` exactly
/// once per instance.
pub trait Engine {
    fn play(&mut self) -> anyhow::Result<EngineOutcome>;
}

/// Constructs fresh `Engine` instances for one game at a time.
pub trait EngineLoader: Send + Sync {
    fn create(
        &self,
        players: Vec<EnginePlayer>,
        kingdom: &KingdomSelection,
        max_turns: u32,
    ) -> anyhow::Result<Box<dyn Engine>>;
}

type EngineFactoryFn =
    dyn Fn(Vec<EnginePlayer>, &KingdomSelection, u32) -> anyhow::Result<Box<dyn Engine>> + Send + Sync;

/// An in-process registry of named engine factories, standing in for the
/// platform-specific dynamic loader this crate does not implement.
#[derive(Clone, Default)]
pub struct ClosureEngineLoader {
    factories: HashMap<String, Arc<EngineFactoryFn>>,
    active: Option<String>,
}

impl ClosureEngineLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named factory and selects it as the one `create` uses.
    /// Re-registering replaces the previous factory under that name.
    pub fn register<F>(mut self, handle: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Vec<EnginePlayer>, &KingdomSelection, u32) -> anyhow::Result<Box<dyn Engine>>
            + Send
            + Sync
            + 'static,
    {
        let handle = handle.into();
        self.factories.insert(handle.clone(), Arc::new(factory));
        self.active = Some(handle);
        self
    }

    /// Selects a previously registered factory as the active one.
    pub fn activate(mut self, handle: impl Into<String>) -> anyhow::Result<Self> {
        let handle = handle.into();
        anyhow::ensure!(self.factories.contains_key(&handle), "unknown engine handle {handle:?}");
        self.active = Some(handle);
        Ok(self)
    }
}

impl EngineLoader for ClosureEngineLoader {
    fn create(
        &self,
        players: Vec<EnginePlayer>,
        kingdom: &KingdomSelection,
        max_turns: u32,
    ) -> anyhow::Result<Box<dyn Engine>> {
        let handle = self
            .active
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no engine handle registered"))?;
        let factory = self
            .factories
            .get(handle)
            .ok_or_else(|| anyhow::anyhow!("unknown engine handle {handle:?}"))?;
        factory(players, kingdom, max_turns)
    }
}

#[cfg(test)]
pub mod fakes {
    //! Deterministic fake engine used across the runner/table/store tests.

    use super::*;

    /// Scores players by the length of their name, descending, so outcomes
    /// are deterministic and easy to assert on.
    pub struct ScoreByNameLenEngine {
        pub players: Vec<EnginePlayer>,
        pub kingdom: KingdomSelection,
    }

    impl Engine for ScoreByNameLenEngine {
        fn play(&mut self) -> anyhow::Result<EngineOutcome> {
            let player_results = self
                .players
                .iter()
                .map(|p| EnginePlayerResult {
                    name: p.name.clone(),
                    score: p.name.len() as u32,
                    deck: self.kingdom.cards()[..2].to_vec(),
                })
                .collect();
            Ok(EngineOutcome { player_results })
        }
    }

    pub fn loader() -> ClosureEngineLoader {
        ClosureEngineLoader::new().register("fake", |players, kingdom, _max_turns| {
            Ok(Box::new(ScoreByNameLenEngine {
                players,
                kingdom: kingdom.clone(),
            }) as Box<dyn Engine>)
        })
    }

    pub struct AlwaysPanicsEngine;

    impl Engine for AlwaysPanicsEngine {
        fn play(&mut self) -> anyhow::Result<EngineOutcome> {
            panic!("engine always fails for this test")
        }
    }

    pub fn panicking_loader() -> ClosureEngineLoader {
        ClosureEngineLoader::new().register("panics", |_players, _kingdom, _max_turns| {
            Ok(Box::new(AlwaysPanicsEngine) as Box<dyn Engine>)
        })
    }
}
