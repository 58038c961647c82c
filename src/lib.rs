//! # Kingdom Arena
//!
//! Scheduler and execution core for running practice kingdom-card
//! tournaments across a mix of remote HTTP players and built-in
//! strategies.
//!
//! It provides:
//! - A balanced pairing schedule per round ([`schedule`])
//! - A bounded worker pool dispatching games with stream-on-completion
//!   semantics ([`runner::TournamentRunner`])
//! - A multiplayer Bayesian skill-rating tracker ([`rating::Tracker`])
//! - Atomic, resumable per-round result artifacts ([`store::ResultStore`])
//! - A live status stream for subscribers ([`broadcaster::Broadcaster`])
//!
//! This crate implements only the Tournament Scheduler and Execution
//! Core. The game engine ([`engine::Engine`]), player implementations
//! ([`player::Player`]), and any HTTP/WebSocket transport around this
//! crate are external collaborators the core depends on only through
//! their trait/wire contracts.
//!
//! # Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kingdom_arena::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let players = vec![
//!         PlayerConfig::new("p1", "Player One", "random")?,
//!         PlayerConfig::new("p2", "Player Two", "first-valid")?,
//!         PlayerConfig::new("p3", "Player Three", "random")?,
//!         PlayerConfig::new("p4", "Player Four", "first-valid")?,
//!     ];
//!     let config = TournamentConfig::new("practice-cup", 2, 4, 100, players)?;
//!
//!     // `engine_loader` comes from your game engine module; see `engine::EngineLoader`.
//!     let runner = TournamentRunner::new(
//!         RunnerOptions::from_env(),
//!         engine_loader,
//!         PlayerFactory::new(),
//!         Arc::new(Broadcaster::new()),
//!     );
//!
//!     let tape = runner.run(config)?;
//!     println!("compiled {} events", tape.events.len());
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod broadcaster;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
mod executor;
pub mod logger;
pub mod options;
pub mod player;
pub mod rating;
pub mod runner;
pub mod schedule;
pub mod store;

pub use anyhow;

/// Commonly used types for quick access.
///
/// ```rust
/// use kingdom_arena::prelude::*;
/// ```
pub mod prelude {
    pub use crate::broadcaster::Broadcaster;
    pub use crate::config::{PlayerConfig, PlayerEndpoint, TournamentConfig};
    pub use crate::data::{GameOutcome, Placement, Tape, TournamentStatus};
    pub use crate::engine::{Engine, EngineLoader, EnginePlayer};
    pub use crate::options::RunnerOptions;
    pub use crate::player::PlayerFactory;
    pub use crate::rating::{ModelParams, Rating, Tracker};
    pub use crate::runner::TournamentRunner;
}
