//! Player Factory & capability.
//!
//! `Player` polymorphism collapses to a single tagged value rather than a
//! trait-object hierarchy: `Remote`, `Local`, or `DelayWrapped` (a
//! decorator, not a subclass). The factory (`PlayerFactory`) resolves a
//! [`PlayerConfig`] into one of these.

pub mod builtin;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::{PlayerConfig, PlayerEndpoint};

/// What an engine sends a player to ask for a decision.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRequest<'a> {
    pub state: &'a serde_json::Value,
    pub options: &'a [serde_json::Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a serde_json::Value>,
}

/// What a player returns.
#[derive(Debug, Clone, Deserialize)]
pub struct Decision {
    pub decision: serde_json::Value,
}

/// A strategy an embedder registers under a local-strategy tag or
/// `classpath:` module name — no reflection, just a name lookup.
pub trait LocalStrategy: Send + Sync {
    fn decide(&self, request: &DecisionRequest) -> anyhow::Result<Decision>;

    /// Observer hook for events a player isn't directly deciding on.
    /// Most local strategies don't care; default is a no-op.
    fn observe(&self, _state: &serde_json::Value, _event: &serde_json::Value) {}
}

/// A remote player reached over HTTP.
pub struct RemotePlayer {
    name: String,
    base_url: String,
    session: Uuid,
    client: reqwest::blocking::Client,
}

impl RemotePlayer {
    fn decide(&self, request: &DecisionRequest) -> anyhow::Result<Decision> {
        #[derive(Serialize)]
        struct Body<'a> {
            state: &'a serde_json::Value,
            options: &'a [serde_json::Value],
            #[serde(skip_serializing_if = "Option::is_none")]
            reason: Option<&'a serde_json::Value>,
            player_uuid: Uuid,
        }

        let body = Body {
            state: request.state,
            options: request.options,
            reason: request.reason,
            player_uuid: self.session,
        };

        let response = self
            .client
            .post(format!("{}/decide", self.base_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .context("remote player /decide request failed")?
            .error_for_status()
            .context("remote player /decide returned an error status")?;

        response
            .json::<Decision>()
            .context("remote player /decide returned an invalid body")
    }

    fn observe(&self, state: &serde_json::Value, event: &serde_json::Value) {
        #[derive(Serialize)]
        struct Body<'a> {
            state: &'a serde_json::Value,
            event: &'a serde_json::Value,
            player_uuid: Uuid,
        }

        let body = Body {
            state,
            event,
            player_uuid: self.session,
        };

        let result = self
            .client
            .post(format!("{}/log-event", self.base_url.trim_end_matches('/')))
            .timeout(Duration::from_secs(5))
            .json(&body)
            .send();

        match result {
            Ok(resp) if !resp.status().is_success() => {
                warn!(status = %resp.status(), player = %self.name, "log-event rejected by remote player");
            }
            Err(e) => {
                warn!(error = %e, player = %self.name, "log-event request to remote player failed");
            }
            Ok(_) => {}
        }
    }
}

/// A built-in or embedder-registered in-process player.
pub struct LocalPlayer {
    name: String,
    strategy: Arc<dyn LocalStrategy>,
}

/// The artificial-delay decorator: a distinct `Player` variant, not a
/// subclass. Sleeps in short increments so a pool shutdown can interrupt
/// it instead of silently swallowing the cancellation.
pub struct DelayedPlayer {
    inner: Box<Player>,
    min_delay: Duration,
    max_delay: Duration,
    cancel: Arc<AtomicBool>,
}

const SLEEP_QUANTUM: Duration = Duration::from_millis(5);

impl DelayedPlayer {
    fn sleep_respecting_cancel(&self) -> anyhow::Result<()> {
        let extra = if self.max_delay > self.min_delay {
            rand::thread_rng().gen_range(Duration::ZERO..=(self.max_delay - self.min_delay))
        } else {
            Duration::ZERO
        };
        let mut remaining = self.min_delay + extra;
        while remaining > Duration::ZERO {
            if self.cancel.load(Ordering::Relaxed) {
                anyhow::bail!("interrupted during artificial delay");
            }
            let step = remaining.min(SLEEP_QUANTUM);
            std::thread::sleep(step);
            remaining -= step;
        }
        Ok(())
    }
}

/// The `Player` capability: `name`, `decide`, and an optional `observe`.
pub enum Player {
    Remote(RemotePlayer),
    Local(LocalPlayer),
    DelayWrapped(DelayedPlayer),
}

impl Player {
    pub fn name(&self) -> &str {
        match self {
            Player::Remote(p) => &p.name,
            Player::Local(p) => &p.name,
            Player::DelayWrapped(p) => p.inner.name(),
        }
    }

    pub fn decide(&self, request: &DecisionRequest) -> anyhow::Result<Decision> {
        match self {
            Player::Remote(p) => p.decide(request),
            Player::Local(p) => p.strategy.decide(request),
            Player::DelayWrapped(p) => {
                p.sleep_respecting_cancel()?;
                p.inner.decide(request)
            }
        }
    }

    pub fn observe(&self, state: &serde_json::Value, event: &serde_json::Value) {
        match self {
            Player::Remote(p) => p.observe(state, event),
            Player::Local(p) => p.strategy.observe(state, event),
            Player::DelayWrapped(p) => p.inner.observe(state, event),
        }
    }
}

/// Resolves [`PlayerConfig`]s into [`Player`] capabilities.
#[derive(Clone)]
pub struct PlayerFactory {
    strategies: std::collections::HashMap<String, Arc<dyn LocalStrategy>>,
    client: reqwest::blocking::Client,
}

impl PlayerFactory {
    /// A factory pre-loaded with the built-in strategy library
    /// (`"random"`, `"first-valid"`).
    pub fn new() -> Self {
        let mut factory = PlayerFactory {
            strategies: std::collections::HashMap::new(),
            client: reqwest::blocking::Client::new(),
        };
        factory = factory.register_strategy("random", Arc::new(builtin::RandomStrategy));
        factory = factory.register_strategy("first-valid", Arc::new(builtin::FirstValidStrategy));
        factory
    }

    /// Registers a named strategy, reachable via a local-strategy tag or a
    /// `classpath:<name>` module reference.
    pub fn register_strategy(mut self, name: impl Into<String>, strategy: Arc<dyn LocalStrategy>) -> Self {
        self.strategies.insert(name.into(), strategy);
        self
    }

    /// Resolves one player config into a `Player`, applying the delay
    /// decorator if requested. `cancel` is the tournament-wide shutdown
    /// flag an artificial delay sleep checks.
    pub fn resolve(&self, config: &PlayerConfig, cancel: Arc<AtomicBool>) -> anyhow::Result<Player> {
        let base = match &config.endpoint {
            PlayerEndpoint::Remote(url) => Player::Remote(RemotePlayer {
                name: config.name.clone(),
                base_url: url.clone(),
                session: Uuid::new_v4(),
                client: self.client.clone(),
            }),
            PlayerEndpoint::LocalStrategy(tag) | PlayerEndpoint::Module(tag) => {
                let strategy = self
                    .strategies
                    .get(tag)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no local strategy registered under {tag:?}"))?;
                Player::Local(LocalPlayer {
                    name: config.name.clone(),
                    strategy,
                })
            }
        };

        Ok(if config.delay_wrap {
            Player::DelayWrapped(DelayedPlayer {
                inner: Box::new(base),
                min_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
                cancel,
            })
        } else {
            base
        })
    }
}

impl Default for PlayerFactory {
    fn default() -> Self {
        Self::new()
    }
}
