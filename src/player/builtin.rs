//! A small library of built-in local strategies.
//!
//! These exist so the crate is exercisable end-to-end without a real
//! remote player: `"random"` picks uniformly among the offered options,
//! `"first-valid"` always picks the first. Neither understands the game
//! being played; they only see the generic `options` list an engine
//! offers through [`super::DecisionRequest`].

use rand::seq::SliceRandom;

use super::{Decision, DecisionRequest, LocalStrategy};

/// Picks uniformly at random among `request.options`.
pub struct RandomStrategy;

impl LocalStrategy for RandomStrategy {
    fn decide(&self, request: &DecisionRequest) -> anyhow::Result<Decision> {
        let choice = request
            .options
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| anyhow::anyhow!("no options offered"))?;
        Ok(Decision {
            decision: choice.clone(),
        })
    }
}

/// Always picks the first offered option.
pub struct FirstValidStrategy;

impl LocalStrategy for FirstValidStrategy {
    fn decide(&self, request: &DecisionRequest) -> anyhow::Result<Decision> {
        let choice = request
            .options
            .first()
            .ok_or_else(|| anyhow::anyhow!("no options offered"))?;
        Ok(Decision {
            decision: choice.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: &[serde_json::Value]) -> DecisionRequest<'_> {
        DecisionRequest {
            state: &serde_json::Value::Null,
            options,
            reason: None,
        }
    }

    #[test]
    fn random_strategy_picks_an_offered_option() {
        let options = vec![serde_json::json!("a"), serde_json::json!("b")];
        let decision = RandomStrategy.decide(&request(&options)).unwrap();
        assert!(options.contains(&decision.decision));
    }

    #[test]
    fn random_strategy_rejects_empty_options() {
        assert!(RandomStrategy.decide(&request(&[])).is_err());
    }

    #[test]
    fn first_valid_always_picks_first() {
        let options = vec![serde_json::json!("a"), serde_json::json!("b")];
        let decision = FirstValidStrategy.decide(&request(&options)).unwrap();
        assert_eq!(decision.decision, serde_json::json!("a"));
    }
}
