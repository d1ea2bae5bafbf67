use std::env;

use crate::error::Result;
use crate::ledger::DEFAULT_STARTING_BANKROLL;
use crate::matching::{ConfidencePolicy, MatchWeights, ResolverConfig};
use crate::simulation::SimulationConfig;
use crate::staking::{StakeConfig, StakeMethod};

const MAX_SIMULATIONS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorConfig {
    pub resolver: ResolverConfig,
    pub stake: StakeConfig,
    pub starting_bankroll: f64,
    pub simulation: SimulationConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            stake: StakeConfig::default(),
            starting_bankroll: DEFAULT_STARTING_BANKROLL,
            simulation: SimulationConfig::default(),
        }
    }
}

impl PredictorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`PredictorConfig::from_env`] with an arbitrary key lookup. Unset or unparsable
    /// numbers fall back to their defaults; names that do not parse are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let f64_var = |key: &str, default: f64, lo: f64, hi: f64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default)
                .clamp(lo, hi)
        };

        let base = defaults.resolver.weights;
        let weights = MatchWeights {
            name: f64_var("MATCH_NAME_WEIGHT", base.name, 0.0, 1.0),
            team: f64_var("MATCH_TEAM_WEIGHT", base.team, 0.0, 1.0),
            nationality: f64_var("MATCH_NATIONALITY_WEIGHT", base.nationality, 0.0, 1.0),
            number: f64_var("MATCH_NUMBER_WEIGHT", base.number, 0.0, 1.0),
            season: f64_var("MATCH_SEASON_WEIGHT", base.season, 0.0, 1.0),
        };
        weights.validate()?;

        let confidence_policy = match lookup("CONFIDENCE_POLICY").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.parse::<ConfidencePolicy>()?,
            None => defaults.resolver.confidence_policy,
        };
        let resolver = ResolverConfig {
            weights,
            confidence_floor: f64_var(
                "CONFIDENCE_FLOOR",
                defaults.resolver.confidence_floor,
                0.0,
                1.0,
            ),
            confidence_policy,
        };

        let method = match lookup("STAKE_METHOD").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.parse::<StakeMethod>()?,
            None => defaults.stake.method,
        };
        let stake = StakeConfig {
            method,
            target_profit: f64_var("STAKE_TARGET_PROFIT", defaults.stake.target_profit, 0.01, 1e6),
            kelly_fraction: f64_var("STAKE_KELLY_FRACTION", defaults.stake.kelly_fraction, 0.01, 1.0),
            max_odds: f64_var("STAKE_MAX_ODDS", defaults.stake.max_odds, 1.01, 1000.0),
            min_edge: f64_var("STAKE_MIN_EDGE", defaults.stake.min_edge, 0.0, 1.0),
        };

        let simulation = SimulationConfig {
            simulations: lookup("SIM_COUNT")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(defaults.simulation.simulations)
                .clamp(1, MAX_SIMULATIONS),
            seed: lookup("SIM_SEED")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(defaults.simulation.seed),
        };

        Ok(Self {
            resolver,
            stake,
            starting_bankroll: f64_var("STARTING_BANKROLL", defaults.starting_bankroll, 1.0, 1e9),
            simulation,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::PredictorError;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = PredictorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PredictorConfig::default());
    }

    #[test]
    fn values_are_clamped() {
        let config = PredictorConfig::from_lookup(lookup(&[
            ("STAKE_KELLY_FRACTION", "4"),
            ("SIM_COUNT", "0"),
            ("CONFIDENCE_FLOOR", "not a number"),
            ("STAKE_METHOD", "flat_profit"),
        ]))
        .unwrap();
        assert_eq!(config.stake.kelly_fraction, 1.0);
        assert_eq!(config.simulation.simulations, 1);
        assert_eq!(config.resolver.confidence_floor, 0.5);
        assert_eq!(config.stake.method, StakeMethod::ConstantProfit);
    }

    #[test]
    fn unknown_stake_method_is_an_error() {
        let err = PredictorConfig::from_lookup(lookup(&[("STAKE_METHOD", "martingale")])).unwrap_err();
        assert_eq!(err, PredictorError::UnknownStakeMethod("martingale".to_string()));
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let err = PredictorConfig::from_lookup(lookup(&[
            ("MATCH_NAME_WEIGHT", "0"),
            ("MATCH_TEAM_WEIGHT", "0"),
            ("MATCH_NATIONALITY_WEIGHT", "0"),
            ("MATCH_NUMBER_WEIGHT", "0"),
            ("MATCH_SEASON_WEIGHT", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PredictorError::InvalidConfig(_)));
    }
}
