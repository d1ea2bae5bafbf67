use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};

pub const DEFAULT_TARGET_PROFIT: f64 = 2.0;
pub const DEFAULT_MAX_ODDS: f64 = 3.2;
pub const DEFAULT_MIN_EDGE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeMethod {
    /// Stake so that a win nets `target_profit`, whatever the odds.
    ConstantProfit,
    /// Bankroll fraction `(odds * p - 1) / (odds - 1)`, scaled by `kelly_fraction`.
    Kelly,
}

impl FromStr for StakeMethod {
    type Err = PredictorError;

    fn from_str(raw: &str) -> Result<Self> {
        let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "constant_profit" | "flat_profit" => Ok(StakeMethod::ConstantProfit),
            "kelly" => Ok(StakeMethod::Kelly),
            _ => Err(PredictorError::UnknownStakeMethod(raw.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakeConfig {
    pub method: StakeMethod,
    pub target_profit: f64,
    /// 1.0 is plain Kelly.
    pub kelly_fraction: f64,
    /// Long shots at or above this price are never backed.
    pub max_odds: f64,
    /// Required gap between model probability and market-implied probability.
    pub min_edge: f64,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            method: StakeMethod::Kelly,
            target_profit: DEFAULT_TARGET_PROFIT,
            kelly_fraction: 1.0,
            max_odds: DEFAULT_MAX_ODDS,
            min_edge: DEFAULT_MIN_EDGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stake {
    pub amount: f64,
    pub odds: f64,
    pub predicted_odds: f64,
    pub probability: f64,
    pub expected_profit: f64,
}

/// True when the model prices the outcome shorter than the market, the market price is below the
/// cap, and the probability edge clears the margin.
pub fn has_value(probability: f64, odds: f64, config: &StakeConfig) -> bool {
    if probability.is_nan() || probability <= 0.0 || !odds.is_finite() || odds <= 1.0 {
        return false;
    }
    let predicted_odds = 1.0 / probability;
    predicted_odds < odds && odds < config.max_odds && probability - 1.0 / odds >= config.min_edge
}

pub fn kelly_fraction(odds: f64, probability: f64) -> f64 {
    (odds * probability - 1.0) / (odds - 1.0)
}

pub fn expected_profit(stake: f64, odds: f64) -> f64 {
    stake * odds - stake
}

pub fn calculate_stake(odds: f64, probability: f64, bankroll: f64, config: &StakeConfig) -> Result<f64> {
    let stake = match config.method {
        StakeMethod::ConstantProfit => config.target_profit / (odds - 1.0),
        StakeMethod::Kelly => kelly_fraction(odds, probability) * config.kelly_fraction * bankroll,
    };
    if !stake.is_finite() || stake <= 0.0 {
        return Err(PredictorError::NonPositiveStake { stake });
    }
    Ok(stake)
}

/// Pure value check plus sizing. `Ok(None)` means there is no bet to make.
pub fn evaluate(
    probability: f64,
    odds: f64,
    bankroll: f64,
    config: &StakeConfig,
) -> Result<Option<Stake>> {
    if !has_value(probability, odds, config) {
        return Ok(None);
    }
    let amount = calculate_stake(odds, probability, bankroll, config)?;
    Ok(Some(Stake {
        amount,
        odds,
        predicted_odds: 1.0 / probability,
        probability,
        expected_profit: expected_profit(amount, odds),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_profit_stake_nets_target() {
        let config = StakeConfig {
            method: StakeMethod::ConstantProfit,
            ..StakeConfig::default()
        };
        let stake = calculate_stake(3.0, 0.5, 100.0, &config).unwrap();
        assert!((stake - 1.0).abs() < 1e-12);
        assert!((expected_profit(stake, 3.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn kelly_fraction_matches_closed_form() {
        assert!((kelly_fraction(2.0, 0.6) - 0.2).abs() < 1e-12);
        let stake = calculate_stake(2.0, 0.6, 50.0, &StakeConfig::default()).unwrap();
        assert!((stake - 10.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert_eq!(
            "martingale".parse::<StakeMethod>(),
            Err(PredictorError::UnknownStakeMethod("martingale".to_string()))
        );
        assert_eq!("constant profit".parse::<StakeMethod>(), Ok(StakeMethod::ConstantProfit));
    }

    #[test]
    fn no_edge_means_no_bet() {
        let config = StakeConfig::default();
        // market 2.0 implies 0.5; model 0.51 is below the 0.02 margin
        assert_eq!(evaluate(0.51, 2.0, 100.0, &config).unwrap(), None);
        // long shot above the cap
        assert_eq!(evaluate(0.5, 3.5, 100.0, &config).unwrap(), None);
        // model prices it longer than the market
        assert_eq!(evaluate(0.4, 2.0, 100.0, &config).unwrap(), None);
    }

    #[test]
    fn value_bet_reports_expected_profit() {
        let stake = evaluate(0.6, 2.0, 100.0, &StakeConfig::default())
            .unwrap()
            .expect("edge of 0.1 should bet");
        assert!((stake.amount - 20.0).abs() < 1e-9);
        assert!((stake.expected_profit - 20.0).abs() < 1e-9);
        assert!((stake.predicted_odds - 1.0 / 0.6).abs() < 1e-12);
    }

    #[test]
    fn empty_bankroll_is_a_non_positive_stake() {
        let err = evaluate(0.6, 2.0, 0.0, &StakeConfig::default()).unwrap_err();
        assert!(matches!(err, PredictorError::NonPositiveStake { .. }));
    }
}
