use ratings_predictor::error::{ErrorKind, PredictorError};
use ratings_predictor::ledger::{Bet, BetResult, BetSide, BetTracker};
use ratings_predictor::outcome::Outcome;
use ratings_predictor::staking::{self, StakeConfig, StakeMethod};

#[test]
fn flat_profit_stake_nets_the_target() {
    let config = StakeConfig {
        method: StakeMethod::ConstantProfit,
        target_profit: 2.0,
        ..StakeConfig::default()
    };
    let stake = staking::calculate_stake(3.0, 0.5, 100.0, &config).unwrap();
    assert!((stake - 1.0).abs() < 1e-12);
    assert!((staking::expected_profit(stake, 3.0) - 2.0).abs() < 1e-12);
}

#[test]
fn kelly_fraction_closed_form() {
    assert!((staking::kelly_fraction(2.0, 0.6) - 0.2).abs() < 1e-12);
}

#[test]
fn ledger_walkthrough() {
    let mut tracker = BetTracker::new(100.0);
    tracker
        .place(Bet {
            match_number: 7,
            side: BetSide::Home,
            true_odds: 2.5,
            predicted_odds: 2.0,
            stake: 10.0,
            profit: 15.0,
        })
        .unwrap();
    assert_eq!(tracker.bankroll(), 90.0);
    assert_eq!(tracker.settle(Outcome::Home).unwrap(), BetResult::Won);
    assert_eq!(tracker.bankroll(), 115.0);
    assert_eq!(tracker.profit(), 15.0);
    assert_eq!(tracker.roi().unwrap(), 1.5);
}

#[test]
fn evaluated_stake_flows_into_the_ledger() {
    let config = StakeConfig::default();
    let mut tracker = BetTracker::default();
    let stake = staking::evaluate(0.6, 2.0, tracker.bankroll(), &config)
        .unwrap()
        .expect("clear edge");
    tracker
        .place(Bet::from_stake(1, BetSide::Away, &stake))
        .unwrap();
    let err = tracker
        .place(Bet::from_stake(2, BetSide::Home, &stake))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Precondition);

    assert_eq!(tracker.settle(Outcome::Home).unwrap(), BetResult::Lost);
    assert!((tracker.bankroll() - 80.0).abs() < 1e-9);
    assert!((tracker.roi().unwrap() + 1.0).abs() < 1e-9);
}

#[test]
fn error_kinds_cover_configuration_failures() {
    assert_eq!(
        "martingale".parse::<StakeMethod>().unwrap_err().kind(),
        ErrorKind::Configuration
    );
    assert_eq!(
        PredictorError::NonPositiveStake { stake: -1.0 }.kind(),
        ErrorKind::Configuration
    );
}

#[test]
fn half_kelly_stakes_half_the_full_fraction() {
    let config = StakeConfig {
        kelly_fraction: 0.5,
        ..StakeConfig::default()
    };
    let stake = staking::evaluate(0.6, 2.0, 100.0, &config)
        .unwrap()
        .expect("clear edge");
    // full Kelly at evens with p = 0.6 is 0.2 of the bankroll
    assert!((stake.amount - 10.0).abs() < 1e-9);
    assert!((stake.expected_profit - 10.0).abs() < 1e-9);
}

#[test]
fn odds_at_the_cap_are_not_backed() {
    let config = StakeConfig::default();
    assert_eq!(config.max_odds, 3.2);
    assert!(staking::evaluate(0.5, 3.2, 100.0, &config).unwrap().is_none());
    assert!(!staking::has_value(0.5, 3.2, &config));

    let below = staking::evaluate(0.5, 3.19, 100.0, &config)
        .unwrap()
        .expect("just under the cap");
    assert_eq!(below.odds, 3.19);
}
