use chrono::NaiveDate;
use serde::Serialize;

use crate::classifier::Classifier;
use crate::error::{PredictorError, Result};
use crate::features::FeatureVector;
use crate::ledger::{Bet, BetSide, BetTracker};
use crate::matching::ResolverSession;
use crate::outcome::{Metrics, Outcome, Prob3, evaluate_probs};
use crate::records::{MarketOdds, MatchRecord, PlayerDatabase};
use crate::staking::{self, StakeConfig};

/// One match with both lineups resolved.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedMatch {
    pub match_number: u32,
    pub kickoff: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub outcome: Outcome,
    pub odds: Option<MarketOdds>,
    /// Normalized, ready for the classifier.
    pub features: FeatureVector,
}

#[derive(Debug, Clone)]
pub struct MatchFailure {
    pub match_number: u32,
    pub error: PredictorError,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub matches: Vec<ExtractedMatch>,
    pub failures: Vec<MatchFailure>,
}

impl Extraction {
    pub fn failed_match_numbers(&self) -> Vec<u32> {
        self.failures.iter().map(|f| f.match_number).collect()
    }
}

/// Resolves both sides of every match in order. A match that fails to resolve or to fill the
/// position buckets is recorded and skipped.
pub fn extract_features(
    matches: &[MatchRecord],
    db: &PlayerDatabase,
    session: &mut ResolverSession,
) -> Extraction {
    let mut out = Extraction::default();
    for record in matches {
        match extract_one(record, db, session) {
            Ok(features) => out.matches.push(ExtractedMatch {
                match_number: record.match_number,
                kickoff: record.kickoff,
                home_team: record.home_team.clone(),
                away_team: record.away_team.clone(),
                outcome: Outcome::from_goals(record.home_goals, record.away_goals),
                odds: record.odds,
                features,
            }),
            Err(error) => {
                log::warn!("skipping match {}: {error}", record.match_number);
                out.failures.push(MatchFailure {
                    match_number: record.match_number,
                    error,
                });
            }
        }
    }
    log::info!(
        "extracted {} matches ({} failed)",
        out.matches.len(),
        out.failures.len()
    );
    out
}

fn extract_one(
    record: &MatchRecord,
    db: &PlayerDatabase,
    session: &mut ResolverSession,
) -> Result<FeatureVector> {
    let home = session.resolve(&record.home_lineup, &record.home_team, &record.season, db)?;
    let away = session.resolve(&record.away_lineup, &record.away_team, &record.season, db)?;
    Ok(FeatureVector::build(&home, &away)?.normalized())
}

/// Model price against market price for one side of one match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsPair {
    pub match_number: u32,
    pub predicted: f64,
    pub market: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub tracker: BetTracker,
    pub predictions: Vec<Prob3>,
    pub home_odds: Vec<OddsPair>,
    pub away_odds: Vec<OddsPair>,
    pub failed: Vec<u32>,
    pub without_odds: Vec<u32>,
    pub metrics: Metrics,
}

impl BacktestReport {
    /// `None` when no bet was placed.
    pub fn roi(&self) -> Option<f64> {
        self.tracker.roi().ok()
    }

    pub fn bankroll_history(&self) -> &[f64] {
        self.tracker.history()
    }
}

/// Predicts every extracted match in one classifier call, then walks the matches in order. The
/// home side is considered first and the away side only when home has no value; draws are never
/// backed. Each bet is settled against the final score before the next match.
pub fn run_backtest<C: Classifier>(
    extraction: &Extraction,
    classifier: &C,
    stake_config: &StakeConfig,
    starting_bankroll: f64,
) -> Result<BacktestReport> {
    let batch: Vec<FeatureVector> = extraction
        .matches
        .iter()
        .map(|m| m.features.clone())
        .collect();
    let predictions = if batch.is_empty() {
        Vec::new()
    } else {
        classifier.predict(&batch)?
    };
    if predictions.len() != batch.len() {
        return Err(PredictorError::invalid(
            "classifier output",
            format!("{} rows for {} matches", predictions.len(), batch.len()),
        ));
    }

    let mut tracker = BetTracker::new(starting_bankroll);
    let mut home_odds = Vec::new();
    let mut away_odds = Vec::new();
    let mut without_odds = Vec::new();

    for (m, p) in extraction.matches.iter().zip(&predictions) {
        let Some(odds) = m.odds else {
            log::warn!("match {} has no market odds, not betting", m.match_number);
            without_odds.push(m.match_number);
            continue;
        };
        home_odds.push(OddsPair {
            match_number: m.match_number,
            predicted: p.implied_odds(Outcome::Home),
            market: odds.home,
        });
        away_odds.push(OddsPair {
            match_number: m.match_number,
            predicted: p.implied_odds(Outcome::Away),
            market: odds.away,
        });

        let candidates = [(BetSide::Home, p.home, odds.home), (BetSide::Away, p.away, odds.away)];
        for (side, probability, price) in candidates {
            let stake = match staking::evaluate(probability, price, tracker.bankroll(), stake_config) {
                Ok(Some(stake)) => stake,
                Ok(None) => continue,
                Err(PredictorError::NonPositiveStake { stake }) => {
                    log::warn!(
                        "match {}: stake {stake:.4} with bankroll {:.2}, not betting",
                        m.match_number,
                        tracker.bankroll()
                    );
                    break;
                }
                Err(e) => return Err(e),
            };
            tracker.place(Bet::from_stake(m.match_number, side, &stake))?;
            let result = tracker.settle(m.outcome)?;
            log::debug!(
                "match {} {} bet {:.2} @ {:.2}: {}",
                m.match_number,
                side.label(),
                stake.amount,
                stake.odds,
                result.tag()
            );
            break;
        }
    }

    let outcomes: Vec<Outcome> = extraction.matches.iter().map(|m| m.outcome).collect();
    let metrics = evaluate_probs(&predictions, &outcomes);

    Ok(BacktestReport {
        tracker,
        predictions,
        home_odds,
        away_odds,
        failed: extraction.failed_match_numbers(),
        without_odds,
        metrics,
    })
}

/// Feature/target row for model training data.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingRow {
    pub match_number: u32,
    pub features: FeatureVector,
    /// One-hot (home, draw, away).
    pub result: [f64; 3],
    pub odds: Option<MarketOdds>,
}

pub fn build_training_rows(extraction: &Extraction) -> Vec<TrainingRow> {
    extraction
        .matches
        .iter()
        .map(|m| TrainingRow {
            match_number: m.match_number,
            features: m.features.clone(),
            result: match m.outcome {
                Outcome::Home => [1.0, 0.0, 0.0],
                Outcome::Draw => [0.0, 1.0, 0.0],
                Outcome::Away => [0.0, 0.0, 1.0],
            },
            odds: m.odds,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Prob3);

    impl Classifier for Fixed {
        fn predict(&self, features: &[FeatureVector]) -> Result<Vec<Prob3>> {
            Ok(vec![self.0; features.len()])
        }
    }

    fn extracted(number: u32, outcome: Outcome, odds: Option<MarketOdds>) -> ExtractedMatch {
        ExtractedMatch {
            match_number: number,
            kickoff: NaiveDate::from_ymd_opt(2017, 8, 12).unwrap(),
            home_team: "home".to_string(),
            away_team: "away".to_string(),
            outcome,
            odds,
            features: FeatureVector::new(vec![0.0; 36]).unwrap(),
        }
    }

    #[test]
    fn home_value_is_backed_and_settled() {
        let extraction = Extraction {
            matches: vec![extracted(
                1,
                Outcome::Home,
                Some(MarketOdds::new(2.0, 3.4, 4.0).unwrap()),
            )],
            failures: Vec::new(),
        };
        let model = Fixed(Prob3::new(0.6, 0.2, 0.2).unwrap());
        let report = run_backtest(&extraction, &model, &StakeConfig::default(), 100.0).unwrap();
        // kelly 0.2 of 100 at evens wins 20
        assert!((report.tracker.bankroll() - 120.0).abs() < 1e-9);
        assert_eq!(report.tracker.settled().len(), 1);
        assert_eq!(report.bankroll_history().len(), 2);
        assert!((report.roi().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn draws_are_never_backed() {
        let extraction = Extraction {
            matches: vec![extracted(
                1,
                Outcome::Draw,
                Some(MarketOdds::new(3.0, 2.0, 3.0).unwrap()),
            )],
            failures: Vec::new(),
        };
        let model = Fixed(Prob3::new(0.2, 0.6, 0.2).unwrap());
        let report = run_backtest(&extraction, &model, &StakeConfig::default(), 100.0).unwrap();
        assert!(report.tracker.settled().is_empty());
        assert_eq!(report.roi(), None);
    }

    #[test]
    fn matches_without_odds_are_listed() {
        let extraction = Extraction {
            matches: vec![extracted(9, Outcome::Away, None)],
            failures: vec![MatchFailure {
                match_number: 4,
                error: PredictorError::GoalkeeperCount { found: 0 },
            }],
        };
        let model = Fixed(Prob3::uniform());
        let report = run_backtest(&extraction, &model, &StakeConfig::default(), 100.0).unwrap();
        assert_eq!(report.without_odds, vec![9]);
        assert_eq!(report.failed, vec![4]);
        assert_eq!(report.metrics.samples, 1);
    }

    #[test]
    fn training_rows_are_one_hot() {
        let extraction = Extraction {
            matches: vec![extracted(3, Outcome::Away, None)],
            failures: Vec::new(),
        };
        let rows = build_training_rows(&extraction);
        assert_eq!(rows[0].result, [0.0, 0.0, 1.0]);
    }
}
