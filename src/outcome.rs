use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};

const PROB_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn from_goals(home_goals: u8, away_goals: u8) -> Self {
        if home_goals > away_goals {
            Outcome::Home
        } else if home_goals < away_goals {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }

    /// League points for (home, away).
    pub fn points(self) -> (u32, u32) {
        match self {
            Outcome::Home => (3, 0),
            Outcome::Draw => (1, 1),
            Outcome::Away => (0, 3),
        }
    }
}

/// Home/draw/away probabilities, in the classifier's column order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn new(home: f64, draw: f64, away: f64) -> Result<Self> {
        let p = Self { home, draw, away };
        p.validate()?;
        Ok(p)
    }

    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn from_slice(row: &[f64]) -> Result<Self> {
        let [home, draw, away] = row else {
            return Err(PredictorError::invalid(
                "probability row",
                format!("expected 3 columns, got {}", row.len()),
            ));
        };
        Self::new(*home, *draw, *away)
    }

    pub fn validate(&self) -> Result<()> {
        let all = [self.home, self.draw, self.away];
        if all.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(PredictorError::invalid(
                "probability row",
                format!("negative or non-finite entry in {self:?}"),
            ));
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > PROB_TOLERANCE {
            return Err(PredictorError::invalid(
                "probability row",
                format!("entries sum to {sum}"),
            ));
        }
        Ok(())
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    /// Decimal odds implied by the probability (`1/p`); infinite for a zero probability.
    pub fn implied_odds(&self, outcome: Outcome) -> f64 {
        1.0 / self.get(outcome)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Outcome {
        let u: f64 = rng.r#gen();
        if u < self.home {
            Outcome::Home
        } else if u < self.home + self.draw {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }

    pub fn argmax(&self) -> Outcome {
        if self.home >= self.draw && self.home >= self.away {
            Outcome::Home
        } else if self.draw >= self.away {
            Outcome::Draw
        } else {
            Outcome::Away
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

impl Metrics {
    fn empty() -> Self {
        Self {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        }
    }
}

pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics::empty();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        for candidate in [Outcome::Home, Outcome::Draw, Outcome::Away] {
            let y = if candidate == *outcome { 1.0 } else { 0.0 };
            brier_sum += (p.get(candidate) - y).powi(2);
        }
        log_loss_sum += -p.get(*outcome).clamp(1e-12, 1.0).ln();
        if p.argmax() == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}
