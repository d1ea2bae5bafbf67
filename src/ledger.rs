use serde::Serialize;

use crate::error::{PredictorError, Result};
use crate::outcome::Outcome;
use crate::staking::Stake;

pub const DEFAULT_STARTING_BANKROLL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BetSide {
    Home,
    Away,
}

impl BetSide {
    pub fn wins(self, outcome: Outcome) -> bool {
        matches!(
            (self, outcome),
            (BetSide::Home, Outcome::Home) | (BetSide::Away, Outcome::Away)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            BetSide::Home => "home",
            BetSide::Away => "away",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bet {
    pub match_number: u32,
    pub side: BetSide,
    pub true_odds: f64,
    pub predicted_odds: f64,
    pub stake: f64,
    /// Profit credited if the bet wins.
    pub profit: f64,
}

impl Bet {
    pub fn from_stake(match_number: u32, side: BetSide, stake: &Stake) -> Self {
        Self {
            match_number,
            side,
            true_odds: stake.odds,
            predicted_odds: stake.predicted_odds,
            stake: stake.amount,
            profit: stake.expected_profit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BetResult {
    Won,
    Lost,
}

impl BetResult {
    pub fn tag(self) -> &'static str {
        match self {
            BetResult::Won => "W",
            BetResult::Lost => "L",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettledBet {
    pub bet: Bet,
    pub result: BetResult,
    pub bankroll_after: f64,
}

/// Sequential bankroll ledger. A stake leaves the bankroll when the bet is placed; a win returns
/// stake plus profit. At most one bet is pending.
#[derive(Debug, Clone, Serialize)]
pub struct BetTracker {
    bankroll: f64,
    invested: f64,
    profit: f64,
    pending: Option<Bet>,
    settled: Vec<SettledBet>,
    history: Vec<f64>,
}

impl Default for BetTracker {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_BANKROLL)
    }
}

impl BetTracker {
    pub fn new(starting_bankroll: f64) -> Self {
        Self {
            bankroll: starting_bankroll,
            invested: 0.0,
            profit: 0.0,
            pending: None,
            settled: Vec::new(),
            history: vec![starting_bankroll],
        }
    }

    pub fn place(&mut self, bet: Bet) -> Result<()> {
        if self.pending.is_some() {
            return Err(PredictorError::BetAlreadyPending);
        }
        self.invested += bet.stake;
        self.bankroll -= bet.stake;
        self.pending = Some(bet);
        Ok(())
    }

    pub fn mark_won(&mut self) -> Result<&SettledBet> {
        let bet = self.pending.take().ok_or(PredictorError::NoPendingBet)?;
        self.profit += bet.profit;
        self.bankroll += bet.stake + bet.profit;
        Ok(self.record(bet, BetResult::Won))
    }

    pub fn mark_lost(&mut self) -> Result<&SettledBet> {
        let bet = self.pending.take().ok_or(PredictorError::NoPendingBet)?;
        self.profit -= bet.stake;
        Ok(self.record(bet, BetResult::Lost))
    }

    /// Settles the pending bet against the final result.
    pub fn settle(&mut self, outcome: Outcome) -> Result<BetResult> {
        let side = self
            .pending
            .as_ref()
            .map(|bet| bet.side)
            .ok_or(PredictorError::NoPendingBet)?;
        let settled = if side.wins(outcome) {
            self.mark_won()?
        } else {
            self.mark_lost()?
        };
        Ok(settled.result)
    }

    pub fn roi(&self) -> Result<f64> {
        if self.invested <= 0.0 {
            return Err(PredictorError::NothingInvested);
        }
        Ok(self.profit / self.invested)
    }

    pub fn bankroll(&self) -> f64 {
        self.bankroll
    }

    pub fn invested(&self) -> f64 {
        self.invested
    }

    pub fn profit(&self) -> f64 {
        self.profit
    }

    pub fn pending(&self) -> Option<&Bet> {
        self.pending.as_ref()
    }

    pub fn settled(&self) -> &[SettledBet] {
        &self.settled
    }

    /// Bankroll after each settled bet, starting value first.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    fn record(&mut self, bet: Bet, result: BetResult) -> &SettledBet {
        self.history.push(self.bankroll);
        self.settled.push(SettledBet {
            bet,
            result,
            bankroll_after: self.bankroll,
        });
        &self.settled[self.settled.len() - 1]
    }
}
