pub mod backtest;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod features;
pub mod ledger;
pub mod logging;
pub mod matching;
pub mod outcome;
pub mod records;
pub mod simulation;
pub mod staking;
