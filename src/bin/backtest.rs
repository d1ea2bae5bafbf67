use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use ratings_predictor::backtest::{self, BacktestReport};
use ratings_predictor::classifier::DenseNet;
use ratings_predictor::config::PredictorConfig;
use ratings_predictor::dataset;
use ratings_predictor::export;
use ratings_predictor::ledger::BetResult;
use ratings_predictor::matching::ResolverSession;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    ratings_predictor::logging::init(has_flag("--verbose"));

    let players_path = parse_path_arg("--players").context("missing --players <ratings.json>")?;
    let matches_path = parse_path_arg("--matches").context("missing --matches <lineups.json>")?;
    let model_path = parse_path_arg("--model").context("missing --model <weights.json>")?;
    let season = parse_string_arg("--season");

    let mut config = PredictorConfig::from_env()?;
    if let Some(bankroll) = parse_f64_arg("--bankroll") {
        config.starting_bankroll = bankroll.clamp(1.0, 1e9);
    }

    let aliases = optional_table(parse_path_arg("--aliases"))?;
    let url_seasons = optional_table(parse_path_arg("--url-seasons"))?;

    let mut db = dataset::load_players(&players_path, &url_seasons)?;
    let loaded = dataset::load_matches(&matches_path, &aliases)?;
    let mut matches = loaded.matches;
    if let Some(season) = &season {
        db = db.for_season(season)?;
        matches.retain(|m| &m.season == season);
    }
    if matches.is_empty() {
        return Err(anyhow!("no matches to backtest in {}", matches_path.display()));
    }
    if let Some(odds_path) = parse_path_arg("--odds") {
        let rows = dataset::load_odds(&odds_path)?;
        let attached = dataset::attach_odds(&mut matches, &rows, &aliases);
        println!("odds attached to {attached}/{} matches", matches.len());
    }

    let model = DenseNet::load(&model_path)?;
    let mut session = ResolverSession::new(config.resolver);
    let mut extraction = backtest::extract_features(&matches, &db, &mut session);
    extraction.failures.extend(loaded.rejected);
    for failure in &extraction.failures {
        eprintln!("[WARN] match {}: {}", failure.match_number, failure.error);
    }

    let report = backtest::run_backtest(
        &extraction,
        &model,
        &config.stake,
        config.starting_bankroll,
    )?;
    print_report(&report, config.starting_bankroll);

    if let Some(xlsx) = parse_path_arg("--xlsx") {
        let written = export::export_bets_xlsx(&xlsx, &report.tracker)?;
        println!("wrote {written} bets to {}", xlsx.display());
    }
    Ok(())
}

fn print_report(report: &BacktestReport, starting_bankroll: f64) {
    let tracker = &report.tracker;
    let won = tracker
        .settled()
        .iter()
        .filter(|s| s.result == BetResult::Won)
        .count();
    println!("Backtest:");
    println!(
        "  matches={} failed={} without_odds={}",
        report.predictions.len(),
        report.failed.len(),
        report.without_odds.len()
    );
    println!(
        "  bets={} won={} invested={:.2} profit={:.2}",
        tracker.settled().len(),
        won,
        tracker.invested(),
        tracker.profit()
    );
    println!(
        "  bankroll {:.2} -> {:.2}",
        starting_bankroll,
        tracker.bankroll()
    );
    match report.roi() {
        Some(roi) => println!("  roi={:.4}", roi),
        None => println!("  roi=n/a (no bets placed)"),
    }
    println!(
        "  samples={} brier={:.4} log_loss={:.4} accuracy={:.3}",
        report.metrics.samples, report.metrics.brier, report.metrics.log_loss, report.metrics.accuracy
    );
    if !report.failed.is_empty() {
        println!("  failed matches: {:?}", report.failed);
    }
}

fn optional_table(path: Option<PathBuf>) -> Result<HashMap<String, String>> {
    match path {
        Some(path) => dataset::load_string_map(&path),
        None => Ok(HashMap::new()),
    }
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    parse_string_arg(name).map(PathBuf::from)
}

fn parse_f64_arg(name: &str) -> Option<f64> {
    parse_string_arg(name).and_then(|v| v.parse::<f64>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
