use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use ratings_predictor::backtest;
use ratings_predictor::config::PredictorConfig;
use ratings_predictor::dataset;
use ratings_predictor::matching::ResolverSession;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    ratings_predictor::logging::init(has_flag("--verbose"));

    let players_path = parse_path_arg("--players").context("missing --players <ratings.json>")?;
    let matches_path = parse_path_arg("--matches").context("missing --matches <lineups.json>")?;
    let out_path = parse_path_arg("--out").unwrap_or_else(|| PathBuf::from("features.json"));

    let config = PredictorConfig::from_env()?;
    let aliases = optional_table(parse_path_arg("--aliases"))?;
    let url_seasons = optional_table(parse_path_arg("--url-seasons"))?;

    let mut db = dataset::load_players(&players_path, &url_seasons)?;
    let loaded = dataset::load_matches(&matches_path, &aliases)?;
    let mut matches = loaded.matches;
    if let Some(season) = parse_string_arg("--season") {
        db = db.for_season(&season)?;
        matches.retain(|m| m.season == season);
    }
    if let Some(odds_path) = parse_path_arg("--odds") {
        let rows = dataset::load_odds(&odds_path)?;
        dataset::attach_odds(&mut matches, &rows, &aliases);
    }

    let mut session = ResolverSession::new(config.resolver);
    let mut extraction = backtest::extract_features(&matches, &db, &mut session);
    extraction.failures.extend(loaded.rejected);
    for failure in &extraction.failures {
        eprintln!("[WARN] match {}: {}", failure.match_number, failure.error);
    }

    let rows = backtest::build_training_rows(&extraction);
    let json = serde_json::to_string_pretty(&rows).context("serialize feature rows")?;
    fs::write(&out_path, json).with_context(|| format!("write {}", out_path.display()))?;

    println!(
        "wrote {} rows to {} ({} matches failed, {} cached names)",
        rows.len(),
        out_path.display(),
        extraction.failures.len(),
        session.cache().len()
    );
    Ok(())
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

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
