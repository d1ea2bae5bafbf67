use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use ratings_predictor::classifier::{Classifier, DenseNet};
use ratings_predictor::features::{FeatureVector, PositionRatings};
use ratings_predictor::outcome::Outcome;

#[derive(Debug, Deserialize)]
struct MatchSheet {
    home: PositionRatings,
    away: PositionRatings,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    ratings_predictor::logging::init(has_flag("--verbose"));

    let model_path = parse_path_arg("--model").context("missing --model <weights.json>")?;
    let sheet_path = parse_path_arg("--match").context("missing --match <ratings.json>")?;

    let raw = fs::read_to_string(&sheet_path)
        .with_context(|| format!("read {}", sheet_path.display()))?;
    let sheet: MatchSheet = serde_json::from_str(&raw).context("parse match sheet")?;

    let features = FeatureVector::from_position_ratings(&sheet.home, &sheet.away)?.normalized();
    let model = DenseNet::load(&model_path)?;
    let probs = model
        .predict(&[features])?
        .into_iter()
        .next()
        .context("model returned no prediction")?;

    for (label, outcome) in [("home", Outcome::Home), ("draw", Outcome::Draw), ("away", Outcome::Away)] {
        println!(
            "{label:<5} p={:.3} odds={:.2}",
            probs.get(outcome),
            probs.implied_odds(outcome)
        );
    }
    Ok(())
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
