use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use ratings_predictor::classifier::DenseNet;
use ratings_predictor::config::PredictorConfig;
use ratings_predictor::dataset;
use ratings_predictor::export;
use ratings_predictor::simulation::{SeasonSimulator, SeasonTable};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    ratings_predictor::logging::init(has_flag("--verbose"));

    let fixtures_path = parse_path_arg("--fixtures").context("missing --fixtures <fixtures.json>")?;
    let lineups_path = parse_path_arg("--lineups").context("missing --lineups <lineups.json>")?;
    let model_path = parse_path_arg("--model").context("missing --model <weights.json>")?;

    let mut config = PredictorConfig::from_env()?;
    if let Some(count) = parse_u64_arg("--simulations") {
        config.simulation.simulations = (count as usize).clamp(1, 1_000_000);
    }
    if let Some(seed) = parse_u64_arg("--seed") {
        config.simulation.seed = seed;
    }

    let aliases = match parse_path_arg("--aliases") {
        Some(path) => dataset::load_string_map(&path)?,
        None => HashMap::new(),
    };
    let fixtures = dataset::load_fixtures(&fixtures_path, &aliases)?;
    if fixtures.is_empty() {
        return Err(anyhow!("no fixtures in {}", fixtures_path.display()));
    }
    let lineups = dataset::load_predicted_lineups(&lineups_path, &aliases)?;
    let model = DenseNet::load(&model_path)?;

    let simulator = SeasonSimulator::from_lineups(fixtures, &lineups, &model)?;
    let table = simulator.simulate(config.simulation)?;
    print_table(&table);

    if let Some(csv_path) = parse_path_arg("--csv") {
        export::write_season_csv(&csv_path, &table)?;
        println!("wrote {}", csv_path.display());
    }
    if let Some(xlsx_path) = parse_path_arg("--xlsx") {
        export::export_season_xlsx(&xlsx_path, &table)?;
        println!("wrote {}", xlsx_path.display());
    }
    Ok(())
}

fn print_table(table: &SeasonTable) {
    println!("Season projection ({} simulations):", table.simulations);
    println!(
        "  {:<24} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
        "team", "pts", "w", "d", "l", "title", "top4", "rel"
    );
    for row in &table.rows {
        println!(
            "  {:<24} {:>6.2} {:>6.2} {:>6.2} {:>6.2} {:>6.2} {:>6.2} {:>6.2}",
            row.team,
            row.points,
            row.wins,
            row.draws,
            row.losses,
            row.title,
            row.top_four,
            row.relegation
        );
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

fn parse_u64_arg(name: &str) -> Option<u64> {
    parse_string_arg(name).and_then(|v| v.parse::<u64>().ok())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
