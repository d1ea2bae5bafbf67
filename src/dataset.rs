use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::backtest::MatchFailure;
use crate::features::{PositionRatings, SideVector};
use crate::records::{
    Fixture, MarketOdds, MatchRecord, PlayerDatabase, RawFixture, RawMatch, RawPlayer,
    canonical_team,
};

const ODDS_DATE_FORMAT: &str = "%d/%m/%y";

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read {what} {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {what} {}", path.display()))
}

/// Flat string table such as team aliases or ratings-edition seasons.
pub fn load_string_map(path: &Path) -> Result<HashMap<String, String>> {
    read_json(path, "lookup table")
}

pub fn load_players(path: &Path, url_seasons: &HashMap<String, String>) -> Result<PlayerDatabase> {
    let raws: Vec<RawPlayer> = read_json(path, "player ratings")?;
    let db = PlayerDatabase::from_raw(&raws, url_seasons)
        .with_context(|| format!("build player database from {}", path.display()))?;
    log::info!("loaded {} players from {}", db.len(), path.display());
    Ok(db)
}

/// Match records that passed validation, sorted by kickoff, and the ones that did not.
#[derive(Debug, Clone, Default)]
pub struct LoadedMatches {
    pub matches: Vec<MatchRecord>,
    pub rejected: Vec<MatchFailure>,
}

impl LoadedMatches {
    pub fn rejected_match_numbers(&self) -> Vec<u32> {
        self.rejected.iter().map(|f| f.match_number).collect()
    }
}

pub fn load_matches(path: &Path, team_aliases: &HashMap<String, String>) -> Result<LoadedMatches> {
    let raws: Vec<RawMatch> = read_json(path, "match lineups")?;
    let mut loaded = LoadedMatches {
        matches: Vec::with_capacity(raws.len()),
        rejected: Vec::new(),
    };
    for raw in &raws {
        match MatchRecord::from_raw(raw, team_aliases) {
            Ok(record) => loaded.matches.push(record),
            Err(error) => {
                log::warn!("rejecting match {}: {error}", raw.match_number);
                loaded.rejected.push(MatchFailure {
                    match_number: raw.match_number,
                    error,
                });
            }
        }
    }
    loaded.matches.sort_by_key(|m| (m.kickoff, m.match_number));
    Ok(loaded)
}

pub fn load_fixtures(path: &Path, team_aliases: &HashMap<String, String>) -> Result<Vec<Fixture>> {
    let raws: Vec<RawFixture> = read_json(path, "fixtures")?;
    let mut fixtures = raws
        .iter()
        .map(|raw| {
            let fixture = Fixture::from_raw(raw)?;
            Ok(Fixture {
                home_team: canonical_team(&fixture.home_team, team_aliases),
                away_team: canonical_team(&fixture.away_team, team_aliases),
                date: fixture.date,
            })
        })
        .collect::<crate::error::Result<Vec<_>>>()
        .with_context(|| format!("fixtures in {}", path.display()))?;
    fixtures.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(fixtures)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLineup {
    Slots(Vec<f64>),
    Positions(PositionRatings),
}

/// Predicted lineup per team, either as 18 raw slot ratings or grouped by position.
pub fn load_predicted_lineups(
    path: &Path,
    team_aliases: &HashMap<String, String>,
) -> Result<HashMap<String, SideVector>> {
    let raws: HashMap<String, RawLineup> = read_json(path, "predicted lineups")?;
    let mut lineups = HashMap::with_capacity(raws.len());
    for (team, raw) in raws {
        let side = match &raw {
            RawLineup::Slots(values) => SideVector::from_slice(values),
            RawLineup::Positions(ratings) => SideVector::from_ratings(ratings),
        }
        .with_context(|| format!("predicted lineup for {team}"))?;
        lineups.insert(canonical_team(&team, team_aliases), side);
    }
    Ok(lineups)
}

/// One row of a football-data results file; only the Pinnacle closing prices are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsRow {
    #[serde(rename = "Div", default)]
    pub division: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "HomeTeam")]
    pub home_team: String,
    #[serde(rename = "AwayTeam")]
    pub away_team: String,
    #[serde(rename = "PSH")]
    pub home: Option<f64>,
    #[serde(rename = "PSD")]
    pub draw: Option<f64>,
    #[serde(rename = "PSA")]
    pub away: Option<f64>,
}

impl OddsRow {
    fn kickoff(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), ODDS_DATE_FORMAT).ok()
    }

    fn market(&self) -> Option<MarketOdds> {
        MarketOdds::new(self.home?, self.draw?, self.away?).ok()
    }
}

pub fn read_odds<R: io::Read>(reader: R) -> Result<Vec<OddsRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for (idx, row) in csv_reader.deserialize::<OddsRow>().enumerate() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => log::warn!("odds row {}: {e}", idx + 2),
        }
    }
    Ok(rows)
}

pub fn load_odds(path: &Path) -> Result<Vec<OddsRow>> {
    let file = fs::File::open(path).with_context(|| format!("open odds file {}", path.display()))?;
    read_odds(file).with_context(|| format!("read odds file {}", path.display()))
}

/// Copies market odds onto matches with the same teams and kickoff date. Returns how many
/// matches received odds.
pub fn attach_odds(
    matches: &mut [MatchRecord],
    rows: &[OddsRow],
    team_aliases: &HashMap<String, String>,
) -> usize {
    let mut index: HashMap<(String, String, NaiveDate), MarketOdds> = HashMap::new();
    for row in rows {
        let (Some(date), Some(odds)) = (row.kickoff(), row.market()) else {
            continue;
        };
        index.insert(
            (
                canonical_team(&row.home_team, team_aliases),
                canonical_team(&row.away_team, team_aliases),
                date,
            ),
            odds,
        );
    }

    let mut attached = 0;
    for record in matches.iter_mut() {
        let key = (record.home_team.clone(), record.away_team.clone(), record.kickoff);
        if let Some(odds) = index.get(&key) {
            record.odds = Some(*odds);
            attached += 1;
        }
    }
    log::info!("attached odds to {attached} of {} matches", matches.len());
    attached
}
