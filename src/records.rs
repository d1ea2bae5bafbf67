use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};

pub const LINEUP_SIZE: usize = 11;
pub const DEFAULT_PLAYER_SEASON: &str = "2017-2018";

const MATCH_DATE_FORMAT: &str = "%d %B %Y";
const FIXTURE_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Goalkeeper,
    Defence,
    Midfield,
    Attack,
}

impl Position {
    /// Accepts either a coarse label ("defence") or an exact position code ("LWB").
    pub fn parse(raw: &str) -> Result<Self> {
        let code = raw.trim().to_ascii_uppercase();
        let position = match code.as_str() {
            "GOALKEEPER" | "GK" => Position::Goalkeeper,
            "DEFENCE" | "DEFENSE" | "CB" | "LCB" | "RCB" | "LB" | "RB" | "LWB" | "RWB" | "SW" => {
                Position::Defence
            }
            "MIDFIELD" | "CDM" | "LDM" | "RDM" | "CM" | "LCM" | "RCM" | "CAM" | "LAM" | "RAM"
            | "LM" | "RM" => Position::Midfield,
            "ATTACK" | "ST" | "LS" | "RS" | "CF" | "LF" | "RF" | "LW" | "RW" => Position::Attack,
            _ => return Err(PredictorError::invalid("position", format!("unknown code '{raw}'"))),
        };
        Ok(position)
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Goalkeeper => "goalkeeper",
            Position::Defence => "defence",
            Position::Midfield => "midfield",
            Position::Attack => "attack",
        }
    }
}

/// Scraped values that show up either as JSON numbers or as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    fn as_u32(&self) -> Option<u32> {
        match self {
            RawNumber::Int(v) => u32::try_from(*v).ok(),
            RawNumber::Float(v) if v.fract() == 0.0 && *v >= 0.0 => Some(*v as u32),
            RawNumber::Float(_) => None,
            RawNumber::Text(s) => s.trim().parse::<u32>().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayer {
    pub name: String,
    pub team: String,
    pub nationality: String,
    #[serde(default)]
    pub number: Option<RawNumber>,
    pub rating: RawNumber,
    pub position: String,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecord {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub nationality: String,
    pub number: Option<u32>,
    pub rating: u8,
    pub position: Position,
    pub season: String,
    pub url: String,
}

impl PlayerRecord {
    pub fn from_raw(id: u32, raw: &RawPlayer, url_seasons: &HashMap<String, String>) -> Result<Self> {
        let name = slugify(&raw.name);
        if name.is_empty() {
            return Err(PredictorError::invalid("player", format!("id {id} has an empty name")));
        }
        let rating = raw
            .rating
            .as_u32()
            .filter(|r| *r <= 100)
            .ok_or_else(|| {
                PredictorError::invalid("player", format!("{name}: rating must be within 0..=100"))
            })? as u8;
        let season = match raw.season.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => season_from_player_url(&raw.url, url_seasons, DEFAULT_PLAYER_SEASON),
        };

        Ok(Self {
            id,
            name,
            team: slugify(&raw.team),
            nationality: slugify(&raw.nationality),
            number: raw.number.as_ref().and_then(RawNumber::as_u32),
            rating,
            position: Position::parse(&raw.position)?,
            season,
            url: raw.url.clone(),
        })
    }
}

/// Read-only rating database keyed by player id. Ordered so that scoring ties resolve to the
/// lowest id.
#[derive(Debug, Clone, Default)]
pub struct PlayerDatabase {
    players: BTreeMap<u32, PlayerRecord>,
    nationalities: HashSet<String>,
}

impl PlayerDatabase {
    /// Ids are assigned in load order.
    pub fn from_raw(raws: &[RawPlayer], url_seasons: &HashMap<String, String>) -> Result<Self> {
        let mut records = Vec::with_capacity(raws.len());
        for (idx, raw) in raws.iter().enumerate() {
            let id = u32::try_from(idx)
                .map_err(|_| PredictorError::invalid("player database", "too many players"))?;
            records.push(PlayerRecord::from_raw(id, raw, url_seasons)?);
        }
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<PlayerRecord>) -> Self {
        let nationalities = records.iter().map(|p| p.nationality.clone()).collect();
        let players = records.into_iter().map(|p| (p.id, p)).collect();
        Self {
            players,
            nationalities,
        }
    }

    pub fn for_season(&self, season: &str) -> Result<Self> {
        let records: Vec<PlayerRecord> = self
            .players
            .values()
            .filter(|p| p.season == season)
            .cloned()
            .collect();
        if records.is_empty() {
            return Err(PredictorError::invalid(
                "player database",
                format!("no players for season {season}"),
            ));
        }
        Ok(Self::from_records(records))
    }

    pub fn get(&self, id: u32) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_nationality(&self, slug: &str) -> bool {
        self.nationalities.contains(slug)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupEntry {
    /// Hyphenated name slug used for scoring.
    pub name: String,
    /// Name as scraped; the resolver cache is keyed on it.
    pub raw_name: String,
    pub number: u32,
    pub nationality: String,
}

impl LineupEntry {
    pub fn new(name: &str, raw_name: &str, number: &RawNumber, nationality: &str) -> Result<Self> {
        let number = number.as_u32().ok_or_else(|| {
            PredictorError::invalid("lineup entry", format!("{raw_name}: shirt number {number:?}"))
        })?;
        let name = slugify(name);
        if name.is_empty() || raw_name.trim().is_empty() {
            return Err(PredictorError::invalid("lineup entry", "empty player name"));
        }
        Ok(Self {
            name,
            raw_name: raw_name.trim().to_string(),
            number,
            nationality: slugify(nationality),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl MarketOdds {
    pub fn new(home: f64, draw: f64, away: f64) -> Result<Self> {
        for odds in [home, draw, away] {
            if !odds.is_finite() || odds < 1.0 {
                return Err(PredictorError::invalid(
                    "market odds",
                    format!("decimal odds must be >= 1, got {odds}"),
                ));
            }
        }
        Ok(Self { home, draw, away })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMatch {
    #[serde(rename = "match number")]
    pub match_number: u32,
    pub info: RawMatchInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMatchInfo {
    pub date: String,
    #[serde(rename = "home team")]
    pub home_team: String,
    #[serde(rename = "away team")]
    pub away_team: String,
    #[serde(rename = "home goals")]
    pub home_goals: u8,
    #[serde(rename = "away goals")]
    pub away_goals: u8,
    #[serde(rename = "home lineup names")]
    pub home_names: Vec<String>,
    #[serde(rename = "away lineup names")]
    pub away_names: Vec<String>,
    #[serde(rename = "home lineup raw names")]
    pub home_raw_names: Vec<String>,
    #[serde(rename = "away lineup raw names")]
    pub away_raw_names: Vec<String>,
    #[serde(rename = "home lineup numbers")]
    pub home_numbers: Vec<RawNumber>,
    #[serde(rename = "away lineup numbers")]
    pub away_numbers: Vec<RawNumber>,
    #[serde(rename = "home lineup nationalities")]
    pub home_nationalities: Vec<String>,
    #[serde(rename = "away lineup nationalities")]
    pub away_nationalities: Vec<String>,
    #[serde(default, rename = "home odds")]
    pub home_odds: Option<f64>,
    #[serde(default, rename = "draw odds")]
    pub draw_odds: Option<f64>,
    #[serde(default, rename = "away odds")]
    pub away_odds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub match_number: u32,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: NaiveDate,
    pub season: String,
    pub home_goals: u8,
    pub away_goals: u8,
    pub home_lineup: Vec<LineupEntry>,
    pub away_lineup: Vec<LineupEntry>,
    pub odds: Option<MarketOdds>,
}

impl MatchRecord {
    /// `team_aliases` maps slugified lineup-site team names onto rating-database team slugs.
    pub fn from_raw(raw: &RawMatch, team_aliases: &HashMap<String, String>) -> Result<Self> {
        let info = &raw.info;
        let kickoff = NaiveDate::parse_from_str(info.date.trim(), MATCH_DATE_FORMAT).map_err(|e| {
            PredictorError::invalid(
                "match",
                format!("match {}: date '{}': {e}", raw.match_number, info.date),
            )
        })?;

        let home_lineup = lineup_from_columns(
            &info.home_names,
            &info.home_raw_names,
            &info.home_numbers,
            &info.home_nationalities,
        )
        .map_err(|e| tag_match(raw.match_number, e))?;
        let away_lineup = lineup_from_columns(
            &info.away_names,
            &info.away_raw_names,
            &info.away_numbers,
            &info.away_nationalities,
        )
        .map_err(|e| tag_match(raw.match_number, e))?;

        let odds = match (info.home_odds, info.draw_odds, info.away_odds) {
            (Some(h), Some(d), Some(a)) => Some(MarketOdds::new(h, d, a)?),
            _ => None,
        };

        Ok(Self {
            match_number: raw.match_number,
            home_team: canonical_team(&info.home_team, team_aliases),
            away_team: canonical_team(&info.away_team, team_aliases),
            season: season_for_date(kickoff),
            kickoff,
            home_goals: info.home_goals,
            away_goals: info.away_goals,
            home_lineup,
            away_lineup,
            odds,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Fixture {
    pub home_team: String,
    pub away_team: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawFixture {
    #[serde(rename = "home team")]
    pub home_team: String,
    #[serde(rename = "away team")]
    pub away_team: String,
    pub date: String,
}

impl Fixture {
    pub fn new(home_team: &str, away_team: &str, date: NaiveDate) -> Self {
        Self {
            home_team: slugify(home_team),
            away_team: slugify(away_team),
            date,
        }
    }

    pub fn from_raw(raw: &RawFixture) -> Result<Self> {
        let date = NaiveDate::parse_from_str(raw.date.trim(), FIXTURE_DATE_FORMAT)
            .map_err(|e| PredictorError::invalid("fixture", format!("date '{}': {e}", raw.date)))?;
        Ok(Self::new(&raw.home_team, &raw.away_team, date))
    }
}

/// Matches from July onwards belong to the season starting that year.
pub fn season_for_date(date: NaiveDate) -> String {
    let year = date.year();
    if date.month() >= 7 {
        format!("{}-{}", year, year + 1)
    } else {
        format!("{}-{}", year - 1, year)
    }
}

/// Player pages carry the ratings edition as the second-to-last path segment.
pub fn season_from_player_url(url: &str, table: &HashMap<String, String>, default: &str) -> String {
    let segments: Vec<&str> = url.split('/').collect();
    if segments.len() < 2 {
        return default.to_string();
    }
    let version = segments[segments.len() - 2];
    table
        .get(version)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}

pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for ch in raw.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Slug of a team name, translated through the alias table when listed there.
pub fn canonical_team(raw: &str, aliases: &HashMap<String, String>) -> String {
    let slug = slugify(raw);
    aliases.get(&slug).cloned().unwrap_or(slug)
}

fn lineup_from_columns(
    names: &[String],
    raw_names: &[String],
    numbers: &[RawNumber],
    nationalities: &[String],
) -> Result<Vec<LineupEntry>> {
    let n = names.len();
    if raw_names.len() != n || numbers.len() != n || nationalities.len() != n {
        return Err(PredictorError::invalid(
            "lineup",
            format!(
                "column lengths differ: names={} raw={} numbers={} nationalities={}",
                n,
                raw_names.len(),
                numbers.len(),
                nationalities.len()
            ),
        ));
    }
    names
        .iter()
        .zip(raw_names)
        .zip(numbers)
        .zip(nationalities)
        .map(|(((name, raw), number), nat)| LineupEntry::new(name, raw, number, nat))
        .collect()
}

fn tag_match(match_number: u32, err: PredictorError) -> PredictorError {
    match err {
        PredictorError::InvalidRecord { what, reason } => PredictorError::InvalidRecord {
            what,
            reason: format!("match {match_number}: {reason}"),
        },
        other => other,
    }
}
