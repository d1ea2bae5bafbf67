use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};
use crate::records::{LINEUP_SIZE, LineupEntry, PlayerDatabase, PlayerRecord};

/// Raw lineup name -> resolved player id.
pub type NameCache = HashMap<String, u32>;

pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.5;

/// Weights of the independent sub-scores. The defaults sum to 1 so a perfect candidate scores 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    pub name: f64,
    pub team: f64,
    pub nationality: f64,
    pub number: f64,
    pub season: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            name: 0.50,
            team: 0.20,
            nationality: 0.15,
            number: 0.10,
            season: 0.05,
        }
    }
}

impl MatchWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [self.name, self.team, self.nationality, self.number, self.season];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PredictorError::InvalidConfig(format!(
                "match weights must be finite and non-negative: {self:?}"
            )));
        }
        if all.iter().sum::<f64>() <= 0.0 {
            return Err(PredictorError::InvalidConfig(
                "match weights sum to zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// What to do when the weakest of the 11 resolutions scores below the confidence floor.
///
/// `Ignore` keeps the historical behaviour of never acting on low scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidencePolicy {
    Ignore,
    #[default]
    Warn,
    Reject,
}

impl FromStr for ConfidencePolicy {
    type Err = PredictorError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ignore" | "off" => Ok(ConfidencePolicy::Ignore),
            "warn" => Ok(ConfidencePolicy::Warn),
            "reject" | "block" => Ok(ConfidencePolicy::Reject),
            other => Err(PredictorError::InvalidConfig(format!(
                "unknown confidence policy '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverConfig {
    pub weights: MatchWeights,
    pub confidence_floor: f64,
    pub confidence_policy: ConfidencePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            weights: MatchWeights::default(),
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            confidence_policy: ConfidencePolicy::default(),
        }
    }
}

/// Overlap of hyphen-separated name tokens relative to the shorter name. Single-character tokens
/// (initials) are ignored.
pub fn name_score(a: &str, b: &str) -> f64 {
    let ta = name_tokens(a);
    let tb = name_tokens(b);
    let smallest = ta.len().min(tb.len());
    if smallest == 0 {
        return 0.0;
    }
    ta.intersection(&tb).count() as f64 / smallest as f64
}

/// Half credit when the candidate's club field holds a nationality (stale club data for players on
/// international duty).
pub fn team_score(match_team: &str, candidate_team: &str, db: &PlayerDatabase) -> f64 {
    if candidate_team == match_team {
        1.0
    } else if db.is_nationality(candidate_team) {
        0.5
    } else {
        0.0
    }
}

pub fn score_candidate(
    entry: &LineupEntry,
    player: &PlayerRecord,
    team: &str,
    season: &str,
    db: &PlayerDatabase,
    weights: &MatchWeights,
) -> f64 {
    weights.name * name_score(&entry.name, &player.name)
        + weights.team * team_score(team, &player.team, db)
        + weights.nationality * exact(&entry.nationality, &player.nationality)
        + weights.number * exact(&Some(entry.number), &player.number)
        + weights.season * exact(season, player.season.as_str())
}

fn exact<T: PartialEq + ?Sized>(a: &T, b: &T) -> f64 {
    if a == b { 1.0 } else { 0.0 }
}

fn name_tokens(name: &str) -> HashSet<&str> {
    name.split('-')
        .filter(|token| token.chars().count() > 1)
        .collect()
}

/// Dense entry x candidate score table. Candidates are held in ascending id order.
#[derive(Debug, Clone)]
pub struct ScoreTable {
    candidate_ids: Vec<u32>,
    rows: Vec<Vec<f64>>,
}

impl ScoreTable {
    pub fn build(
        entries: &[LineupEntry],
        team: &str,
        season: &str,
        db: &PlayerDatabase,
        cache: &NameCache,
        weights: &MatchWeights,
    ) -> Self {
        let candidate_ids: Vec<u32> = db.iter().map(|p| p.id).collect();
        let rows = entries
            .iter()
            .map(|entry| {
                let cached = cache
                    .get(&entry.raw_name)
                    .copied()
                    .filter(|id| db.get(*id).is_some());
                match cached {
                    Some(id) => db
                        .iter()
                        .map(|p| if p.id == id { 1.0 } else { 0.0 })
                        .collect(),
                    None => db
                        .iter()
                        .map(|p| score_candidate(entry, p, team, season, db, weights))
                        .collect(),
                }
            })
            .collect();
        Self {
            candidate_ids,
            rows,
        }
    }

    pub fn score(&self, entry_idx: usize, candidate_id: u32) -> Option<f64> {
        let col = self.candidate_ids.binary_search(&candidate_id).ok()?;
        self.rows.get(entry_idx).map(|row| row[col])
    }

    /// Highest-scoring candidate for an entry; ties go to the lowest id.
    pub fn best_for_entry(&self, entry_idx: usize) -> Option<(u32, f64)> {
        let row = self.rows.get(entry_idx)?;
        let mut best: Option<(u32, f64)> = None;
        for (col, score) in row.iter().enumerate() {
            if best.is_none_or(|(_, s)| *score > s) {
                best = Some((self.candidate_ids[col], *score));
            }
        }
        best
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLineup {
    players: Vec<PlayerRecord>,
    scores: Vec<f64>,
}

impl ResolvedLineup {
    /// Players in lineup-entry order.
    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn min_score(&self) -> f64 {
        self.scores.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn into_players(self) -> Vec<PlayerRecord> {
        self.players
    }
}

/// Owns the raw-name cache across consecutive resolutions.
#[derive(Debug, Clone, Default)]
pub struct ResolverSession {
    config: ResolverConfig,
    cache: NameCache,
}

impl ResolverSession {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            cache: NameCache::new(),
        }
    }

    pub fn with_cache(config: ResolverConfig, cache: NameCache) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &NameCache {
        &self.cache
    }

    pub fn into_cache(self) -> NameCache {
        self.cache
    }

    /// Later entries win over existing ones for the same raw name.
    pub fn merge(&mut self, update: NameCache) {
        self.cache.extend(update);
    }

    /// Resolves 11 lineup entries onto distinct database players. The cache is only updated when
    /// resolution succeeds.
    pub fn resolve(
        &mut self,
        entries: &[LineupEntry],
        team: &str,
        season: &str,
        db: &PlayerDatabase,
    ) -> Result<ResolvedLineup> {
        if entries.len() != LINEUP_SIZE {
            return Err(PredictorError::LineupSize {
                found: entries.len(),
            });
        }
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.raw_name.as_str()) {
                return Err(PredictorError::DuplicateLineupName {
                    raw_name: entry.raw_name.clone(),
                });
            }
        }

        if db.is_empty() {
            return Err(PredictorError::invalid(
                "player database",
                format!("no players to resolve {team} {season} against"),
            ));
        }

        let table = ScoreTable::build(entries, team, season, db, &self.cache, &self.config.weights);

        // candidate id -> (entry index, score); a collision keeps the better-scoring entry.
        let mut chosen: BTreeMap<u32, (usize, f64)> = BTreeMap::new();
        let mut colliding = Vec::new();
        for idx in 0..entries.len() {
            let Some((candidate, score)) = table.best_for_entry(idx) else {
                continue;
            };
            match chosen.get(&candidate).copied() {
                Some((prev_idx, prev_score)) => {
                    colliding.push(entries[idx].raw_name.clone());
                    colliding.push(entries[prev_idx].raw_name.clone());
                    if score > prev_score {
                        chosen.insert(candidate, (idx, score));
                    }
                }
                None => {
                    chosen.insert(candidate, (idx, score));
                }
            }
        }

        if chosen.len() != LINEUP_SIZE {
            colliding.sort();
            colliding.dedup();
            return Err(PredictorError::PlayerCollision {
                resolved: chosen.len(),
                colliding,
            });
        }

        let mut picks: Vec<(usize, u32, f64)> = chosen
            .into_iter()
            .map(|(id, (idx, score))| (idx, id, score))
            .collect();
        picks.sort_by_key(|(idx, _, _)| *idx);

        let mut players = Vec::with_capacity(LINEUP_SIZE);
        let mut scores = Vec::with_capacity(LINEUP_SIZE);
        let mut update = NameCache::with_capacity(LINEUP_SIZE);
        for (idx, id, score) in picks {
            let player = db.get(id).ok_or_else(|| {
                PredictorError::invalid("player database", format!("missing player id {id}"))
            })?;
            players.push(player.clone());
            scores.push(score);
            update.insert(entries[idx].raw_name.clone(), id);
        }
        let resolved = ResolvedLineup { players, scores };

        let lowest = resolved.min_score();
        if lowest < self.config.confidence_floor {
            match self.config.confidence_policy {
                ConfidencePolicy::Ignore => {}
                ConfidencePolicy::Warn => log::warn!(
                    "{team} {season}: lowest resolution score is {lowest:.3} (floor {:.3})",
                    self.config.confidence_floor
                ),
                ConfidencePolicy::Reject => {
                    return Err(PredictorError::LowConfidence {
                        score: lowest,
                        floor: self.config.confidence_floor,
                    });
                }
            }
        }

        self.merge(update);
        Ok(resolved)
    }
}

/// Stateless form of [`ResolverSession::resolve`]: takes a cache and hands back the merged one.
pub fn resolve(
    entries: &[LineupEntry],
    team: &str,
    season: &str,
    db: &PlayerDatabase,
    cache: &NameCache,
    config: ResolverConfig,
) -> Result<(ResolvedLineup, NameCache)> {
    let mut session = ResolverSession::with_cache(config, cache.clone());
    let resolved = session.resolve(entries, team, season, db)?;
    Ok((resolved, session.into_cache()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names_score_one() {
        assert_eq!(name_score("cristiano-ronaldo", "cristiano-ronaldo"), 1.0);
    }

    #[test]
    fn disjoint_names_score_zero() {
        assert_eq!(name_score("luka-modric", "toni-kroos"), 0.0);
        assert_eq!(name_score("a-b", "a-b"), 0.0);
    }

    #[test]
    fn overlap_is_relative_to_shorter_name() {
        assert_eq!(name_score("sergio-ramos", "sergio-ramos-garcia"), 1.0);
        assert_eq!(name_score("j-sergio-ramos", "sergio-lopez"), 0.5);
    }

    #[test]
    fn confidence_policy_parses() {
        assert_eq!("Reject".parse::<ConfidencePolicy>().unwrap(), ConfidencePolicy::Reject);
        assert!("maybe".parse::<ConfidencePolicy>().is_err());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let weights = MatchWeights {
            team: -0.1,
            ..MatchWeights::default()
        };
        assert!(weights.validate().is_err());
    }
}
