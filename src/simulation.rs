use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::classifier::Classifier;
use crate::error::{PredictorError, Result};
use crate::features::{FeatureVector, SideVector};
use crate::outcome::{Outcome, Prob3};
use crate::records::Fixture;

pub const TOP_PLACES: usize = 4;
pub const RELEGATION_PLACES: usize = 3;
pub const DEFAULT_SIMULATIONS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    pub simulations: usize,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulations: DEFAULT_SIMULATIONS,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TeamTally {
    points: u64,
    wins: u64,
    draws: u64,
    losses: u64,
    titles: u64,
    top_places: u64,
    relegations: u64,
}

/// Counters summed over simulated seasons, indexed like the simulator's team list. Each replay
/// fills its own aggregate; aggregates are combined with [`SeasonAggregate::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonAggregate {
    tallies: Vec<TeamTally>,
    seasons: u64,
}

impl SeasonAggregate {
    fn new(teams: usize) -> Self {
        Self {
            tallies: vec![TeamTally::default(); teams],
            seasons: 0,
        }
    }

    pub fn seasons(&self) -> u64 {
        self.seasons
    }

    pub fn merge(mut self, other: SeasonAggregate) -> SeasonAggregate {
        for (mine, theirs) in self.tallies.iter_mut().zip(other.tallies) {
            mine.points += theirs.points;
            mine.wins += theirs.wins;
            mine.draws += theirs.draws;
            mine.losses += theirs.losses;
            mine.titles += theirs.titles;
            mine.top_places += theirs.top_places;
            mine.relegations += theirs.relegations;
        }
        self.seasons += other.seasons;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamProjection {
    pub team: String,
    pub points: f64,
    pub wins: f64,
    pub draws: f64,
    pub losses: f64,
    pub title: f64,
    pub top_four: f64,
    pub relegation: f64,
}

/// Per-team expectations, sorted by expected points (descending).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonTable {
    pub simulations: u64,
    pub rows: Vec<TeamProjection>,
}

impl SeasonTable {
    pub fn get(&self, team: &str) -> Option<&TeamProjection> {
        self.rows.iter().find(|row| row.team == team)
    }
}

/// Replays a fixed fixture list many times, drawing every result from its 1X2 distribution.
#[derive(Debug, Clone)]
pub struct SeasonSimulator {
    teams: Vec<String>,
    fixtures: Vec<Fixture>,
    pairs: Vec<(usize, usize)>,
    probabilities: Vec<Prob3>,
}

impl SeasonSimulator {
    pub fn new(fixtures: Vec<Fixture>, probabilities: Vec<Prob3>) -> Result<Self> {
        Self::with_teams(std::iter::empty::<String>(), fixtures, probabilities)
    }

    /// `teams` adds clubs that may have no fixture in the list; every fixture team is included.
    pub fn with_teams<I, S>(teams: I, fixtures: Vec<Fixture>, probabilities: Vec<Prob3>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if fixtures.len() != probabilities.len() {
            return Err(PredictorError::FixtureLengthMismatch {
                fixtures: fixtures.len(),
                probabilities: probabilities.len(),
            });
        }
        for p in &probabilities {
            p.validate()?;
        }

        let mut names: BTreeSet<String> = teams.into_iter().map(Into::into).collect();
        for fixture in &fixtures {
            if fixture.home_team == fixture.away_team {
                return Err(PredictorError::invalid(
                    "fixture",
                    format!("{} cannot play itself", fixture.home_team),
                ));
            }
            names.insert(fixture.home_team.clone());
            names.insert(fixture.away_team.clone());
        }
        let teams: Vec<String> = names.into_iter().collect();
        let index: HashMap<&str, usize> = teams
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();
        let pairs = fixtures
            .iter()
            .map(|f| (index[f.home_team.as_str()], index[f.away_team.as_str()]))
            .collect();

        Ok(Self {
            teams,
            fixtures,
            pairs,
            probabilities,
        })
    }

    /// Builds fixture probabilities from predicted 18-slot lineups (raw ratings) with a single
    /// batched classifier call.
    pub fn from_lineups<C: Classifier>(
        fixtures: Vec<Fixture>,
        lineups: &HashMap<String, SideVector>,
        classifier: &C,
    ) -> Result<Self> {
        let mut batch = Vec::with_capacity(fixtures.len());
        for fixture in &fixtures {
            let home = lineup_for(lineups, &fixture.home_team)?;
            let away = lineup_for(lineups, &fixture.away_team)?;
            batch.push(FeatureVector::from_sides(&home.normalized(), &away.normalized()));
        }
        let probabilities = classifier.predict(&batch)?;
        Self::with_teams(lineups.keys().cloned(), fixtures, probabilities)
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    pub fn probabilities(&self) -> &[Prob3] {
        &self.probabilities
    }

    /// Plays one season with known results, in fixture order.
    pub fn replay(&self, outcomes: &[Outcome]) -> Result<SeasonAggregate> {
        if outcomes.len() != self.pairs.len() {
            return Err(PredictorError::FixtureLengthMismatch {
                fixtures: self.pairs.len(),
                probabilities: outcomes.len(),
            });
        }
        let mut agg = SeasonAggregate::new(self.teams.len());
        self.play_season(&mut agg, outcomes.iter().copied());
        Ok(agg)
    }

    pub fn simulate_aggregate(&self, config: SimulationConfig) -> Result<SeasonAggregate> {
        if config.simulations == 0 {
            return Err(PredictorError::InvalidConfig(
                "simulation count must be positive".to_string(),
            ));
        }
        log::info!(
            "simulating {} seasons over {} fixtures ({} teams)",
            config.simulations,
            self.pairs.len(),
            self.teams.len()
        );
        let n = self.teams.len();
        let agg = (0..config.simulations)
            .into_par_iter()
            .fold(
                || SeasonAggregate::new(n),
                |mut agg, season| {
                    let mut rng = ChaCha8Rng::seed_from_u64(season_seed(config.seed, season));
                    let outcomes: Vec<Outcome> = self
                        .probabilities
                        .iter()
                        .map(|p| p.sample(&mut rng))
                        .collect();
                    self.play_season(&mut agg, outcomes.into_iter());
                    agg
                },
            )
            .reduce(|| SeasonAggregate::new(n), SeasonAggregate::merge);
        Ok(agg)
    }

    pub fn simulate(&self, config: SimulationConfig) -> Result<SeasonTable> {
        let agg = self.simulate_aggregate(config)?;
        Ok(self.table(&agg))
    }

    /// Divides every counter by the number of seasons in the aggregate.
    pub fn table(&self, agg: &SeasonAggregate) -> SeasonTable {
        let s = agg.seasons.max(1) as f64;
        let mut rows: Vec<TeamProjection> = self
            .teams
            .iter()
            .zip(&agg.tallies)
            .map(|(team, t)| TeamProjection {
                team: team.clone(),
                points: t.points as f64 / s,
                wins: t.wins as f64 / s,
                draws: t.draws as f64 / s,
                losses: t.losses as f64 / s,
                title: t.titles as f64 / s,
                top_four: t.top_places as f64 / s,
                relegation: t.relegations as f64 / s,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.points
                .partial_cmp(&a.points)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.team.cmp(&b.team))
        });
        SeasonTable {
            simulations: agg.seasons,
            rows,
        }
    }

    fn play_season(&self, agg: &mut SeasonAggregate, outcomes: impl Iterator<Item = Outcome>) {
        let n = self.teams.len();
        let mut points = vec![0u64; n];
        let mut wins = vec![0u64; n];

        for (&(home, away), outcome) in self.pairs.iter().zip(outcomes) {
            let (home_pts, away_pts) = outcome.points();
            points[home] += u64::from(home_pts);
            points[away] += u64::from(away_pts);
            match outcome {
                Outcome::Home => {
                    wins[home] += 1;
                    agg.tallies[home].wins += 1;
                    agg.tallies[away].losses += 1;
                }
                Outcome::Draw => {
                    agg.tallies[home].draws += 1;
                    agg.tallies[away].draws += 1;
                }
                Outcome::Away => {
                    wins[away] += 1;
                    agg.tallies[away].wins += 1;
                    agg.tallies[home].losses += 1;
                }
            }
        }

        let standings = self.rank(&points, &wins);
        if let Some(&champion) = standings.first() {
            agg.tallies[champion].titles += 1;
        }
        for &team in standings.iter().take(TOP_PLACES) {
            agg.tallies[team].top_places += 1;
        }
        for &team in standings.iter().rev().take(RELEGATION_PLACES.min(n)) {
            agg.tallies[team].relegations += 1;
        }
        for (tally, pts) in agg.tallies.iter_mut().zip(points) {
            tally.points += pts;
        }
        agg.seasons += 1;
    }

    /// Points, then wins, then team slug.
    fn rank(&self, points: &[u64], wins: &[u64]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.teams.len()).collect();
        order.sort_by(|&a, &b| {
            points[b]
                .cmp(&points[a])
                .then_with(|| wins[b].cmp(&wins[a]))
                .then_with(|| self.teams[a].cmp(&self.teams[b]))
        });
        order
    }
}

fn lineup_for<'a>(lineups: &'a HashMap<String, SideVector>, team: &str) -> Result<&'a SideVector> {
    lineups
        .get(team)
        .ok_or_else(|| PredictorError::invalid("predicted lineups", format!("no lineup for {team}")))
}

fn season_seed(seed: u64, season: usize) -> u64 {
    seed ^ (season as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
