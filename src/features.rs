use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};
use crate::matching::ResolvedLineup;
use crate::records::{PlayerRecord, Position};

pub const GOALKEEPER_SLOTS: usize = 1;
pub const DEFENCE_SLOTS: usize = 6;
pub const MIDFIELD_SLOTS: usize = 7;
pub const ATTACK_SLOTS: usize = 4;
pub const SIDE_LEN: usize = GOALKEEPER_SLOTS + DEFENCE_SLOTS + MIDFIELD_SLOTS + ATTACK_SLOTS;
pub const FEATURE_LEN: usize = 2 * SIDE_LEN;

const RATING_FLOOR: f64 = 50.0;
const RATING_SPAN: f64 = 50.0;

/// Ratings of one side grouped by coarse position, as typed in by hand or predicted for a future
/// fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRatings {
    pub goalkeeper: Vec<f64>,
    #[serde(default)]
    pub defenders: Vec<f64>,
    #[serde(default)]
    pub midfielders: Vec<f64>,
    #[serde(default)]
    pub forwards: Vec<f64>,
}

impl PositionRatings {
    pub fn from_players(players: &[PlayerRecord]) -> Self {
        let mut out = Self::default();
        for player in players {
            let rating = f64::from(player.rating);
            match player.position {
                Position::Goalkeeper => out.goalkeeper.push(rating),
                Position::Defence => out.defenders.push(rating),
                Position::Midfield => out.midfielders.push(rating),
                Position::Attack => out.forwards.push(rating),
            }
        }
        out
    }
}

/// One side's 18 slots: goalkeeper, defence, midfield, attack, each zero-padded on the right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideVector(pub [f64; SIDE_LEN]);

impl SideVector {
    pub fn from_ratings(ratings: &PositionRatings) -> Result<Self> {
        if ratings.goalkeeper.len() != GOALKEEPER_SLOTS {
            return Err(PredictorError::GoalkeeperCount {
                found: ratings.goalkeeper.len(),
            });
        }
        let groups: [(&'static str, &[f64], usize); 3] = [
            ("defence", ratings.defenders.as_slice(), DEFENCE_SLOTS),
            ("midfield", ratings.midfielders.as_slice(), MIDFIELD_SLOTS),
            ("attack", ratings.forwards.as_slice(), ATTACK_SLOTS),
        ];

        let mut slots = [0.0; SIDE_LEN];
        slots[0] = ratings.goalkeeper[0];
        let mut offset = GOALKEEPER_SLOTS;
        for (category, values, capacity) in groups {
            if values.len() > capacity {
                return Err(PredictorError::CategoryOverflow {
                    category,
                    capacity,
                    found: values.len(),
                });
            }
            slots[offset..offset + values.len()].copy_from_slice(values);
            offset += capacity;
        }
        Ok(Self(slots))
    }

    pub fn from_players(players: &[PlayerRecord]) -> Result<Self> {
        Self::from_ratings(&PositionRatings::from_players(players))
    }

    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let slots: [f64; SIDE_LEN] = values.try_into().map_err(|_| PredictorError::FeatureWidth {
            expected: SIDE_LEN,
            found: values.len(),
        })?;
        Ok(Self(slots))
    }

    pub fn normalized(&self) -> Self {
        Self(self.0.map(normalize_rating))
    }
}

/// Home side then away side, 36 values in total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.len() != FEATURE_LEN {
            return Err(PredictorError::FeatureWidth {
                expected: FEATURE_LEN,
                found: values.len(),
            });
        }
        Ok(Self { values })
    }

    pub fn from_sides(home: &SideVector, away: &SideVector) -> Self {
        let mut values = Vec::with_capacity(FEATURE_LEN);
        values.extend_from_slice(&home.0);
        values.extend_from_slice(&away.0);
        Self { values }
    }

    /// Raw (un-normalized) ratings of two resolved lineups.
    pub fn build(home: &ResolvedLineup, away: &ResolvedLineup) -> Result<Self> {
        let home = SideVector::from_players(home.players())?;
        let away = SideVector::from_players(away.players())?;
        Ok(Self::from_sides(&home, &away))
    }

    pub fn from_position_ratings(home: &PositionRatings, away: &PositionRatings) -> Result<Self> {
        let home = SideVector::from_ratings(home)?;
        let away = SideVector::from_ratings(away)?;
        Ok(Self::from_sides(&home, &away))
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn home(&self) -> &[f64] {
        &self.values[..SIDE_LEN]
    }

    pub fn away(&self) -> &[f64] {
        &self.values[SIDE_LEN..]
    }

    pub fn normalized(&self) -> Self {
        Self {
            values: self.values.iter().copied().map(normalize_rating).collect(),
        }
    }
}

impl TryFrom<Vec<f64>> for FeatureVector {
    type Error = PredictorError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<FeatureVector> for Vec<f64> {
    fn from(vector: FeatureVector) -> Self {
        vector.values
    }
}

/// Maps ratings 50..100 onto 0..1. Anything below 50, padding included, becomes 0.
pub fn normalize_rating(rating: f64) -> f64 {
    ((rating - RATING_FLOOR) / RATING_SPAN).max(0.0)
}
