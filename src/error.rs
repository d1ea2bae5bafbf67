use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictorError>;

/// Coarse failure classes. Batch callers use these to decide whether a unit of work is skipped,
/// flagged, or aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DataInconsistency,
    LowConfidence,
    Configuration,
    Precondition,
    InvalidRecord,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictorError {
    #[error("need 11 lineup entries, got {found}")]
    LineupSize { found: usize },

    #[error("raw name '{raw_name}' appears more than once in the lineup")]
    DuplicateLineupName { raw_name: String },

    #[error("need 11 distinct players, resolved {resolved} (colliding entries: {colliding:?})")]
    PlayerCollision {
        resolved: usize,
        colliding: Vec<String>,
    },

    #[error("need exactly 1 goalkeeper, found {found}")]
    GoalkeeperCount { found: usize },

    #[error("no more than {capacity} {category} players allowed, found {found}")]
    CategoryOverflow {
        category: &'static str,
        capacity: usize,
        found: usize,
    },

    #[error("each fixture needs its 1X2 probabilities: {fixtures} fixtures, {probabilities} rows")]
    FixtureLengthMismatch { fixtures: usize, probabilities: usize },

    #[error("feature vector must have {expected} values, got {found}")]
    FeatureWidth { expected: usize, found: usize },

    #[error("lowest resolution score {score:.3} is below the confidence floor {floor:.3}")]
    LowConfidence { score: f64, floor: f64 },

    #[error("unknown stake sizing method '{0}'")]
    UnknownStakeMethod(String),

    #[error("computed stake {stake:.4} is not positive")]
    NonPositiveStake { stake: f64 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("a bet is already pending")]
    BetAlreadyPending,

    #[error("no pending bet to settle")]
    NoPendingBet,

    #[error("roi is undefined before any stake has been invested")]
    NothingInvested,

    #[error("invalid {what}: {reason}")]
    InvalidRecord { what: &'static str, reason: String },
}

impl PredictorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictorError::LineupSize { .. }
            | PredictorError::DuplicateLineupName { .. }
            | PredictorError::PlayerCollision { .. }
            | PredictorError::GoalkeeperCount { .. }
            | PredictorError::CategoryOverflow { .. }
            | PredictorError::FixtureLengthMismatch { .. }
            | PredictorError::FeatureWidth { .. } => ErrorKind::DataInconsistency,
            PredictorError::LowConfidence { .. } => ErrorKind::LowConfidence,
            PredictorError::UnknownStakeMethod(_)
            | PredictorError::NonPositiveStake { .. }
            | PredictorError::InvalidConfig(_) => ErrorKind::Configuration,
            PredictorError::BetAlreadyPending
            | PredictorError::NoPendingBet
            | PredictorError::NothingInvested => ErrorKind::Precondition,
            PredictorError::InvalidRecord { .. } => ErrorKind::InvalidRecord,
        }
    }

    pub(crate) fn invalid(what: &'static str, reason: impl Into<String>) -> Self {
        PredictorError::InvalidRecord {
            what,
            reason: reason.into(),
        }
    }
}
