use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Configuration,
    Cancelled,
}

/// Everything that can stop a run before (or instead of) producing a report.
///
/// Validation and configuration problems are raised before the first trial; once a
/// `Simulation` exists the trial loop itself cannot fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("league has no teams")]
    EmptyLeague,
    #[error("invalid team record `{team}`: {reason}")]
    InvalidTeam { team: String, reason: String },
    #[error("duplicate team `{team}`")]
    DuplicateTeam { team: String },
    #[error("fixture #{index} references unknown team `{team}`")]
    UnknownTeam { index: usize, team: String },
    #[error("fixture #{index} pairs `{team}` with itself")]
    SelfFixture { index: usize, team: String },
    #[error("fixture #{index} uses team index {team_idx} but the league has {teams} teams")]
    FixtureOutOfRange {
        index: usize,
        team_idx: usize,
        teams: usize,
    },
    #[error("invalid `{field}`: {reason}")]
    Configuration { field: &'static str, reason: String },
    #[error("simulation cancelled before any trial completed")]
    Cancelled,
}

impl SimError {
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SimError::Configuration {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::Configuration { .. } => ErrorKind::Configuration,
            SimError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
