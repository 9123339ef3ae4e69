pub mod aggregate;
pub mod config;
pub mod error;
pub mod format;
pub mod input;
pub mod outcome_model;
pub mod rating_ledger;
pub mod sampler;
pub mod simulate;
pub mod stages;
pub mod team;
pub mod tiebreak;
pub mod trial;

pub use error::{ErrorKind, SimError};
pub use format::{FormatPreset, LeagueFormat};
pub use simulate::{RunOptions, Simulation, SimulationReport};
pub use team::{Fixture, League, Team, TeamIdx, TeamRecord};
