use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregate::RankBand;
use crate::error::{Result, SimError};
use crate::simulate::RunOptions;
use crate::team::DEFAULT_HOME_ADVANTAGE;

pub const DEFAULT_TRIALS: u64 = 10_000;

pub const ENV_TRIALS: &str = "LEAGUE_SIM_TRIALS";
pub const ENV_SEED: &str = "LEAGUE_SIM_SEED";
pub const ENV_THREADS: &str = "LEAGUE_SIM_THREADS";
pub const ENV_HOME_ADVANTAGE: &str = "LEAGUE_SIM_HOME_ADVANTAGE";
pub const ENV_RANK_BAND: &str = "LEAGUE_SIM_RANK_BAND";

/// Loads `.env.local` then `.env`; variables already set win. Missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

/// stderr logging filtered by `RUST_LOG`, `info` when unset. stdout is left for reports.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Run-level knobs. Season files provide them; environment variables override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub trials: u64,
    pub seed: Option<u64>,
    pub threads: Option<usize>,
    pub home_advantage: f64,
    pub rank_band: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            threads: None,
            home_advantage: DEFAULT_HOME_ADVANTAGE,
            rank_band: None,
        }
    }
}

impl RunSettings {
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup` (normally the process environment). Blank values
    /// are ignored; values that do not parse are configuration errors.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(raw) = get(ENV_TRIALS) {
            self.trials = parse_override(ENV_TRIALS, &raw)?;
        }
        if let Some(raw) = get(ENV_SEED) {
            self.seed = Some(parse_override(ENV_SEED, &raw)?);
        }
        if let Some(raw) = get(ENV_THREADS) {
            self.threads = Some(parse_override(ENV_THREADS, &raw)?);
        }
        if let Some(raw) = get(ENV_HOME_ADVANTAGE) {
            self.home_advantage = parse_override(ENV_HOME_ADVANTAGE, &raw)?;
        }
        if let Some(raw) = get(ENV_RANK_BAND) {
            self.rank_band = Some(raw);
        }
        Ok(self)
    }

    /// Checks the settings against a league of `teams` teams.
    pub fn run_options(&self, teams: usize) -> Result<RunOptions> {
        if self.trials == 0 {
            return Err(SimError::config("trials", "must be at least 1"));
        }
        if self.threads == Some(0) {
            return Err(SimError::config("threads", "must be at least 1"));
        }
        let rank_band = match self.rank_band.as_deref() {
            Some(raw) => {
                let band = RankBand::parse(raw)?;
                band.check(teams)?;
                Some(band)
            }
            None => None,
        };
        Ok(RunOptions {
            trials: self.trials,
            seed: self.seed,
            threads: self.threads,
            rank_band,
        })
    }
}

fn parse_override<T: FromStr>(key: &'static str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| SimError::config(key, format!("`{raw}` could not be parsed")))
}
