use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::RunSettings;
use crate::format::{FormatPreset, LeagueFormat};
use crate::simulate::RunOptions;
use crate::team::{Fixture, League, TeamRecord};

/// Either a preset name (`"split"`) or a full format object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatChoice {
    Preset(FormatPreset),
    Custom(LeagueFormat),
}

impl Default for FormatChoice {
    fn default() -> Self {
        FormatChoice::Preset(FormatPreset::Regular)
    }
}

impl FormatChoice {
    pub fn resolve(&self) -> LeagueFormat {
        match self {
            FormatChoice::Preset(preset) => preset.format(),
            FormatChoice::Custom(format) => format.clone(),
        }
    }
}

/// `["Home", "Away"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRecord(pub String, pub String);

/// A season as stored on disk: teams, remaining fixtures and run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonFile {
    #[serde(default)]
    pub format: FormatChoice,
    #[serde(default)]
    pub home_advantage: Option<f64>,
    #[serde(default)]
    pub trials: Option<u64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub rank_band: Option<String>,
    pub teams: Vec<TeamRecord>,
    #[serde(default)]
    pub fixtures: Vec<FixtureRecord>,
}

/// Everything a `Simulation` needs, validated.
#[derive(Debug, Clone)]
pub struct PreparedSeason {
    pub league: League,
    pub fixtures: Vec<Fixture>,
    pub format: LeagueFormat,
    pub options: RunOptions,
}

impl SeasonFile {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid season json")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read season file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parse season file {}", path.display()))
    }

    /// Settings as written in the file, before environment overrides.
    pub fn settings(&self) -> RunSettings {
        let defaults = RunSettings::default();
        RunSettings {
            trials: self.trials.unwrap_or(defaults.trials),
            seed: self.seed,
            threads: self.threads,
            home_advantage: self.home_advantage.unwrap_or(defaults.home_advantage),
            rank_band: self.rank_band.clone(),
        }
    }

    /// Validates teams, fixtures, format and settings. Nothing is simulated if any of
    /// them is wrong.
    pub fn prepare(&self, settings: &RunSettings) -> crate::error::Result<PreparedSeason> {
        let league = League::new(&self.teams, settings.home_advantage)?;
        let pairs: Vec<(&str, &str)> = self
            .fixtures
            .iter()
            .map(|f| (f.0.as_str(), f.1.as_str()))
            .collect();
        let fixtures = league.fixtures(&pairs)?;
        let format = self.format.resolve();
        format.validate(league.len())?;
        let options = settings.run_options(league.len())?;
        Ok(PreparedSeason {
            league,
            fixtures,
            format,
            options,
        })
    }
}
