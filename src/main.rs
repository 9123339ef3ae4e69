use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use league_odds::Simulation;
use league_odds::config;
use league_odds::input::SeasonFile;

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_tracing();

    let path = std::env::args()
        .nth(1)
        .filter(|arg| !arg.trim().is_empty())
        .map(PathBuf::from)
        .context("usage: league_odds <season.json>")?;

    let season = SeasonFile::load(&path)?;
    let settings = season
        .settings()
        .with_env()
        .context("invalid LEAGUE_SIM_* override")?;
    let prepared = season
        .prepare(&settings)
        .with_context(|| format!("invalid season {}", path.display()))?;
    info!(
        teams = prepared.league.len(),
        fixtures = prepared.fixtures.len(),
        format = %prepared.format.name,
        "season loaded"
    );

    let sim = Simulation::new(&prepared.league, prepared.fixtures, prepared.format)?;
    let report = sim.run(&prepared.options)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
