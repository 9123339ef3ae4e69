use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use league_odds::TeamRecord;
use league_odds::config;
use league_odds::rating_ledger::{LedgerEntry, LedgerFile};

#[derive(Serialize)]
struct LedgerOutput {
    k: f64,
    home_field: f64,
    table: Vec<LedgerEntry>,
    // Ready to paste into a season file's `teams`.
    snapshot: Vec<TeamRecord>,
}

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_tracing();

    let path = std::env::args()
        .nth(1)
        .filter(|arg| !arg.trim().is_empty())
        .map(PathBuf::from)
        .context("usage: rating_ledger <ledger.json>")?;

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read ledger file {}", path.display()))?;
    let file: LedgerFile = serde_json::from_str(&raw)
        .with_context(|| format!("parse ledger file {}", path.display()))?;
    let ledger = file.replay();
    info!(teams = ledger.len(), results = file.results.len(), "ledger replayed");

    let cfg = ledger.config();
    let out = LedgerOutput {
        k: cfg.k,
        home_field: cfg.home_field,
        table: ledger.table(),
        snapshot: ledger.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
