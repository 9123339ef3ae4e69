use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::outcome_model::expected_score;
use crate::sampler::{DRAW_POINTS, WIN_POINTS};
use crate::team::TeamRecord;

pub const DEFAULT_K: f64 = 16.0;
pub const DEFAULT_HOME_FIELD: f64 = 50.0;
pub const INITIAL_RATING: f64 = 1500.0;
pub const INITIAL_TILT: f64 = 1.0;

const RATING_SCALE: f64 = 400.0;
const EXPECTED_GOALS: f64 = 2.5;
const TILT_DECAY: f64 = 0.98;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerConfig {
    pub k: f64,
    pub home_field: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            home_field: DEFAULT_HOME_FIELD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub name: String,
    pub rating: f64,
    pub tilt: f64,
    pub points: i32,
}

impl LedgerEntry {
    fn fresh(name: &str) -> Self {
        Self {
            name: name.to_string(),
            rating: INITIAL_RATING,
            tilt: INITIAL_TILT,
            points: 0,
        }
    }
}

/// Margin multiplier on the rating change.
pub fn g_factor(margin: u32) -> f64 {
    match margin {
        0 | 1 => 1.0,
        2 => 1.5,
        m => (11.0 + f64::from(m)) / 8.0,
    }
}

/// Incremental Elo ratings, goal tilt and points, fed one finished match at a time.
/// Owned by the caller; simulations only ever see a `snapshot()`.
#[derive(Debug, Clone, Default)]
pub struct RatingLedger {
    cfg: LedgerConfig,
    entries: Vec<LedgerEntry>,
    index: HashMap<String, usize>,
}

impl RatingLedger {
    pub fn new(cfg: LedgerConfig) -> Self {
        Self {
            cfg,
            ..Self::default()
        }
    }

    pub fn config(&self) -> LedgerConfig {
        self.cfg
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Sets a team's rating and points, creating it if needed. Tilt is left alone.
    pub fn seed(&mut self, name: &str, rating: f64, points: i32) {
        let slot = self.slot(name);
        let entry = &mut self.entries[slot];
        entry.rating = rating;
        entry.points = points;
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Applies one result. Teams seen for the first time start from the initial values.
    pub fn record_result(&mut self, home: &str, away: &str, home_goals: u32, away_goals: u32) {
        let h = self.slot(home);
        let a = self.slot(away);

        let dr = self.entries[h].rating + self.cfg.home_field - self.entries[a].rating;
        let expected_home = expected_score(dr, 0.0, RATING_SCALE);
        let (result_home, (pts_home, pts_away)) = match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => (1.0, (WIN_POINTS, 0)),
            std::cmp::Ordering::Equal => (0.5, (DRAW_POINTS, DRAW_POINTS)),
            std::cmp::Ordering::Less => (0.0, (0, WIN_POINTS)),
        };
        let change =
            self.cfg.k * g_factor(home_goals.abs_diff(away_goals)) * (result_home - expected_home);

        let goals = f64::from(home_goals + away_goals);
        let tilt_away = self.entries[a].tilt;
        let tilt_home =
            TILT_DECAY * self.entries[h].tilt + (1.0 - TILT_DECAY) * goals / tilt_away / EXPECTED_GOALS;
        // Away tilt is computed against the already-updated home tilt.
        let tilt_away =
            TILT_DECAY * tilt_away + (1.0 - TILT_DECAY) * goals / tilt_home / EXPECTED_GOALS;

        let home_entry = &mut self.entries[h];
        home_entry.rating += change;
        home_entry.points += pts_home;
        home_entry.tilt = tilt_home;
        let away_entry = &mut self.entries[a];
        away_entry.rating -= change;
        away_entry.points += pts_away;
        away_entry.tilt = tilt_away;
    }

    /// Points descending, then rating descending.
    pub fn table(&self) -> Vec<LedgerEntry> {
        let mut rows = self.entries.clone();
        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| b.rating.total_cmp(&a.rating))
        });
        rows
    }

    /// Current ratings and points as simulation input, in table order.
    pub fn snapshot(&self) -> Vec<TeamRecord> {
        self.table()
            .into_iter()
            .map(|e| TeamRecord::new(e.name, e.rating, e.points))
            .collect()
    }

    fn slot(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.entries.len();
        self.entries.push(LedgerEntry::fresh(name));
        self.index.insert(name.to_string(), i);
        i
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRecord {
    pub name: String,
    pub rating: f64,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub home: String,
    pub away: String,
    pub home_goals: u32,
    pub away_goals: u32,
}

/// On-disk ledger input: starting values plus results in the order they were played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerFile {
    #[serde(default)]
    pub k: Option<f64>,
    #[serde(default)]
    pub home_field: Option<f64>,
    #[serde(default)]
    pub teams: Vec<SeedRecord>,
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

impl LedgerFile {
    pub fn replay(&self) -> RatingLedger {
        let defaults = LedgerConfig::default();
        let mut ledger = RatingLedger::new(LedgerConfig {
            k: self.k.unwrap_or(defaults.k),
            home_field: self.home_field.unwrap_or(defaults.home_field),
        });
        for t in &self.teams {
            ledger.seed(&t.name, t.rating, t.points);
        }
        for r in &self.results {
            ledger.record_result(&r.home, &r.away, r.home_goals, r.away_goals);
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::{LedgerConfig, LedgerFile, RatingLedger, g_factor};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn g_factor_steps() {
        assert_eq!(g_factor(0), 1.0);
        assert_eq!(g_factor(1), 1.0);
        assert_eq!(g_factor(2), 1.5);
        assert_eq!(g_factor(3), 1.75);
        assert_eq!(g_factor(5), 2.0);
    }

    #[test]
    fn home_win_between_new_teams() {
        let mut ledger = RatingLedger::new(LedgerConfig::default());
        ledger.record_result("Liverpool", "Chelsea", 1, 0);

        let home = ledger.get("Liverpool").unwrap();
        let away = ledger.get("Chelsea").unwrap();
        // expected home = 1 / (10^(-50/400) + 1) = 0.57146
        assert!(close(home.rating, 1506.857), "{}", home.rating);
        assert!(close(away.rating, 1493.143), "{}", away.rating);
        assert_eq!((home.points, away.points), (3, 0));
        assert!(close(home.tilt, 0.988));
        assert!(close(away.tilt, 0.98 + 0.02 / 0.988 / 2.5));
    }

    #[test]
    fn rating_is_zero_sum_and_draws_split_points() {
        let mut ledger = RatingLedger::new(LedgerConfig::default());
        ledger.seed("Arsenal", 1850.0, 12);
        ledger.seed("Spurs", 1700.0, 9);
        ledger.record_result("Arsenal", "Spurs", 2, 2);
        ledger.record_result("Spurs", "Arsenal", 4, 0);

        let a = ledger.get("Arsenal").unwrap();
        let s = ledger.get("Spurs").unwrap();
        assert!(close(a.rating + s.rating, 3550.0));
        assert!(a.rating < 1850.0);
        assert_eq!((a.points, s.points), (13, 13));
    }

    #[test]
    fn table_orders_by_points_then_rating() {
        let mut ledger = RatingLedger::new(LedgerConfig::default());
        ledger.seed("Low", 1400.0, 20);
        ledger.seed("High", 1800.0, 20);
        ledger.seed("Top", 1500.0, 25);
        let names: Vec<_> = ledger.table().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["Top", "High", "Low"]);

        let snapshot = ledger.snapshot();
        assert_eq!(snapshot[1].rating, 1800.0);
        assert_eq!(snapshot[1].points, 20);

        ledger.reset();
        assert!(ledger.is_empty());
    }

    #[test]
    fn ledger_file_replays_in_order() {
        let raw = r#"{
            "k": 20,
            "teams": [{ "name": "A", "rating": 1500, "points": 0 }],
            "results": [{ "home": "A", "away": "B", "home_goals": 0, "away_goals": 3 }]
        }"#;
        let file: LedgerFile = serde_json::from_str(raw).unwrap();
        let ledger = file.replay();
        assert_eq!(ledger.config().k, 20.0);
        assert_eq!(ledger.config().home_field, 50.0);
        assert_eq!(ledger.len(), 2);
        let b = ledger.get("B").unwrap();
        assert_eq!(b.points, 3);
        assert!(b.rating > 1500.0);
    }
}
