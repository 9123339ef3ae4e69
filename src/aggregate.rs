use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::format::TitleRule;
use crate::team::{League, TeamIdx};

/// Inclusive, 1-indexed range of ranks, e.g. `3~6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankBand {
    pub first: usize,
    pub last: usize,
}

impl RankBand {
    pub fn new(first: usize, last: usize, teams: usize) -> Result<Self> {
        let band = Self { first, last };
        band.check(teams)?;
        Ok(band)
    }

    /// Parses `a~b` or `a-b`. Bounds are checked separately against the team count.
    pub fn parse(raw: &str) -> Result<Self> {
        let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let malformed = || SimError::config("rank_band", format!("`{raw}` is not of the form a~b"));
        let (a, b) = cleaned
            .split_once('~')
            .or_else(|| cleaned.split_once('-'))
            .ok_or_else(malformed)?;
        let first = a.parse::<usize>().map_err(|_| malformed())?;
        let last = b.parse::<usize>().map_err(|_| malformed())?;
        Ok(Self { first, last })
    }

    pub fn check(&self, teams: usize) -> Result<()> {
        if self.first == 0 || self.first > self.last || self.last > teams {
            return Err(SimError::config(
                "rank_band",
                format!(
                    "{}~{} must satisfy 1 <= first <= last <= {teams}",
                    self.first, self.last
                ),
            ));
        }
        Ok(())
    }

    fn sum(&self, rank_probs: &[f64]) -> f64 {
        rank_probs[self.first - 1..self.last].iter().sum()
    }
}

/// What one trial contributes to the tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialOutcome {
    /// Final rank order.
    pub order: Vec<TeamIdx>,
    pub points: Vec<i32>,
    pub goal_diff: Vec<i32>,
    /// Number of leading ranks that make up the band the title is decided in.
    pub top_band: usize,
    /// Standings at the split, after carry-over, for staged formats.
    pub entry_order: Option<Vec<TeamIdx>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunningHistogram {
    pub rank_counts: Vec<u64>,
    pub entry_rank_counts: Vec<u64>,
    pub titles: u64,
    pub rank_sum: u64,
    pub points_sum: i64,
    pub goal_diff_sum: i64,
}

impl RunningHistogram {
    fn new(teams: usize, staged: bool) -> Self {
        Self {
            rank_counts: vec![0; teams],
            entry_rank_counts: if staged { vec![0; teams] } else { Vec::new() },
            ..Self::default()
        }
    }

    fn merge(&mut self, other: &RunningHistogram) {
        add_counts(&mut self.rank_counts, &other.rank_counts);
        add_counts(&mut self.entry_rank_counts, &other.entry_rank_counts);
        self.titles += other.titles;
        self.rank_sum += other.rank_sum;
        self.points_sum += other.points_sum;
        self.goal_diff_sum += other.goal_diff_sum;
    }
}

fn add_counts(into: &mut [u64], from: &[u64]) {
    for (a, b) in into.iter_mut().zip(from) {
        *a += b;
    }
}

/// Per-team histograms over any number of trials. Merging is associative and commutative,
/// so partial tallies from different workers combine in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    trials: u64,
    title_rule: TitleRule,
    teams: Vec<RunningHistogram>,
}

impl Tally {
    pub fn new(teams: usize, staged: bool, title_rule: TitleRule) -> Self {
        Self {
            trials: 0,
            title_rule,
            teams: (0..teams).map(|_| RunningHistogram::new(teams, staged)).collect(),
        }
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn team(&self, idx: TeamIdx) -> &RunningHistogram {
        &self.teams[idx]
    }

    pub fn record(&mut self, outcome: &TrialOutcome) {
        for (rank0, &team) in outcome.order.iter().enumerate() {
            let h = &mut self.teams[team];
            h.rank_counts[rank0] += 1;
            h.rank_sum += rank0 as u64 + 1;
            h.points_sum += i64::from(outcome.points[team]);
            h.goal_diff_sum += i64::from(outcome.goal_diff[team]);
        }

        if let Some(entry) = &outcome.entry_order {
            for (rank0, &team) in entry.iter().enumerate() {
                if let Some(slot) = self.teams[team].entry_rank_counts.get_mut(rank0) {
                    *slot += 1;
                }
            }
        }

        match self.title_rule {
            TitleRule::RankOne => {
                if let Some(&leader) = outcome.order.first() {
                    self.teams[leader].titles += 1;
                }
            }
            TitleRule::SharedTopPoints => {
                let contenders = &outcome.order[..outcome.top_band.min(outcome.order.len())];
                if let Some(max) = contenders.iter().map(|&t| outcome.points[t]).max() {
                    for &t in contenders {
                        if outcome.points[t] == max {
                            self.teams[t].titles += 1;
                        }
                    }
                }
            }
        }

        self.trials += 1;
    }

    pub fn merge(mut self, other: Tally) -> Tally {
        self.trials += other.trials;
        for (a, b) in self.teams.iter_mut().zip(&other.teams) {
            a.merge(b);
        }
        self
    }

    /// Per-team summaries in percent. `band_sizes` are the stage bands (in rank order) for
    /// staged formats.
    pub fn summarize(
        &self,
        league: &League,
        rank_band: Option<RankBand>,
        track_goals: bool,
        band_sizes: Option<&[usize]>,
    ) -> Vec<SimulationSummary> {
        let n = self.trials.max(1) as f64;
        let pct = |count: u64| count as f64 / n * 100.0;

        self.teams
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let rank_probabilities: Vec<f64> = h.rank_counts.iter().map(|&c| pct(c)).collect();
                let (stage_entry_probabilities, stage_band_probabilities) = match band_sizes {
                    Some(sizes) => {
                        let entry: Vec<f64> =
                            h.entry_rank_counts.iter().map(|&c| pct(c)).collect();
                        let mut start = 0;
                        let bands = sizes
                            .iter()
                            .map(|&size| {
                                let end = (start + size).min(entry.len());
                                let p: f64 = entry[start..end].iter().sum();
                                start = end;
                                p
                            })
                            .collect();
                        (Some(entry), Some(bands))
                    }
                    None => (None, None),
                };
                SimulationSummary {
                    team: league.name(idx).to_string(),
                    win_probability: pct(h.titles),
                    mean_rank: h.rank_sum as f64 / n,
                    mean_points: h.points_sum as f64 / n,
                    mean_goal_difference: track_goals.then(|| h.goal_diff_sum as f64 / n),
                    band_probability: rank_band.map(|band| band.sum(&rank_probabilities)),
                    rank_probabilities,
                    stage_entry_probabilities,
                    stage_band_probabilities,
                }
            })
            .collect()
    }
}

/// Read-only per-team result. Probabilities are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub team: String,
    pub win_probability: f64,
    pub mean_rank: f64,
    pub mean_points: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_goal_difference: Option<f64>,
    pub rank_probabilities: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_entry_probabilities: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_band_probabilities: Option<Vec<f64>>,
}

#[cfg(test)]
mod tests {
    use super::{RankBand, Tally, TrialOutcome};
    use crate::format::TitleRule;
    use crate::team::{League, TeamRecord};

    fn league() -> League {
        League::new(
            &[
                TeamRecord::new("Rapid", 1600.0, 0),
                TeamRecord::new("Dinamo", 1600.0, 0),
                TeamRecord::new("Petrolul", 1600.0, 0),
            ],
            60.0,
        )
        .unwrap()
    }

    fn outcome(order: [usize; 3], points: [i32; 3]) -> TrialOutcome {
        TrialOutcome {
            order: order.to_vec(),
            points: points.to_vec(),
            goal_diff: vec![0; 3],
            top_band: 3,
            entry_order: None,
        }
    }

    #[test]
    fn rank_band_parsing() {
        assert_eq!(RankBand::parse("3~6").unwrap(), RankBand { first: 3, last: 6 });
        assert_eq!(RankBand::parse(" 15 - 16 ").unwrap(), RankBand { first: 15, last: 16 });
        assert!(RankBand::parse("3to6").is_err());
        assert!(RankBand::parse("~6").is_err());
        assert!(RankBand::new(0, 2, 4).is_err());
        assert!(RankBand::new(3, 2, 4).is_err());
        assert!(RankBand::new(2, 5, 4).is_err());
        assert!(RankBand::new(4, 4, 4).is_ok());
    }

    #[test]
    fn title_rules_diverge_on_shared_top_points() {
        let trials = [outcome([0, 1, 2], [7, 7, 3]), outcome([1, 2, 0], [1, 9, 4])];

        let mut shared = Tally::new(3, false, TitleRule::SharedTopPoints);
        let mut strict = Tally::new(3, false, TitleRule::RankOne);
        for t in &trials {
            shared.record(t);
            strict.record(t);
        }
        assert_eq!(shared.team(0).titles, 1);
        assert_eq!(shared.team(1).titles, 2);
        assert_eq!(strict.team(0).titles, 1);
        assert_eq!(strict.team(1).titles, 1);
    }

    #[test]
    fn shared_title_is_limited_to_the_top_band() {
        // Team 2 played in the bottom band and out-scored the whole top band.
        let split = TrialOutcome {
            order: vec![0, 1, 2],
            points: vec![7, 7, 9],
            goal_diff: vec![0; 3],
            top_band: 2,
            entry_order: Some(vec![0, 1, 2]),
        };
        let mut shared = Tally::new(3, true, TitleRule::SharedTopPoints);
        shared.record(&split);
        assert_eq!(shared.team(0).titles, 1);
        assert_eq!(shared.team(1).titles, 1);
        assert_eq!(shared.team(2).titles, 0);

        let mut strict = Tally::new(3, true, TitleRule::RankOne);
        strict.record(&split);
        assert_eq!(strict.team(0).titles, 1);
        assert_eq!(strict.team(2).titles, 0);
    }

    #[test]
    fn merge_matches_sequential_recording() {
        let trials = [
            outcome([0, 1, 2], [7, 5, 3]),
            outcome([2, 0, 1], [6, 1, 8]),
            outcome([1, 2, 0], [1, 9, 4]),
        ];
        let mut all = Tally::new(3, false, TitleRule::RankOne);
        for t in &trials {
            all.record(t);
        }
        let mut left = Tally::new(3, false, TitleRule::RankOne);
        left.record(&trials[0]);
        let mut right = Tally::new(3, false, TitleRule::RankOne);
        right.record(&trials[1]);
        right.record(&trials[2]);
        assert_eq!(right.clone().merge(left.clone()), all);
        assert_eq!(left.merge(right), all);
    }

    #[test]
    fn summaries_conserve_probability_mass() {
        let league = league();
        let mut tally = Tally::new(3, false, TitleRule::SharedTopPoints);
        tally.record(&outcome([0, 1, 2], [7, 5, 3]));
        tally.record(&outcome([2, 0, 1], [6, 1, 8]));
        tally.record(&outcome([1, 2, 0], [1, 9, 4]));
        tally.record(&outcome([0, 2, 1], [6, 6, 6]));
        let band = RankBand::new(1, 2, 3).ok();
        let summary = tally.summarize(&league, band, false, None);

        for s in &summary {
            let total: f64 = s.rank_probabilities.iter().sum();
            assert!((total - 100.0).abs() < 1e-9);
            assert!(s.mean_goal_difference.is_none());
        }
        for rank in 0..3 {
            let total: f64 = summary.iter().map(|s| s.rank_probabilities[rank]).sum();
            assert!((total - 100.0).abs() < 1e-9);
        }
        assert_eq!(summary[0].rank_probabilities, vec![50.0, 25.0, 25.0]);
        assert_eq!(summary[0].band_probability, Some(75.0));
        assert_eq!(summary[0].mean_rank, 1.75);
        // Three-way tie in the last trial: everyone shares the title.
        assert_eq!(summary[0].win_probability, 50.0);
        assert_eq!(summary[1].win_probability, 50.0);
    }
}
