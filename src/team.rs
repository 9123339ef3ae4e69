use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

pub const DEFAULT_HOME_ADVANTAGE: f64 = 60.0;

pub type TeamIdx = usize;

/// One team as supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    pub rating: f64,
    pub points: i32,
    #[serde(default)]
    pub goal_difference: i32,
    // Per-team override of the run's shared home advantage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_advantage: Option<f64>,
}

impl TeamRecord {
    pub fn new(name: impl Into<String>, rating: f64, points: i32) -> Self {
        Self {
            name: name.into(),
            rating,
            points,
            goal_difference: 0,
            home_advantage: None,
        }
    }

    pub fn with_goal_difference(mut self, goal_difference: i32) -> Self {
        self.goal_difference = goal_difference;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub name: String,
    pub rating: f64,
    pub home_bonus: f64,
    pub points: i32,
    pub goal_difference: i32,
}

impl Team {
    pub fn effective_rating(&self, at_home: bool) -> f64 {
        if at_home {
            self.rating + self.home_bonus
        } else {
            self.rating
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fixture {
    pub home: TeamIdx,
    pub away: TeamIdx,
}

impl Fixture {
    pub fn new(home: TeamIdx, away: TeamIdx) -> Self {
        Self { home, away }
    }
}

/// Validated, immutable team set. Team order is the declaration order and doubles as the
/// insertion order tie-breaks fall back on.
#[derive(Debug, Clone)]
pub struct League {
    teams: Vec<Team>,
    by_name: HashMap<String, TeamIdx>,
}

impl League {
    pub fn new(records: &[TeamRecord], default_home_advantage: f64) -> Result<Self> {
        if records.is_empty() {
            return Err(SimError::EmptyLeague);
        }
        if !default_home_advantage.is_finite() {
            return Err(SimError::config(
                "home_advantage",
                format!("{default_home_advantage} is not a finite number"),
            ));
        }

        let mut teams = Vec::with_capacity(records.len());
        let mut by_name = HashMap::with_capacity(records.len());
        for record in records {
            let name = record.name.trim();
            if name.is_empty() {
                return Err(SimError::InvalidTeam {
                    team: record.name.clone(),
                    reason: "name is empty".to_string(),
                });
            }
            if !record.rating.is_finite() {
                return Err(SimError::InvalidTeam {
                    team: name.to_string(),
                    reason: format!("rating {} is not a finite number", record.rating),
                });
            }
            let home_bonus = record.home_advantage.unwrap_or(default_home_advantage);
            if !home_bonus.is_finite() {
                return Err(SimError::InvalidTeam {
                    team: name.to_string(),
                    reason: format!("home advantage {home_bonus} is not a finite number"),
                });
            }
            if by_name.insert(name.to_string(), teams.len()).is_some() {
                return Err(SimError::DuplicateTeam {
                    team: name.to_string(),
                });
            }
            teams.push(Team {
                name: name.to_string(),
                rating: record.rating,
                home_bonus,
                points: record.points,
                goal_difference: record.goal_difference,
            });
        }

        Ok(Self { teams, by_name })
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, idx: TeamIdx) -> &Team {
        &self.teams[idx]
    }

    pub fn index_of(&self, name: &str) -> Option<TeamIdx> {
        self.by_name.get(name.trim()).copied()
    }

    pub fn name(&self, idx: TeamIdx) -> &str {
        &self.teams[idx].name
    }

    /// Resolves `(home, away)` name pairs into fixtures, failing on the first unknown or
    /// self-paired team.
    pub fn fixtures<S: AsRef<str>>(&self, pairs: &[(S, S)]) -> Result<Vec<Fixture>> {
        pairs
            .iter()
            .enumerate()
            .map(|(index, (home, away))| {
                let home = self.lookup(index, home.as_ref())?;
                let away = self.lookup(index, away.as_ref())?;
                if home == away {
                    return Err(SimError::SelfFixture {
                        index,
                        team: self.name(home).to_string(),
                    });
                }
                Ok(Fixture::new(home, away))
            })
            .collect()
    }

    /// Checks fixtures built by hand against this league.
    pub fn check_fixtures(&self, fixtures: &[Fixture]) -> Result<()> {
        for (index, f) in fixtures.iter().enumerate() {
            for team_idx in [f.home, f.away] {
                if team_idx >= self.len() {
                    return Err(SimError::FixtureOutOfRange {
                        index,
                        team_idx,
                        teams: self.len(),
                    });
                }
            }
            if f.home == f.away {
                return Err(SimError::SelfFixture {
                    index,
                    team: self.name(f.home).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Every unordered pair once, hosted by the earlier-declared team.
    pub fn single_round_robin(&self) -> Vec<Fixture> {
        let n = self.len();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                out.push(Fixture::new(i, j));
            }
        }
        out
    }

    fn lookup(&self, index: usize, name: &str) -> Result<TeamIdx> {
        self.index_of(name).ok_or_else(|| SimError::UnknownTeam {
            index,
            team: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_HOME_ADVANTAGE, Fixture, League, TeamRecord};
    use crate::error::SimError;

    fn records() -> Vec<TeamRecord> {
        vec![
            TeamRecord::new("Ulsan", 1720.0, 61),
            TeamRecord::new("Jeonbuk", 1690.0, 58),
            TeamRecord::new("Pohang", 1610.0, 50),
        ]
    }

    #[test]
    fn home_bonus_defaults_to_shared_value() {
        let mut recs = records();
        recs[2].home_advantage = Some(25.0);
        let league = League::new(&recs, DEFAULT_HOME_ADVANTAGE).expect("valid league");
        assert_eq!(league.team(0).home_bonus, 60.0);
        assert_eq!(league.team(2).home_bonus, 25.0);
        assert_eq!(league.team(0).effective_rating(true), 1780.0);
        assert_eq!(league.team(0).effective_rating(false), 1720.0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut recs = records();
        recs.push(TeamRecord::new(" Ulsan ", 1500.0, 0));
        let err = League::new(&recs, 60.0).unwrap_err();
        assert_eq!(
            err,
            SimError::DuplicateTeam {
                team: "Ulsan".to_string()
            }
        );
    }

    #[test]
    fn non_finite_rating_is_rejected() {
        let mut recs = records();
        recs[1].rating = f64::NAN;
        let err = League::new(&recs, 60.0).unwrap_err();
        assert!(matches!(err, SimError::InvalidTeam { ref team, .. } if team == "Jeonbuk"));
    }

    #[test]
    fn fixtures_resolve_names_and_reject_unknowns() {
        let league = League::new(&records(), 60.0).unwrap();
        let fixtures = league
            .fixtures(&[("Ulsan", "Pohang"), ("Pohang", "Jeonbuk")])
            .unwrap();
        assert_eq!(fixtures, vec![Fixture::new(0, 2), Fixture::new(2, 1)]);

        let err = league
            .fixtures(&[("Ulsan", "Pohang"), ("Suwon", "Ulsan")])
            .unwrap_err();
        assert_eq!(
            err,
            SimError::UnknownTeam {
                index: 1,
                team: "Suwon".to_string()
            }
        );

        let err = league.fixtures(&[("Ulsan", "Ulsan")]).unwrap_err();
        assert!(matches!(err, SimError::SelfFixture { index: 0, .. }));
    }

    #[test]
    fn hand_built_fixtures_are_range_checked() {
        let league = League::new(&records(), 60.0).unwrap();
        assert!(league.check_fixtures(&[Fixture::new(0, 1)]).is_ok());
        let err = league.check_fixtures(&[Fixture::new(0, 7)]).unwrap_err();
        assert!(matches!(err, SimError::FixtureOutOfRange { team_idx: 7, .. }));
    }

    #[test]
    fn single_round_robin_covers_every_pair_once() {
        let league = League::new(&records(), 60.0).unwrap();
        let rr = league.single_round_robin();
        assert_eq!(
            rr,
            vec![Fixture::new(0, 1), Fixture::new(0, 2), Fixture::new(1, 2)]
        );
    }
}
