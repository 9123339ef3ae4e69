use rand::Rng;

use crate::outcome_model::{OutcomeModel, Prob3};
use crate::sampler::{sample_outcome, sample_score};
use crate::team::{Fixture, League, TeamIdx};

/// Pairwise points and goal-difference tallies, `n * n` row-major: row = team, col = opponent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadToHead {
    n: usize,
    points: Vec<i32>,
    goal_diff: Vec<i32>,
}

impl HeadToHead {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            points: vec![0; n * n],
            goal_diff: vec![0; n * n],
        }
    }

    pub fn points(&self, team: TeamIdx, opponent: TeamIdx) -> i32 {
        self.points[team * self.n + opponent]
    }

    pub fn goal_diff(&self, team: TeamIdx, opponent: TeamIdx) -> i32 {
        self.goal_diff[team * self.n + opponent]
    }

    pub fn record(&mut self, home: TeamIdx, away: TeamIdx, pts: (i32, i32), gd: i32) {
        self.points[home * self.n + away] += pts.0;
        self.points[away * self.n + home] += pts.1;
        self.goal_diff[home * self.n + away] += gd;
        self.goal_diff[away * self.n + home] -= gd;
    }

    /// (points, goal difference) `team` collected against the other members of `group`.
    pub fn within(&self, team: TeamIdx, group: &[TeamIdx]) -> (i32, i32) {
        group
            .iter()
            .filter(|&&o| o != team)
            .fold((0, 0), |(p, g), &o| {
                (p + self.points(team, o), g + self.goal_diff(team, o))
            })
    }
}

/// Running table for one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialState {
    pub points: Vec<i32>,
    pub goal_diff: Vec<i32>,
    pub head_to_head: Option<HeadToHead>,
}

impl TrialState {
    pub fn new(league: &League, track_head_to_head: bool) -> Self {
        let n = league.len();
        Self {
            points: league.teams().iter().map(|t| t.points).collect(),
            goal_diff: league.teams().iter().map(|t| t.goal_difference).collect(),
            head_to_head: track_head_to_head.then(|| HeadToHead::new(n)),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn apply(&mut self, fixture: Fixture, pts: (i32, i32), gd: i32) {
        self.points[fixture.home] += pts.0;
        self.points[fixture.away] += pts.1;
        self.goal_diff[fixture.home] += gd;
        self.goal_diff[fixture.away] -= gd;
        if let Some(h2h) = self.head_to_head.as_mut() {
            h2h.record(fixture.home, fixture.away, pts, gd);
        }
    }
}

/// Outcome probabilities for every ordered (home, away) pair, computed once per run and
/// shared read-only by all trials.
#[derive(Debug, Clone)]
pub struct OddsGrid {
    n: usize,
    cells: Vec<Prob3>,
}

impl OddsGrid {
    pub fn new(league: &League, model: &OutcomeModel, neutral_venues: bool) -> Self {
        let n = league.len();
        let mut cells = Vec::with_capacity(n * n);
        for home in league.teams() {
            for away in league.teams() {
                cells.push(if neutral_venues {
                    model.neutral_probs(home, away)
                } else {
                    model.fixture_probs(home, away)
                });
            }
        }
        Self { n, cells }
    }

    pub fn get(&self, fixture: Fixture) -> &Prob3 {
        &self.cells[fixture.home * self.n + fixture.away]
    }
}

/// Plays fixture lists against a `TrialState`.
#[derive(Debug, Clone)]
pub struct TrialEngine {
    odds: OddsGrid,
    track_goals: bool,
}

impl TrialEngine {
    pub fn new(
        league: &League,
        model: &OutcomeModel,
        track_goals: bool,
        neutral_venues: bool,
    ) -> Self {
        Self {
            odds: OddsGrid::new(league, model, neutral_venues),
            track_goals,
        }
    }

    pub fn odds(&self) -> &OddsGrid {
        &self.odds
    }

    /// Plays every fixture once, in order. An empty list leaves the table untouched.
    pub fn play<R: Rng + ?Sized>(&self, fixtures: &[Fixture], state: &mut TrialState, rng: &mut R) {
        for &fixture in fixtures {
            let outcome = sample_outcome(self.odds.get(fixture), rng);
            let gd = if self.track_goals {
                sample_score(outcome, rng).goal_difference()
            } else {
                0
            };
            state.apply(fixture, outcome.points(), gd);
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{HeadToHead, OddsGrid, TrialEngine, TrialState};
    use crate::outcome_model::OutcomeModel;
    use crate::team::{Fixture, League, TeamRecord};

    fn league() -> League {
        League::new(
            &[
                TeamRecord::new("Korea", 1800.0, 3).with_goal_difference(2),
                TeamRecord::new("Japan", 1850.0, 3).with_goal_difference(1),
                TeamRecord::new("China", 1500.0, 0).with_goal_difference(-3),
            ],
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn empty_fixture_list_reproduces_starting_table() {
        let league = league();
        let engine = TrialEngine::new(&league, &OutcomeModel::default(), true, false);
        let mut state = TrialState::new(&league, true);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        engine.play(&[], &mut state, &mut rng);
        assert_eq!(state.points, vec![3, 3, 0]);
        assert_eq!(state.goal_diff, vec![2, 1, -3]);
    }

    #[test]
    fn points_and_goal_difference_are_conserved_per_match() {
        let league = league();
        let engine = TrialEngine::new(&league, &OutcomeModel::flat(), true, false);
        let fixtures = league.single_round_robin();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for _ in 0..500 {
            let mut state = TrialState::new(&league, true);
            engine.play(&fixtures, &mut state, &mut rng);
            let gained: i32 = state.points.iter().sum::<i32>() - 6;
            // Three matches, each worth 2 or 3 points in total.
            assert!((6..=9).contains(&gained));
            assert_eq!(state.goal_diff.iter().sum::<i32>(), 0);

            let h2h = state.head_to_head.as_ref().unwrap();
            for a in 0..3 {
                for b in 0..3 {
                    assert_eq!(h2h.goal_diff(a, b), -h2h.goal_diff(b, a));
                }
            }
        }
    }

    #[test]
    fn head_to_head_only_counts_group_members() {
        let mut h2h = HeadToHead::new(3);
        h2h.record(0, 1, (3, 0), 2);
        h2h.record(2, 0, (1, 1), 0);
        h2h.record(1, 2, (0, 3), -1);
        assert_eq!(h2h.within(0, &[0, 1]), (3, 2));
        assert_eq!(h2h.within(0, &[0, 1, 2]), (4, 2));
        assert_eq!(h2h.within(2, &[1, 2]), (3, 1));
    }

    #[test]
    fn head_to_head_is_skipped_when_not_tracked() {
        let league = league();
        let engine = TrialEngine::new(&league, &OutcomeModel::default(), false, false);
        let mut state = TrialState::new(&league, false);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        engine.play(&[Fixture::new(0, 1)], &mut state, &mut rng);
        assert!(state.head_to_head.is_none());
        assert_eq!(state.goal_diff, vec![2, 1, -3]);
    }

    #[test]
    fn neutral_grid_drops_the_home_bonus() {
        let league = League::new(
            &[
                TeamRecord::new("Iran", 1700.0, 0),
                TeamRecord::new("Iraq", 1700.0, 0),
            ],
            60.0,
        )
        .unwrap();
        let f = Fixture::new(0, 1);
        for model in [OutcomeModel::default(), OutcomeModel::flat()] {
            let neutral = *OddsGrid::new(&league, &model, true).get(f);
            assert!((neutral.home - neutral.away).abs() < 1e-12);
            let hosted = *OddsGrid::new(&league, &model, false).get(f);
            assert!(hosted.home > hosted.away);
        }
    }
}
