use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::outcome_model::Prob3;

pub const WIN_POINTS: i32 = 3;
pub const DRAW_POINTS: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl MatchOutcome {
    /// Points awarded to (home, away).
    pub fn points(self) -> (i32, i32) {
        match self {
            MatchOutcome::HomeWin => (WIN_POINTS, 0),
            MatchOutcome::Draw => (DRAW_POINTS, DRAW_POINTS),
            MatchOutcome::AwayWin => (0, WIN_POINTS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreLine {
    pub home: u8,
    pub away: u8,
}

impl ScoreLine {
    pub fn goal_difference(&self) -> i32 {
        i32::from(self.home) - i32::from(self.away)
    }
}

const LEVEL_SCORES: [u8; 3] = [0, 1, 2];
const MAX_WINNING_GOALS: u8 = 3;

/// Picks an outcome from one uniform draw split into [home | draw | away].
pub fn sample_outcome<R: Rng + ?Sized>(probs: &Prob3, rng: &mut R) -> MatchOutcome {
    let r: f64 = rng.gen_range(0.0..1.0);
    if r < probs.home {
        MatchOutcome::HomeWin
    } else if r < probs.home + probs.draw {
        MatchOutcome::Draw
    } else {
        MatchOutcome::AwayWin
    }
}

/// Illustrative score line consistent with `outcome`. Not calibrated against real scoring
/// rates: winners get 1-3 goals, losers strictly fewer, draws are 0-0, 1-1 or 2-2.
pub fn sample_score<R: Rng + ?Sized>(outcome: MatchOutcome, rng: &mut R) -> ScoreLine {
    match outcome {
        MatchOutcome::Draw => {
            let g = LEVEL_SCORES[rng.gen_range(0..LEVEL_SCORES.len())];
            ScoreLine { home: g, away: g }
        }
        MatchOutcome::HomeWin => {
            let (winner, loser) = winning_pair(rng);
            ScoreLine {
                home: winner,
                away: loser,
            }
        }
        MatchOutcome::AwayWin => {
            let (winner, loser) = winning_pair(rng);
            ScoreLine {
                home: loser,
                away: winner,
            }
        }
    }
}

fn winning_pair<R: Rng + ?Sized>(rng: &mut R) -> (u8, u8) {
    let winner = rng.gen_range(1..=MAX_WINNING_GOALS);
    let loser = rng.gen_range(0..winner);
    (winner, loser)
}
