use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::team::Team;

// Rating gaps are stretched by this factor before the logistic transform.
const SENSITIVITY: f64 = 1.2;
const LOGISTIC_SCALE: f64 = 400.0;

const DRAW_WIDE_GAP: f64 = 300.0;
const DRAW_NARROW_GAP: f64 = 100.0;
const DRAW_WIDE: f64 = 0.15;
const DRAW_MID: f64 = 0.18;
const DRAW_EVEN: f64 = 0.26;
const DRAW_AT_NARROW_GAP: f64 = 0.23;

// Keeps powered/normalized probabilities off exact 0 and 1.
const PROB_FLOOR: f64 = 1e-12;

pub const DEFAULT_FLAT_SCALE: f64 = 400.0;
pub const DEFAULT_FLAT_DRAW_RATE: f64 = 0.24;

/// Home / draw / away probabilities for one fixture, from the home side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Prob3 {
    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    pub fn as_percent(&self) -> Self {
        Self {
            home: self.home * 100.0,
            draw: self.draw * 100.0,
            away: self.away * 100.0,
        }
    }
}

/// How ratings turn into outcome probabilities. League formats differ in calibration, so
/// the model is picked per format rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeModel {
    /// Stretched logistic with a gap-dependent draw curve and an optional win/loss skew.
    Calibrated {
        #[serde(default = "neutral_skew")]
        skew: f64,
    },
    /// Plain Elo logistic with a constant draw rate carved out of the middle.
    Flat {
        #[serde(default = "default_flat_scale")]
        scale: f64,
        #[serde(default = "default_flat_draw_rate")]
        draw_rate: f64,
    },
}

fn neutral_skew() -> f64 {
    1.0
}

fn default_flat_scale() -> f64 {
    DEFAULT_FLAT_SCALE
}

fn default_flat_draw_rate() -> f64 {
    DEFAULT_FLAT_DRAW_RATE
}

impl Default for OutcomeModel {
    fn default() -> Self {
        OutcomeModel::Calibrated { skew: 1.0 }
    }
}

impl OutcomeModel {
    pub fn flat() -> Self {
        OutcomeModel::Flat {
            scale: DEFAULT_FLAT_SCALE,
            draw_rate: DEFAULT_FLAT_DRAW_RATE,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            OutcomeModel::Calibrated { skew } => {
                if !(skew.is_finite() && skew > 0.0) {
                    return Err(SimError::config(
                        "skew",
                        format!("{skew} must be a finite number greater than 0"),
                    ));
                }
            }
            OutcomeModel::Flat { scale, draw_rate } => {
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(SimError::config(
                        "scale",
                        format!("{scale} must be a finite number greater than 0"),
                    ));
                }
                if !(0.0..1.0).contains(&draw_rate) {
                    return Err(SimError::config(
                        "draw_rate",
                        format!("{draw_rate} must lie in [0, 1)"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Probabilities for `home` hosting `away`, home bonus included.
    pub fn fixture_probs(&self, home: &Team, away: &Team) -> Prob3 {
        self.probs(home.effective_rating(true), away.effective_rating(false))
    }

    /// Probabilities at a neutral venue: base ratings only.
    pub fn neutral_probs(&self, home: &Team, away: &Team) -> Prob3 {
        self.probs(home.rating, away.rating)
    }

    /// Probabilities from already-adjusted ratings.
    pub fn probs(&self, home_adj: f64, away_adj: f64) -> Prob3 {
        match *self {
            OutcomeModel::Calibrated { skew } => calibrated_probs(home_adj, away_adj, skew),
            OutcomeModel::Flat { scale, draw_rate } => {
                flat_probs(home_adj, away_adj, scale, draw_rate)
            }
        }
    }
}

pub fn expected_score(r_a: f64, r_b: f64, scale: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((r_b - r_a) / scale))
}

/// Draw probability as a function of the absolute adjusted rating gap. Non-increasing.
pub fn draw_probability(gap: f64) -> f64 {
    let gap = gap.abs();
    if gap >= DRAW_WIDE_GAP {
        DRAW_WIDE
    } else if gap >= DRAW_NARROW_GAP {
        DRAW_MID
    } else {
        DRAW_EVEN - (gap / DRAW_NARROW_GAP) * (DRAW_EVEN - DRAW_AT_NARROW_GAP)
    }
}

pub fn calibrated_probs(home_adj: f64, away_adj: f64, skew: f64) -> Prob3 {
    let base_win = expected_score(home_adj * SENSITIVITY, away_adj * SENSITIVITY, LOGISTIC_SCALE)
        .clamp(PROB_FLOOR, 1.0 - PROB_FLOOR);
    let base_loss = 1.0 - base_win;
    let draw = draw_probability(home_adj - away_adj);

    let win_adj = base_win.powf(skew);
    let loss_adj = base_loss.powf(1.0 / skew);
    let total = win_adj + loss_adj;
    let (win_share, loss_share) = if total.is_finite() && total > 0.0 {
        (win_adj / total, loss_adj / total)
    } else {
        (0.5, 0.5)
    };

    let decisive = 1.0 - draw;
    let home = (win_share * decisive).clamp(0.0, decisive);
    Prob3 {
        home,
        draw,
        away: decisive - home,
    }
}

pub fn flat_probs(home_adj: f64, away_adj: f64, scale: f64, draw_rate: f64) -> Prob3 {
    let p = expected_score(home_adj, away_adj, scale);
    let decisive = 1.0 - draw_rate;
    let home = (p - draw_rate / 2.0).clamp(0.0, decisive);
    Prob3 {
        home,
        draw: draw_rate,
        away: decisive - home,
    }
}
