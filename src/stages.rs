use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::team::{Fixture, TeamIdx};

pub const DEFAULT_VENUE_CAP: u32 = 5;

/// How the table is cut once the regular season ends, and what each band plays next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageRule {
    /// Top `cut` / rest, one round-robin inside each band.
    GroupSplit { cut: usize },
    /// Top `playoff_size` play home and away; the rest play once with venues balanced
    /// against `venue_cap`.
    PlayoffPlayout {
        playoff_size: usize,
        #[serde(default = "default_venue_cap")]
        venue_cap: u32,
    },
}

fn default_venue_cap() -> u32 {
    DEFAULT_VENUE_CAP
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Ties go to the even neighbour (7 / 2 -> 4, 5 / 2 -> 2).
    #[default]
    HalfEven,
    HalfUp,
    Down,
    Up,
}

/// Points transform applied between stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CarryOver {
    #[default]
    Keep,
    Halve {
        #[serde(default)]
        rounding: Rounding,
    },
}

impl CarryOver {
    pub fn apply(self, points: i32) -> i32 {
        match self {
            CarryOver::Keep => points,
            CarryOver::Halve { rounding } => halve(points, rounding),
        }
    }
}

fn halve(points: i32, rounding: Rounding) -> i32 {
    let floor = points.div_euclid(2);
    if points.rem_euclid(2) == 0 {
        return floor;
    }
    match rounding {
        Rounding::Down => floor,
        Rounding::Up | Rounding::HalfUp => floor + 1,
        Rounding::HalfEven => {
            if floor % 2 == 0 {
                floor
            } else {
                floor + 1
            }
        }
    }
}

/// A second stage: how the table is carried over and how it is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondStage {
    pub rule: StageRule,
    #[serde(default)]
    pub carry_over: CarryOver,
}

/// Bands (in rank order) and the fixtures they play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDraw {
    pub bands: Vec<Vec<TeamIdx>>,
    pub fixtures: Vec<Fixture>,
}

impl SecondStage {
    pub fn validate(&self, teams: usize) -> Result<()> {
        let (field, size) = match self.rule {
            StageRule::GroupSplit { cut } => ("cut", cut),
            StageRule::PlayoffPlayout {
                playoff_size,
                venue_cap,
            } => {
                if venue_cap == 0 {
                    return Err(SimError::config("venue_cap", "must be at least 1"));
                }
                ("playoff_size", playoff_size)
            }
        };
        if size == 0 || size >= teams {
            return Err(SimError::config(
                field,
                format!(
                    "{size} must leave both bands non-empty for {teams} teams (1..={})",
                    teams.saturating_sub(1)
                ),
            ));
        }
        Ok(())
    }

    /// Band sizes in rank order.
    pub fn band_sizes(&self, teams: usize) -> Vec<usize> {
        let top = match self.rule {
            StageRule::GroupSplit { cut } => cut,
            StageRule::PlayoffPlayout { playoff_size, .. } => playoff_size,
        };
        vec![top, teams - top]
    }

    /// Splits a resolved rank order and generates every fixture of the stage.
    pub fn draw<R: Rng + ?Sized>(&self, order: &[TeamIdx], rng: &mut R) -> StageDraw {
        match self.rule {
            StageRule::GroupSplit { cut } => {
                let (top, bottom) = order.split_at(cut);
                let mut fixtures = alternating_round_robin(top);
                fixtures.extend(alternating_round_robin(bottom));
                StageDraw {
                    bands: vec![top.to_vec(), bottom.to_vec()],
                    fixtures,
                }
            }
            StageRule::PlayoffPlayout {
                playoff_size,
                venue_cap,
            } => {
                let (playoff, playout) = order.split_at(playoff_size);
                let mut fixtures = double_round_robin(playoff);
                fixtures.extend(balanced_round_robin(playout, venue_cap, rng));
                StageDraw {
                    bands: vec![playoff.to_vec(), playout.to_vec()],
                    fixtures,
                }
            }
        }
    }
}

/// Single round-robin; pairing (i, j), i < j, is hosted by `band[i]` when `i` is even and
/// by `band[j]` otherwise.
pub fn alternating_round_robin(band: &[TeamIdx]) -> Vec<Fixture> {
    let k = band.len();
    let mut out = Vec::with_capacity(k * k.saturating_sub(1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            let (home, away) = if i % 2 == 0 {
                (band[i], band[j])
            } else {
                (band[j], band[i])
            };
            out.push(Fixture::new(home, away));
        }
    }
    out
}

/// Every ordered pair once: each team hosts every other member exactly once.
pub fn double_round_robin(band: &[TeamIdx]) -> Vec<Fixture> {
    let mut out = Vec::with_capacity(band.len() * band.len().saturating_sub(1));
    for &home in band {
        for &away in band {
            if home != away {
                out.push(Fixture::new(home, away));
            }
        }
    }
    out
}

/// Every unordered pair once, in shuffled order, with venues assigned greedily: the first
/// listed team hosts unless that would push it past `cap` home games or its opponent past
/// `cap` away games, in which case roles swap. Best effort; the swap itself is not checked
/// against the cap, so some band sizes end up uneven.
pub fn balanced_round_robin<R: Rng + ?Sized>(
    band: &[TeamIdx],
    cap: u32,
    rng: &mut R,
) -> Vec<Fixture> {
    let k = band.len();
    let mut pairings = Vec::with_capacity(k * k.saturating_sub(1) / 2);
    for i in 0..k {
        for j in (i + 1)..k {
            pairings.push((i, j));
        }
    }
    pairings.shuffle(rng);

    let mut home_games = vec![0u32; k];
    let mut away_games = vec![0u32; k];
    pairings
        .into_iter()
        .map(|(a, b)| {
            let (h, w) = if home_games[a] < cap && away_games[b] < cap {
                (a, b)
            } else {
                (b, a)
            };
            home_games[h] += 1;
            away_games[w] += 1;
            Fixture::new(band[h], band[w])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{
        CarryOver, Rounding, SecondStage, StageRule, alternating_round_robin,
        balanced_round_robin, double_round_robin,
    };
    use crate::team::Fixture;

    #[test]
    fn halving_rounds_as_configured() {
        let even = CarryOver::Halve {
            rounding: Rounding::HalfEven,
        };
        assert_eq!(even.apply(40), 20);
        assert_eq!(even.apply(7), 4);
        assert_eq!(even.apply(5), 2);
        assert_eq!(even.apply(0), 0);
        let up = CarryOver::Halve {
            rounding: Rounding::Up,
        };
        assert_eq!(up.apply(5), 3);
        let down = CarryOver::Halve {
            rounding: Rounding::Down,
        };
        assert_eq!(down.apply(5), 2);
        assert_eq!(down.apply(-3), -2);
        assert_eq!(CarryOver::Keep.apply(31), 31);
    }

    #[test]
    fn alternating_round_robin_follows_index_parity() {
        let fixtures = alternating_round_robin(&[10, 11, 12]);
        assert_eq!(
            fixtures,
            vec![
                Fixture::new(10, 11),
                Fixture::new(10, 12),
                Fixture::new(12, 11)
            ]
        );
    }

    #[test]
    fn playoff_band_hosts_everyone_once() {
        let band = [3, 1, 4, 0, 5, 2];
        let fixtures = double_round_robin(&band);
        assert_eq!(fixtures.len(), 6 * 5);
        let unique: HashSet<_> = fixtures.iter().copied().collect();
        assert_eq!(unique.len(), fixtures.len());
    }

    #[test]
    fn playout_band_plays_each_pair_once() {
        let band: Vec<usize> = (6..16).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for _ in 0..50 {
            let fixtures = balanced_round_robin(&band, 5, &mut rng);
            assert_eq!(fixtures.len(), 10 * 9 / 2);
            let pairs: HashSet<(usize, usize)> = fixtures
                .iter()
                .map(|f| (f.home.min(f.away), f.home.max(f.away)))
                .collect();
            assert_eq!(pairs.len(), 45);
            for team in &band {
                let home = fixtures.iter().filter(|f| f.home == *team).count();
                let away = fixtures.iter().filter(|f| f.away == *team).count();
                assert_eq!(home + away, 9);
            }
        }
    }

    #[test]
    fn playout_swaps_hosts_once_the_cap_is_reached() {
        let band = [20, 21, 22, 23];
        let mut swaps = 0;
        for seed in 0..40 {
            let fixtures = balanced_round_robin(&band, 1, &mut ChaCha8Rng::seed_from_u64(seed));
            let mut home = [0u32; 4];
            let mut away = [0u32; 4];
            for (n, f) in fixtures.iter().enumerate() {
                let (h, w) = (f.home - 20, f.away - 20);
                let (lo, hi) = (h.min(w), h.max(w));
                if n == 0 {
                    assert_eq!(h, lo, "first pairing is hosted by the earlier team");
                }
                let expected_host = if home[lo] < 1 && away[hi] < 1 { lo } else { hi };
                assert_eq!(h, expected_host, "seed {seed}, fixture {n}");
                if h == hi {
                    swaps += 1;
                }
                home[h] += 1;
                away[w] += 1;
            }
        }
        assert!(swaps > 0);
    }

    #[test]
    fn playout_without_pressure_keeps_earlier_team_at_home() {
        let band: Vec<usize> = (0..6).collect();
        let fixtures = balanced_round_robin(&band, u32::MAX, &mut ChaCha8Rng::seed_from_u64(2));
        assert!(fixtures.iter().all(|f| f.home < f.away));
    }

    #[test]
    fn group_split_keeps_bands_intact() {
        let stage = SecondStage {
            rule: StageRule::GroupSplit { cut: 6 },
            carry_over: CarryOver::Keep,
        };
        let order: Vec<usize> = (0..12).rev().collect();
        let draw = stage.draw(&order, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(draw.bands[0], vec![11, 10, 9, 8, 7, 6]);
        assert_eq!(draw.bands[1], vec![5, 4, 3, 2, 1, 0]);
        assert_eq!(draw.fixtures.len(), 15 + 15);
        for f in &draw.fixtures {
            assert_eq!(f.home >= 6, f.away >= 6);
        }
    }

    #[test]
    fn stage_sizes_must_leave_two_bands() {
        let ok = SecondStage {
            rule: StageRule::PlayoffPlayout {
                playoff_size: 6,
                venue_cap: 5,
            },
            carry_over: CarryOver::default(),
        };
        assert!(ok.validate(16).is_ok());
        assert_eq!(ok.band_sizes(16), vec![6, 10]);
        assert!(ok.validate(6).is_err());

        let zero_cap = SecondStage {
            rule: StageRule::PlayoffPlayout {
                playoff_size: 6,
                venue_cap: 0,
            },
            carry_over: CarryOver::default(),
        };
        assert!(zero_cap.validate(16).is_err());

        let empty_top = SecondStage {
            rule: StageRule::GroupSplit { cut: 0 },
            carry_over: CarryOver::default(),
        };
        assert!(empty_top.validate(12).is_err());
    }
}
