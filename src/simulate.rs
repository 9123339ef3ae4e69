use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{RankBand, SimulationSummary, Tally, TrialOutcome};
use crate::error::{Result, SimError};
use crate::format::LeagueFormat;
use crate::team::{Fixture, League, TeamIdx};
use crate::trial::{TrialEngine, TrialState};

// Trials per random stream. Fixed so a seed gives the same report on any number of threads.
const CHUNK_TRIALS: u64 = 2_048;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub trials: u64,
    pub seed: Option<u64>,
    /// Worker threads; `None` uses rayon's global pool, `Some(1)` runs on the caller.
    pub threads: Option<usize>,
    pub rank_band: Option<RankBand>,
}

impl RunOptions {
    pub fn new(trials: u64) -> Self {
        Self {
            trials,
            ..Self::default()
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn rank_band(mut self, band: RankBand) -> Self {
        self.rank_band = Some(band);
        self
    }
}

/// Pre-match odds for one first-stage fixture, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    pub home: String,
    pub away: String,
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub format: String,
    pub seed: u64,
    pub requested_trials: u64,
    /// Trials actually completed; smaller than requested only when cancelled.
    pub trials: u64,
    pub cancelled: bool,
    pub teams: Vec<SimulationSummary>,
    pub matches: Vec<MatchOdds>,
}

impl SimulationReport {
    pub fn team(&self, name: &str) -> Option<&SimulationSummary> {
        self.teams.iter().find(|t| t.team == name)
    }
}

/// A validated league, fixture list and format, ready to run any number of trials.
#[derive(Debug, Clone)]
pub struct Simulation<'a> {
    league: &'a League,
    fixtures: Vec<Fixture>,
    format: LeagueFormat,
    engine: TrialEngine,
    members: Vec<TeamIdx>,
}

impl<'a> Simulation<'a> {
    pub fn new(league: &'a League, fixtures: Vec<Fixture>, format: LeagueFormat) -> Result<Self> {
        league.check_fixtures(&fixtures)?;
        format.validate(league.len())?;
        let engine = TrialEngine::new(
            league,
            &format.model,
            format.track_goals,
            format.neutral_venues,
        );
        debug!(
            format = %format.name,
            teams = league.len(),
            fixtures = fixtures.len(),
            "simulation prepared"
        );
        Ok(Self {
            league,
            fixtures,
            format,
            engine,
            members: (0..league.len()).collect(),
        })
    }

    pub fn league(&self) -> &League {
        self.league
    }

    pub fn format(&self) -> &LeagueFormat {
        &self.format
    }

    pub fn match_odds(&self) -> Vec<MatchOdds> {
        self.fixtures
            .iter()
            .map(|&f| {
                let p = self.engine.odds().get(f).as_percent();
                MatchOdds {
                    home: self.league.name(f.home).to_string(),
                    away: self.league.name(f.away).to_string(),
                    home_win: p.home,
                    draw: p.draw,
                    away_win: p.away,
                }
            })
            .collect()
    }

    pub fn new_tally(&self) -> Tally {
        Tally::new(
            self.league.len(),
            self.format.second_stage.is_some(),
            self.format.title,
        )
    }

    /// Plays the regular fixtures and, for staged formats, the generated second stage.
    pub fn run_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> TrialOutcome {
        let policy = self.format.tiebreak;
        let mut state = TrialState::new(self.league, policy.needs_head_to_head());
        self.engine.play(&self.fixtures, &mut state, rng);

        let Some(stage) = &self.format.second_stage else {
            let order = policy.resolve(&state, &self.members, rng);
            return TrialOutcome {
                order,
                points: state.points,
                goal_diff: state.goal_diff,
                top_band: self.league.len(),
                entry_order: None,
            };
        };

        for p in state.points.iter_mut() {
            *p = stage.carry_over.apply(*p);
        }
        let entry = policy.resolve(&state, &self.members, rng);
        let draw = stage.draw(&entry, rng);
        self.engine.play(&draw.fixtures, &mut state, rng);

        // Bands are ranked on their own; nobody leaves their band after the split.
        let mut order = Vec::with_capacity(self.league.len());
        for band in &draw.bands {
            order.extend(policy.resolve(&state, band, rng));
        }
        TrialOutcome {
            order,
            points: state.points,
            goal_diff: state.goal_diff,
            top_band: draw.bands.first().map_or(0, Vec::len),
            entry_order: Some(entry),
        }
    }

    /// Runs up to `count` trials into `tally`, checking `cancel` before each one. Returns
    /// the number completed.
    pub fn run_trials<R: Rng + ?Sized>(
        &self,
        tally: &mut Tally,
        count: u64,
        rng: &mut R,
        cancel: &AtomicBool,
    ) -> u64 {
        let mut done = 0;
        while done < count {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            tally.record(&self.run_trial(rng));
            done += 1;
        }
        done
    }

    pub fn run(&self, opts: &RunOptions) -> Result<SimulationReport> {
        self.run_until(opts, &AtomicBool::new(false))
    }

    /// Like `run`, but stops early once `cancel` is set. Completed trials are kept and
    /// summarized; a run cancelled before its first trial is an error.
    pub fn run_until(&self, opts: &RunOptions, cancel: &AtomicBool) -> Result<SimulationReport> {
        if opts.trials == 0 {
            return Err(SimError::config("trials", "must be at least 1"));
        }
        if let Some(band) = opts.rank_band {
            band.check(self.league.len())?;
        }
        if opts.threads == Some(0) {
            return Err(SimError::config("threads", "must be at least 1"));
        }

        let seed = opts.seed.unwrap_or_else(rand::random);
        let chunks = opts.trials.div_ceil(CHUNK_TRIALS);
        info!(
            format = %self.format.name,
            trials = opts.trials,
            seed,
            chunks,
            "simulation started"
        );
        let started = Instant::now();

        let run_chunk = |chunk: u64| {
            let mut rng = chunk_rng(seed, chunk);
            let count = CHUNK_TRIALS.min(opts.trials - chunk * CHUNK_TRIALS);
            let mut tally = self.new_tally();
            let done = self.run_trials(&mut tally, count, &mut rng, cancel);
            debug!(chunk, done, "chunk finished");
            tally
        };

        let tally = if opts.threads == Some(1) {
            (0..chunks).map(run_chunk).fold(self.new_tally(), Tally::merge)
        } else {
            let pool = build_pool(opts.threads);
            with_pool(&pool, || {
                (0..chunks)
                    .into_par_iter()
                    .map(run_chunk)
                    .reduce(|| self.new_tally(), Tally::merge)
            })
        };

        let completed = tally.trials();
        if completed == 0 {
            return Err(SimError::Cancelled);
        }
        let cancelled = completed < opts.trials;
        if cancelled {
            warn!(completed, requested = opts.trials, "simulation cancelled early");
        }
        info!(
            trials = completed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation finished"
        );

        let band_sizes = self
            .format
            .second_stage
            .as_ref()
            .map(|stage| stage.band_sizes(self.league.len()));
        Ok(SimulationReport {
            format: self.format.name.clone(),
            seed,
            requested_trials: opts.trials,
            trials: completed,
            cancelled,
            teams: tally.summarize(
                self.league,
                opts.rank_band,
                self.format.track_goals,
                band_sizes.as_deref(),
            ),
            matches: self.match_odds(),
        })
    }
}

fn chunk_rng(seed: u64, chunk: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(chunk);
    rng
}

fn build_pool(threads: Option<usize>) -> Option<rayon::ThreadPool> {
    let threads = threads?;
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
