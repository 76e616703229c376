//! Player churn simulation: one trial over a (level, player) grid.
//!
//! A trial:
//!   1. Draws a churn threshold per level
//!   2. Draws a base activity level per level
//!   3. Tiles 1 / base across players into success probabilities
//!   4. Draws each player's activity on each level from a geometric distribution
//!   5. Flags cells whose activity exceeds the level's threshold
//!   6. Reduces the flags to churned players and churned levels
//!
//! Each draw stage uses its own stream from the RngBank.

use crate::{
    config::{PointsRange, SimConfig},
    error::SimResult,
    grid::Grid,
    rng::{RngBank, StreamRng, StreamSlot},
    types::{ActivityPoints, Level, Player, Trial},
};
use serde::{Deserialize, Serialize};

// ── Public types ─────────────────────────────────────────────────────────────

/// Everything one trial produced. Grids are (levels, players) unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub trial:                 Trial,
    /// (levels, 1)
    pub thresholds:            Grid<ActivityPoints>,
    /// (levels, 1)
    pub base_activity:         Grid<ActivityPoints>,
    pub success_probabilities: Grid<f64>,
    pub simulated_activity:    Grid<ActivityPoints>,
    pub exceeded:              Grid<bool>,
    /// Length `players`.
    pub churned_players:       Vec<bool>,
    /// Length `levels`.
    pub churned_levels:        Vec<bool>,
    /// argmax per level of `exceeded`; 0 when nobody exceeded.
    pub first_exceeding:       Vec<Player>,
}

impl TrialOutcome {
    pub fn churned_player_count(&self) -> usize {
        self.churned_players.iter().filter(|&&c| c).count()
    }

    pub fn churned_level_count(&self) -> usize {
        self.churned_levels.iter().filter(|&&c| c).count()
    }

    /// First level on which `player` exceeded the threshold.
    pub fn first_churn_level(&self, player: Player) -> Option<Level> {
        (0..self.exceeded.rows())
            .find(|&level| self.exceeded.get(level, player).copied().unwrap_or(false))
    }
}

// ── Simulation ───────────────────────────────────────────────────────────────

pub struct ChurnSimulation {
    config: SimConfig,
}

impl ChurnSimulation {
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run one complete trial with the streams assigned to `trial`.
    pub fn run_trial(&self, bank: &RngBank, trial: Trial) -> SimResult<TrialOutcome> {
        let mut threshold_rng = bank.for_stream_at_trial(StreamSlot::Thresholds, trial);
        let mut base_rng      = bank.for_stream_at_trial(StreamSlot::BaseActivity, trial);
        let mut activity_rng  = bank.for_stream_at_trial(StreamSlot::Activity, trial);

        let thresholds    = self.draw_thresholds(&mut threshold_rng)?;
        let base_activity = self.draw_base_activity(&mut base_rng)?;
        let success_probabilities = self.success_probabilities(&base_activity)?;
        let simulated_activity = simulate_activity(&success_probabilities, &mut activity_rng)?;
        let exceeded = exceed_mask(&simulated_activity, &thresholds)?;

        let churned_players = churned_players(&exceeded);
        let first_exceeding = exceeded.argmax_per_row();
        let churned_levels  = churned_levels(&first_exceeding, self.config.level_churn_floor);

        log::debug!(
            "trial={trial} churn: players={}/{} levels={}/{}",
            churned_players.iter().filter(|&&c| c).count(),
            self.config.num_players,
            churned_levels.iter().filter(|&&c| c).count(),
            self.config.num_levels,
        );

        Ok(TrialOutcome {
            trial,
            thresholds,
            base_activity,
            success_probabilities,
            simulated_activity,
            exceeded,
            churned_players,
            churned_levels,
            first_exceeding,
        })
    }

    /// (levels, 1) churn thresholds.
    pub fn draw_thresholds(&self, rng: &mut StreamRng) -> SimResult<Grid<ActivityPoints>> {
        draw_column(self.config.num_levels, self.config.churn_threshold_range, rng)
    }

    /// (levels, 1) base activity levels.
    pub fn draw_base_activity(&self, rng: &mut StreamRng) -> SimResult<Grid<ActivityPoints>> {
        draw_column(self.config.num_levels, self.config.base_activity_range, rng)
    }

    /// (levels, players) grid of 1 / base, tiled across players.
    pub fn success_probabilities(
        &self,
        base_activity: &Grid<ActivityPoints>,
    ) -> SimResult<Grid<f64>> {
        Ok(base_activity
            .tile_columns(self.config.num_players)?
            .map(|&base| 1.0 / f64::from(base)))
    }
}

fn draw_column(
    levels: usize,
    range: PointsRange,
    rng: &mut StreamRng,
) -> SimResult<Grid<ActivityPoints>> {
    let values = (0..levels)
        .map(|_| rng.int_in_range(range.low, range.high))
        .collect::<SimResult<Vec<_>>>()?;
    Ok(Grid::column(values))
}

/// One geometric draw per cell, using that cell's success probability.
pub fn simulate_activity(
    success_probabilities: &Grid<f64>,
    rng: &mut StreamRng,
) -> SimResult<Grid<ActivityPoints>> {
    let (levels, players) = success_probabilities.shape();
    Grid::try_from_fn(levels, players, |level, player| {
        let p = success_probabilities
            .get(level, player)
            .copied()
            .unwrap_or(f64::NAN);
        rng.geometric(p)
    })
}

/// Cells whose simulated activity is strictly above the level threshold.
pub fn exceed_mask(
    simulated: &Grid<ActivityPoints>,
    thresholds: &Grid<ActivityPoints>,
) -> SimResult<Grid<bool>> {
    simulated.zip_broadcast_column(thresholds, |activity, threshold| activity > threshold)
}

/// A player churns when any level's activity exceeded its threshold.
pub fn churned_players(exceeded: &Grid<bool>) -> Vec<bool> {
    exceeded.any_per_column()
}

/// A level churns when its first exceeding player index is above `floor`.
pub fn churned_levels(first_exceeding: &[Player], floor: usize) -> Vec<bool> {
    first_exceeding.iter().map(|&idx| idx > floor).collect()
}
