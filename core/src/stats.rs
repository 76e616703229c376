//! Aggregation of churn outcomes across trials.

use crate::{
    error::{SimError, SimResult},
    simulation::TrialOutcome,
    types::Trial,
};
use serde::{Deserialize, Serialize};

/// Running totals for one level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelStatistics {
    pub churned_trials:      u64,
    pub threshold_sum:       u64,
    pub base_activity_sum:   u64,
    pub activity_sum:        u64,
    pub exceeded_cells:      u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnSummary {
    pub trials:  Trial,
    pub players: usize,
    pub levels:  Vec<LevelStatistics>,
    /// Trials in which each player churned.
    pub player_churned_trials: Vec<u64>,
}

impl ChurnSummary {
    pub fn new(levels: usize, players: usize) -> Self {
        Self {
            trials:                0,
            players,
            levels:                vec![LevelStatistics::default(); levels],
            player_churned_trials: vec![0; players],
        }
    }

    /// Fold one trial into the totals.
    pub fn record(&mut self, outcome: &TrialOutcome) -> SimResult<()> {
        let shape = outcome.simulated_activity.shape();
        if shape != (self.levels.len(), self.players) {
            return Err(SimError::ShapeMismatch {
                expected: (self.levels.len(), self.players),
                actual:   shape,
            });
        }

        for (level, stats) in self.levels.iter_mut().enumerate() {
            if outcome.churned_levels[level] {
                stats.churned_trials += 1;
            }
            stats.threshold_sum     += u64::from(outcome.thresholds.row(level)[0]);
            stats.base_activity_sum += u64::from(outcome.base_activity.row(level)[0]);
            stats.activity_sum += outcome
                .simulated_activity
                .row(level)
                .iter()
                .map(|&v| u64::from(v))
                .sum::<u64>();
            stats.exceeded_cells +=
                outcome.exceeded.row(level).iter().filter(|&&e| e).count() as u64;
        }
        for (player, churned) in outcome.churned_players.iter().enumerate() {
            if *churned {
                self.player_churned_trials[player] += 1;
            }
        }
        self.trials += 1;
        Ok(())
    }

    /// Combine totals from another summary of the same shape.
    pub fn merge(&mut self, other: &ChurnSummary) -> SimResult<()> {
        if other.levels.len() != self.levels.len() || other.players != self.players {
            return Err(SimError::ShapeMismatch {
                expected: (self.levels.len(), self.players),
                actual:   (other.levels.len(), other.players),
            });
        }
        for (mine, theirs) in self.levels.iter_mut().zip(&other.levels) {
            mine.churned_trials    += theirs.churned_trials;
            mine.threshold_sum     += theirs.threshold_sum;
            mine.base_activity_sum += theirs.base_activity_sum;
            mine.activity_sum      += theirs.activity_sum;
            mine.exceeded_cells    += theirs.exceeded_cells;
        }
        for (mine, theirs) in self.player_churned_trials.iter_mut().zip(&other.player_churned_trials) {
            *mine += theirs;
        }
        self.trials += other.trials;
        Ok(())
    }

    fn per_trial(&self, total: u64) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            total as f64 / self.trials as f64
        }
    }

    /// Fraction of trials in which each level churned.
    pub fn level_churn_frequency(&self) -> Vec<f64> {
        self.levels.iter().map(|l| self.per_trial(l.churned_trials)).collect()
    }

    /// Fraction of trials in which each player churned.
    pub fn player_churn_frequency(&self) -> Vec<f64> {
        self.player_churned_trials.iter().map(|&n| self.per_trial(n)).collect()
    }

    pub fn mean_threshold(&self) -> Vec<f64> {
        self.levels.iter().map(|l| self.per_trial(l.threshold_sum)).collect()
    }

    pub fn mean_base_activity(&self) -> Vec<f64> {
        self.levels.iter().map(|l| self.per_trial(l.base_activity_sum)).collect()
    }

    /// Mean simulated activity per (player, trial) on each level.
    pub fn mean_activity(&self) -> Vec<f64> {
        let players = self.players.max(1) as u64;
        self.levels
            .iter()
            .map(|l| self.per_trial(l.activity_sum) / players as f64)
            .collect()
    }

    /// Fraction of (player, trial) pairs that ended in churn.
    pub fn overall_player_churn_rate(&self) -> f64 {
        let total: u64 = self.player_churned_trials.iter().sum();
        let denom = self.trials.saturating_mul(self.players as u64);
        if denom == 0 {
            0.0
        } else {
            total as f64 / denom as f64
        }
    }
}
