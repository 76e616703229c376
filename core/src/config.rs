use crate::{
    error::{SimError, SimResult},
    types::{ActivityPoints, Trial},
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Half-open integer range `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRange {
    pub low:  ActivityPoints,
    pub high: ActivityPoints,
}

impl PointsRange {
    pub const fn new(low: ActivityPoints, high: ActivityPoints) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, v: ActivityPoints) -> bool {
        v >= self.low && v < self.high
    }

    pub fn is_empty(&self) -> bool {
        self.low >= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub num_players: usize,
    pub num_levels: usize,
    /// Activity a player may spend on a level before churning.
    pub churn_threshold_range: PointsRange,
    /// Mean activity needed to pass a level; success probability is 1 / base.
    pub base_activity_range: PointsRange,
    /// A level churns when its first exceeding player index is above this.
    pub level_churn_floor: usize,
    /// Save an aggregate snapshot every this many trials.
    pub snapshot_interval: Trial,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_players:           10,
            num_levels:            5,
            churn_threshold_range: PointsRange::new(8, 15),
            base_activity_range:   PointsRange::new(1, 10),
            level_churn_floor:     1,
            snapshot_interval:     100,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config: SimConfig = serde_json::from_str(&content)
            .with_context(|| format!("Cannot parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.num_players == 0 {
            return Err(SimError::InvalidConfig("num_players must be > 0".into()));
        }
        if self.num_levels == 0 {
            return Err(SimError::InvalidConfig("num_levels must be > 0".into()));
        }
        if self.churn_threshold_range.is_empty() {
            return Err(SimError::InvalidConfig(format!(
                "churn_threshold_range [{}, {}) is empty",
                self.churn_threshold_range.low, self.churn_threshold_range.high
            )));
        }
        if self.base_activity_range.is_empty() {
            return Err(SimError::InvalidConfig(format!(
                "base_activity_range [{}, {}) is empty",
                self.base_activity_range.low, self.base_activity_range.high
            )));
        }
        // Success probability 1 / base must stay in (0, 1].
        if self.base_activity_range.low < 1 {
            return Err(SimError::InvalidConfig(
                "base_activity_range.low must be >= 1".into(),
            ));
        }
        if self.snapshot_interval == 0 {
            return Err(SimError::InvalidConfig("snapshot_interval must be > 0".into()));
        }
        Ok(())
    }
}
