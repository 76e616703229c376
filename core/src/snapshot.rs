//! Aggregate snapshots, taken every `snapshot_interval` trials.
//!
//! A snapshot holds the running summary so a long run can be inspected
//! part-way without replaying from trial 0.

use crate::{
    stats::ChurnSummary,
    types::{RunId, Trial},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub run_id:  RunId,
    /// Number of trials folded into `summary`.
    pub trial:   Trial,
    pub summary: ChurnSummary,
}
