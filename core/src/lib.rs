//! Player churn simulation over a (level, player) grid.
//!
//! Thresholds and base activity are drawn per level, activity per
//! (level, player) from a geometric distribution, and the cells that
//! exceed their level's threshold reduce to churned players and levels.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod grid;
pub mod rng;
pub mod simulation;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod types;
