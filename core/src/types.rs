//! Shared primitive types used across the simulation.

/// A trial number. One trial = one full draw of the (level, player) grid.
pub type Trial = u64;

/// Row index into a simulation grid.
pub type Level = usize;

/// Column index into a simulation grid.
pub type Player = usize;

/// Activity points: thresholds, base activity and simulated counts.
pub type ActivityPoints = u32;

/// The canonical run identifier.
pub type RunId = String;
