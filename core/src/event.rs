//! Run events, persisted to the event log in emission order.
//!
//! RULE: Payloads must be a pure function of (seed, config, trial).
//! No wall-clock values, no ids generated at runtime.

use crate::types::{Level, Player, RunId, Trial};
use serde::{Deserialize, Serialize};

/// Variants are appended only, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    RunInitialized {
        run_id:  RunId,
        seed:    u64,
        levels:  usize,
        players: usize,
    },
    TrialCompleted {
        trial:           Trial,
        churned_players: usize,
        churned_levels:  usize,
    },
    PlayerChurned {
        trial:       Trial,
        player:      Player,
        first_level: Level,
    },
    LevelChurned {
        trial:        Trial,
        level:        Level,
        first_player: Player,
    },
    RunCompleted {
        trials:             Trial,
        player_churn_rate:  f64,
    },
}

impl SimEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } => "run_initialized",
            Self::TrialCompleted { .. } => "trial_completed",
            Self::PlayerChurned { .. }  => "player_churned",
            Self::LevelChurned { .. }   => "level_churned",
            Self::RunCompleted { .. }   => "run_completed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub trial:      Trial,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SimEvent
}
