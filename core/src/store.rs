//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine calls store methods; it never executes SQL directly.

use crate::{
    config::SimConfig,
    error::{SimError, SimResult},
    event::EventLogEntry,
    snapshot::SimSnapshot,
    stats::ChurnSummary,
    types::Trial,
};
use rusqlite::{params, Connection, OptionalExtension};

pub struct SimStore {
    conn: Connection,
}

/// A row of the `run` table.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id:     String,
    pub seed:       u64,
    pub version:    String,
    pub config:     SimConfig,
    pub started_at: String,
}

impl SimStore {
    /// Open (or create) the database at `path`. `:memory:` is accepted.
    pub fn open(path: &str) -> SimResult<Self> {
        if path == ":memory:" {
            return Self::in_memory();
        }
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(
        &self,
        run_id: &str,
        seed: u64,
        version: &str,
        config: &SimConfig,
    ) -> SimResult<()> {
        let config_json = serde_json::to_string(config)?;
        let started_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO run (run_id, seed, version, config_json, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![run_id, seed as i64, version, config_json, started_at],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> SimResult<RunRecord> {
        let row = self
            .conn
            .query_row(
                "SELECT run_id, seed, version, config_json, started_at
                 FROM run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let (run_id, seed, version, config_json, started_at) =
            row.ok_or_else(|| SimError::RunNotFound { run_id: run_id.to_string() })?;

        Ok(RunRecord {
            run_id,
            seed: seed as u64,
            version,
            config: serde_json::from_str(&config_json)?,
            started_at,
        })
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, trial, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.run_id,
                entry.trial as i64,
                entry.event_type,
                entry.payload,
            ],
        )?;
        Ok(())
    }

    pub fn events_for_trial(&self, run_id: &str, trial: Trial) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, trial, event_type, payload
             FROM event_log WHERE run_id = ?1 AND trial = ?2
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id, trial as i64], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    trial:      row.get::<_, i64>(2)? as u64,
                    event_type: row.get(3)?,
                    payload:    row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Count events of one type for a run.
    pub fn event_count(&self, run_id: &str, event_type: &str) -> SimResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, snapshot: &SimSnapshot) -> SimResult<()> {
        let json = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO snapshot (run_id, trial, state_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(run_id, trial) DO UPDATE SET state_json = excluded.state_json",
            params![snapshot.run_id, snapshot.trial as i64, json],
        )?;
        Ok(())
    }

    pub fn latest_snapshot(&self, run_id: &str) -> SimResult<Option<SimSnapshot>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM snapshot
                 WHERE run_id = ?1
                 ORDER BY trial DESC LIMIT 1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(SimError::from))
            .transpose()
    }

    pub fn snapshot_count(&self, run_id: &str) -> SimResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM snapshot WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    // ── Summary ────────────────────────────────────────────────

    pub fn save_summary(&self, run_id: &str, summary: &ChurnSummary) -> SimResult<()> {
        let json = serde_json::to_string(summary)?;
        self.conn.execute(
            "INSERT INTO run_summary (run_id, trials, summary_json) VALUES (?1, ?2, ?3)
             ON CONFLICT(run_id) DO UPDATE SET
                trials = excluded.trials,
                summary_json = excluded.summary_json",
            params![run_id, summary.trials as i64, json],
        )?;
        Ok(())
    }

    pub fn load_summary(&self, run_id: &str) -> SimResult<Option<ChurnSummary>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT summary_json FROM run_summary WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(SimError::from))
            .transpose()
    }
}
