//! The simulation engine: runs trials, logs events, keeps the summary.
//!
//! RULES:
//!   - Trials are numbered from 1. Trial 0 holds run-level events.
//!   - Every trial draws only from its own RngBank streams.
//!   - All outcomes are recorded in the event log.
//!   - Same seed and config ⇒ byte-identical event log.

use crate::{
    config::SimConfig,
    error::SimResult,
    event::{EventLogEntry, SimEvent},
    rng::RngBank,
    simulation::{ChurnSimulation, TrialOutcome},
    snapshot::SimSnapshot,
    stats::ChurnSummary,
    store::SimStore,
    types::{RunId, Trial},
};

pub struct SimEngine {
    pub run_id:   RunId,
    pub rng_bank: RngBank,
    simulation:   ChurnSimulation,
    store:        SimStore,
    summary:      ChurnSummary,
    trials_run:   Trial,
    last_outcome: Option<TrialOutcome>,
}

impl SimEngine {
    pub fn new(run_id: RunId, seed: u64, config: SimConfig, store: SimStore) -> SimResult<Self> {
        let summary = ChurnSummary::new(config.num_levels, config.num_players);
        Ok(Self {
            run_id,
            rng_bank: RngBank::new(seed),
            simulation: ChurnSimulation::new(config)?,
            store,
            summary,
            trials_run: 0,
            last_outcome: None,
        })
    }

    /// Engine over a migrated in-memory store with the run row inserted.
    pub fn build_test(run_id: RunId, seed: u64, config: SimConfig) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, "0.1.0-test", &config)?;
        Self::new(run_id, seed, config, store)
    }

    pub fn config(&self) -> &SimConfig {
        self.simulation.config()
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    pub fn summary(&self) -> &ChurnSummary {
        &self.summary
    }

    pub fn trials_run(&self) -> Trial {
        self.trials_run
    }

    /// The most recent trial's full outcome.
    pub fn last_outcome(&self) -> Option<&TrialOutcome> {
        self.last_outcome.as_ref()
    }

    /// Run one trial. This is the core simulation step.
    pub fn trial(&mut self) -> SimResult<&TrialOutcome> {
        let trial = self.trials_run + 1;
        let outcome = self.simulation.run_trial(&self.rng_bank, trial)?;

        for (player, churned) in outcome.churned_players.iter().enumerate() {
            if !churned {
                continue;
            }
            if let Some(first_level) = outcome.first_churn_level(player) {
                self.log_event(trial, &SimEvent::PlayerChurned { trial, player, first_level })?;
            }
        }
        for (level, churned) in outcome.churned_levels.iter().enumerate() {
            if *churned {
                let first_player = outcome.first_exceeding[level];
                self.log_event(trial, &SimEvent::LevelChurned { trial, level, first_player })?;
            }
        }
        self.log_event(
            trial,
            &SimEvent::TrialCompleted {
                trial,
                churned_players: outcome.churned_player_count(),
                churned_levels:  outcome.churned_level_count(),
            },
        )?;

        self.summary.record(&outcome)?;
        self.trials_run = trial;

        // Snapshot every snapshot_interval trials.
        if trial.is_multiple_of(self.config().snapshot_interval) {
            self.take_snapshot()?;
        }

        Ok(&*self.last_outcome.insert(outcome))
    }

    /// Run n trials in a loop.
    pub fn run_trials(&mut self, n: u64) -> SimResult<()> {
        // Emit RunInitialized at trial 0 so seed differences are observable.
        if self.trials_run == 0 {
            let init = SimEvent::RunInitialized {
                run_id:  self.run_id.clone(),
                seed:    self.rng_bank.master_seed(),
                levels:  self.config().num_levels,
                players: self.config().num_players,
            };
            self.log_event(0, &init)?;
        }
        for _ in 0..n {
            self.trial()?;
        }
        log::info!(
            "run={} churn: {} trials complete (player churn rate={:.3})",
            self.run_id,
            self.trials_run,
            self.summary.overall_player_churn_rate(),
        );
        Ok(())
    }

    /// Close the run: log RunCompleted and persist the summary.
    pub fn finish(&mut self) -> SimResult<&ChurnSummary> {
        let done = SimEvent::RunCompleted {
            trials:            self.trials_run,
            player_churn_rate: self.summary.overall_player_churn_rate(),
        };
        self.log_event(self.trials_run, &done)?;
        self.store.save_summary(&self.run_id, &self.summary)?;
        Ok(&self.summary)
    }

    /// Query events for a specific trial from the store.
    /// Used by the determinism test.
    pub fn store_events_for_trial(&self, trial: Trial) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_trial(&self.run_id, trial)
    }

    fn log_event(&self, trial: Trial, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            trial,
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    fn take_snapshot(&self) -> SimResult<()> {
        let snapshot = SimSnapshot {
            run_id:  self.run_id.clone(),
            trial:   self.trials_run,
            summary: self.summary.clone(),
        };
        self.store.save_snapshot(&snapshot)?;
        log::debug!("Snapshot saved at trial {}", self.trials_run);
        Ok(())
    }
}
