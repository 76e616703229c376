//! churn-sim: headless runner for the player churn simulation.
//!
//! Usage:
//!   churn-sim
//!   churn-sim --seed 12345 --trials 1000 --db run.db
//!   churn-sim --config churn.json --json

use anyhow::Result;
use clap::Parser;
use levelchurn_core::{
    config::SimConfig,
    engine::SimEngine,
    simulation::TrialOutcome,
    stats::ChurnSummary,
    store::SimStore,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "churn-sim", version, about = "Simulate player churn across game levels")]
struct Args {
    /// Master seed. A fresh one is drawn when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of independent trials to run.
    #[arg(long, default_value_t = 1)]
    trials: u64,

    /// JSON file overriding the default grid and ranges.
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database for the event log and summary.
    #[arg(long, default_value = ":memory:")]
    db: String,

    /// Print the final summary as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    let run_uuid = uuid::Uuid::new_v4();
    let seed = args.seed.unwrap_or_else(|| run_uuid.as_u64_pair().0);
    let run_id = format!("run-{seed}-{}", run_uuid.simple());

    if !args.json {
        println!("churn-sim");
        println!("  seed:      {seed}");
        println!("  trials:    {}", args.trials);
        println!("  grid:      {} levels x {} players", config.num_levels, config.num_players);
        println!("  db:        {}", args.db);
        println!();
    }

    let store = SimStore::open(&args.db)?;
    store.migrate()?;
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"), &config)?;

    let mut engine = SimEngine::new(run_id.clone(), seed, config, store)?;
    engine.run_trials(args.trials)?;
    let summary = engine.finish()?.clone();
    log::info!("run={run_id} summary saved to {}", args.db);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if args.trials == 1 {
            if let Some(outcome) = engine.last_outcome() {
                print_trial(outcome);
            }
        }
        print_summary(&run_id, &summary);
    }

    println!("Simulation end.");
    Ok(())
}

fn print_trial(outcome: &TrialOutcome) {
    println!("=== TRIAL {} ===", outcome.trial);
    println!("  level | threshold | base | simulated activity        | churned");
    for level in 0..outcome.simulated_activity.rows() {
        let activity = outcome
            .simulated_activity
            .row(level)
            .iter()
            .map(|v| format!("{v:>3}"))
            .collect::<Vec<_>>()
            .join("");
        println!(
            "  {level:>5} | {:>9} | {:>4} | {activity} | {}",
            outcome.thresholds.row(level)[0],
            outcome.base_activity.row(level)[0],
            if outcome.churned_levels[level] { "yes" } else { "no" },
        );
    }
    let churned: Vec<String> = outcome
        .churned_players
        .iter()
        .enumerate()
        .filter(|(_, c)| **c)
        .map(|(p, _)| p.to_string())
        .collect();
    println!("  churned players: [{}]", churned.join(", "));
    println!();
}

fn print_summary(run_id: &str, summary: &ChurnSummary) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:            {run_id}");
    println!("  trials:            {}", summary.trials);
    println!("  player churn rate: {:.3}", summary.overall_player_churn_rate());
    println!();
    println!("  level | churn freq | mean threshold | mean base | mean activity");
    let freq = summary.level_churn_frequency();
    let thresholds = summary.mean_threshold();
    let bases = summary.mean_base_activity();
    let activity = summary.mean_activity();
    for level in 0..freq.len() {
        println!(
            "  {level:>5} | {:>10.3} | {:>14.2} | {:>9.2} | {:>13.2}",
            freq[level], thresholds[level], bases[level], activity[level],
        );
    }
    println!();
    let players = summary
        .player_churn_frequency()
        .iter()
        .map(|f| format!("{f:.2}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!("  player churn freq: {players}");
    println!();
}
