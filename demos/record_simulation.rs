//! Record Simulation: persisting soup runs as numbered experiments
//!
//! Drives a toy engine through the simulation contract and stores each final
//! population as a new `experiment_<id>` table.
//!
//! Run with: cargo run --example record_simulation [-- config.json]
//!
//! Set `RUST_LOG=soup_scope=debug` to watch table creation.

use anyhow::Context;
use soup_scope::config::ExplorerConfig;
use soup_scope::simulation::{record_simulation, SimulationOutcome, SimulationRequest};
use soup_scope::Explorer;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Toy engine: each step applies every expression to its neighbour.
fn toy_soup(request: &SimulationRequest) -> soup_scope::Result<SimulationOutcome> {
    let mut population = request.seed_expressions.clone();
    let mut steps_run = 0;
    for _ in 0..request.steps {
        if population.len() >= request.limit || population.is_empty() {
            break;
        }
        let next = format!(
            "({}) ({})",
            population[steps_run % population.len()],
            population[(steps_run + 1) % population.len()]
        );
        population.push(next);
        steps_run += 1;
    }
    Ok(SimulationOutcome {
        steps_run,
        final_expressions: population,
    })
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => ExplorerConfig::from_path(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => ExplorerConfig::default(),
    };
    let mut explorer = Explorer::open(&config).context("opening experiment store")?;

    println!("=== Soup-Scope: Recording Simulations ===\n");

    let mut engine = toy_soup;
    for steps in [5, 20, 60] {
        let request = SimulationRequest {
            steps,
            ..SimulationRequest::default()
        };
        let run = record_simulation(explorer.store_mut(), &mut engine, &request)
            .with_context(|| format!("recording a {steps}-step simulation"))?;
        println!(
            "  {}: {} steps, {} expressions, completed {}",
            run.run_id.table_name(),
            run.steps_run,
            run.row_count,
            run.completed_at.to_rfc3339()
        );
    }

    println!("\nStored runs:");
    for summary in explorer.store().summarize()? {
        println!(
            "  {:<16} rows={:<4} series={:?}",
            summary.table_name, summary.row_count, summary.series_numbers
        );
    }
    println!("\nNext run id: {}", explorer.store().next_id()?);

    Ok(())
}
