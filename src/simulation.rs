//! Simulation collaborator contract
//!
//! The expression-soup engine is external. This module fixes how it is called
//! and how its output becomes a stored run: the engine runs to completion
//! first, then its final expressions are persisted as series
//! [`SIMULATION_SERIES`] of a new run.

use crate::experiment::{ExperimentStore, RunId};
use crate::storage::TableStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Series number the engine's final population is stored under.
pub const SIMULATION_SERIES: u32 = 1;

/// Parameters handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationRequest {
    /// Population size cap
    pub limit: usize,
    /// Initial expressions
    pub seed_expressions: Vec<String>,
    /// Step budget
    pub steps: usize,
}

impl Default for SimulationRequest {
    fn default() -> Self {
        Self {
            limit: 100,
            seed_expressions: [r"\x.x", r"\x.\y.x", r"\x.\y.\z.x z (y z)"]
                .map(String::from)
                .to_vec(),
            steps: 100,
        }
    }
}

/// What the engine reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    /// Steps actually run, possibly fewer than requested
    pub steps_run: usize,
    /// Final population
    pub final_expressions: Vec<String>,
}

/// A blocking simulation engine.
///
/// Any `FnMut(&SimulationRequest) -> Result<SimulationOutcome>` closure is one.
pub trait SoupEngine {
    /// Run to completion.
    ///
    /// # Errors
    /// Returns [`Error::Simulation`] (or any other error) if the run fails
    fn run(&mut self, request: &SimulationRequest) -> Result<SimulationOutcome>;
}

impl<F> SoupEngine for F
where
    F: FnMut(&SimulationRequest) -> Result<SimulationOutcome>,
{
    fn run(&mut self, request: &SimulationRequest) -> Result<SimulationOutcome> {
        self(request)
    }
}

/// Receipt for a recorded simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedRun {
    /// Id of the new run
    pub run_id: RunId,
    /// Steps the engine ran
    pub steps_run: usize,
    /// Expressions stored
    pub row_count: usize,
    /// When persisting finished
    pub completed_at: DateTime<Utc>,
}

/// Run the engine, then persist its final population as a new run.
///
/// # Errors
/// - The engine's own error if the simulation fails (nothing is written)
/// - [`Error::PersistFailed`] if storing fails; it carries the step count so
///   the caller learns how far the simulation got
pub fn record_simulation<S, E>(
    store: &mut ExperimentStore<S>,
    engine: &mut E,
    request: &SimulationRequest,
) -> Result<PersistedRun>
where
    S: TableStore,
    E: SoupEngine + ?Sized,
{
    let outcome = engine.run(request)?;
    info!(
        steps_run = outcome.steps_run,
        requested = request.steps,
        population = outcome.final_expressions.len(),
        "simulation finished"
    );

    let run_id = store
        .persist_run(SIMULATION_SERIES, &outcome.final_expressions)
        .map_err(|source| {
            error!(steps_run = outcome.steps_run, %source, "failed to persist simulation");
            Error::PersistFailed {
                steps_run: outcome.steps_run,
                source: Box::new(source),
            }
        })?;

    Ok(PersistedRun {
        run_id,
        steps_run: outcome.steps_run,
        row_count: outcome.final_expressions.len(),
        completed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(request: &SimulationRequest) -> Result<SimulationOutcome> {
        Ok(SimulationOutcome {
            steps_run: request.steps,
            final_expressions: request.seed_expressions.clone(),
        })
    }

    #[test]
    fn test_default_request() {
        let request = SimulationRequest::default();
        assert_eq!(request.limit, 100);
        assert_eq!(request.steps, 100);
        assert_eq!(request.seed_expressions.len(), 3);
        assert_eq!(request.seed_expressions[0], r"\x.x");
    }

    #[test]
    fn test_record_simulation() {
        let mut store = ExperimentStore::in_memory();
        let mut engine = echo;
        let run = record_simulation(&mut store, &mut engine, &SimulationRequest::default()).unwrap();

        assert_eq!(run.run_id, RunId::FIRST);
        assert_eq!(run.steps_run, 100);
        assert_eq!(run.row_count, 3);

        let rows = store.load_run(run.run_id).unwrap();
        assert!(rows.iter().all(|r| r.series_number() == SIMULATION_SERIES));
        assert_eq!(rows[2].expression(), r"\x.\y.\z.x z (y z)");
    }

    #[test]
    fn test_engine_failure_writes_nothing() {
        let mut store = ExperimentStore::in_memory();
        let mut engine =
            |_: &SimulationRequest| -> Result<SimulationOutcome> { Err(Error::Simulation("diverged".into())) };
        let err = record_simulation(&mut store, &mut engine, &SimulationRequest::default()).unwrap_err();
        assert!(matches!(err, Error::Simulation(_)));
        assert!(store.list_run_ids().unwrap().is_empty());
    }

    #[test]
    fn test_persist_failure_reports_steps() {
        let mut store = ExperimentStore::in_memory();
        let mut engine = |_: &SimulationRequest| -> Result<SimulationOutcome> {
            Ok(SimulationOutcome {
                steps_run: 42,
                final_expressions: vec!["ok".to_string(), String::new()],
            })
        };
        let err = record_simulation(&mut store, &mut engine, &SimulationRequest::default()).unwrap_err();
        assert_eq!(err.steps_run(), Some(42));
        assert!(matches!(err, Error::PersistFailed { .. }));
        assert!(store.list_run_ids().unwrap().is_empty());
    }
}
