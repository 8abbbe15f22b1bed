//! Experiment Store - enumerates, creates and reads experiment result tables
//!
//! Runs are numbered `1, 2, 3, ...` within one backing store. The id of a new
//! run is one past the highest id ever allocated: the highest listed table id,
//! or the id recorded in the one-row `run_sequence` table if that is larger
//! (so deleting the newest table out-of-band never frees its id).

use super::result_table::{validate_append, ResultRow, ResultTable};
use super::table_name::{parse_table_name, table_name_of, RunId};
use crate::storage::{schemas_compatible, MemoryTableStore, ParquetTableStore, TableStore};
use crate::{Error, Result};
use arrow::array::{AsArray, Int64Array};
use arrow::datatypes::{DataType, Field, Int64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Auxiliary one-row table holding the highest allocated run id.
pub const SEQUENCE_TABLE: &str = "run_sequence";
const SEQUENCE_COLUMN: &str = "last_id";

fn sequence_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![Field::new(
        SEQUENCE_COLUMN,
        DataType::Int64,
        false,
    )]))
}

/// Diagnostic summary of one stored run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Run identity
    pub run_id: RunId,
    /// Backing table name
    pub table_name: String,
    /// Number of stored expressions
    pub row_count: usize,
    /// Distinct series numbers present, ascending
    pub series_numbers: Vec<u32>,
}

/// Store of experiment runs over any [`TableStore`].
///
/// ## Single writer
///
/// [`persist_run`](Self::persist_run) takes `&mut self`, while every read
/// takes `&self`. Within one process the borrow checker therefore rules out
/// a write overlapping a read or another write. Separate processes sharing
/// one backing store are not coordinated.
#[derive(Debug)]
pub struct ExperimentStore<S> {
    backend: S,
}

impl ExperimentStore<MemoryTableStore> {
    /// Create a store backed by a fresh [`MemoryTableStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryTableStore::new())
    }
}

impl ExperimentStore<ParquetTableStore> {
    /// Open a store keeping one Parquet file per table under `dir`.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn open_parquet<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::new(ParquetTableStore::open(dir)?))
    }
}

impl<S: TableStore> ExperimentStore<S> {
    /// Wrap a backing table store.
    #[must_use]
    pub const fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Backing table store.
    #[must_use]
    pub const fn backend(&self) -> &S {
        &self.backend
    }

    /// Unwrap the backing table store.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.backend
    }

    /// Ids of every well-formed `experiment_<id>` table, ascending.
    ///
    /// Tables without the prefix are ignored; prefixed tables with a
    /// malformed suffix are logged and skipped.
    ///
    /// # Errors
    /// Returns error if the backend cannot list its tables
    pub fn list_run_ids(&self) -> Result<Vec<RunId>> {
        let mut ids = Vec::new();
        for name in self.backend.list_tables()? {
            match parse_table_name(&name) {
                Ok(Some(id)) => ids.push(id),
                Ok(None) => {}
                Err(err) => warn!(table = %name, %err, "skipping experiment table"),
            }
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    /// Id the next [`persist_run`](Self::persist_run) will allocate.
    ///
    /// `1` on an empty store.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read
    pub fn next_id(&self) -> Result<RunId> {
        self.next_id_after(self.high_water_mark()?)
    }

    fn next_id_after(&self, recorded: Option<RunId>) -> Result<RunId> {
        let listed = self.list_run_ids()?.last().copied();
        Ok(listed.max(recorded).map_or(RunId::FIRST, RunId::next))
    }

    /// Persist one run: allocate the next id, create its table and append
    /// every expression under `series_number`.
    ///
    /// Expressions are validated before an id is allocated. The run only
    /// counts once both its rows and the new high-water mark are written; if
    /// either fails the table is dropped again so no partially written run
    /// remains. Retry the whole call.
    ///
    /// # Errors
    /// - [`Error::Write`] on an empty expression, zero series number or failed append
    /// - [`Error::Schema`] if a table already occupies the allocated name with another shape
    pub fn persist_run<E: AsRef<str>>(
        &mut self,
        series_number: u32,
        expressions: &[E],
    ) -> Result<RunId> {
        validate_append(series_number, expressions)?;

        let recorded = self.high_water_mark()?;
        let run_id = self.next_id_after(recorded)?;
        let table = ResultTable::new(run_id);
        table.create(&self.backend)?;

        let written = table
            .append(&self.backend, series_number, expressions)
            .and_then(|_| self.replace_high_water_mark(run_id, recorded));
        if let Err(err) = written {
            if let Err(cleanup) = self.backend.drop_table(table.name()) {
                warn!(table = %table.name(), %cleanup, "failed to drop partially written run");
            }
            return Err(err);
        }

        info!(
            %run_id,
            rows = expressions.len(),
            series_number,
            "experiment run persisted"
        );
        Ok(run_id)
    }

    /// Read every row of a run in insertion order.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the run has no table
    pub fn load_run(&self, run_id: RunId) -> Result<Vec<ResultRow>> {
        ResultTable::new(run_id).read_all(&self.backend)
    }

    /// Drop a run's table. Its id is never handed out again.
    ///
    /// # Errors
    /// Returns error if the backend fails to drop the table
    pub fn delete_run(&self, run_id: RunId) -> Result<()> {
        self.backend.drop_table(&table_name_of(run_id))?;
        info!(%run_id, "experiment run deleted");
        Ok(())
    }

    /// Per-run row counts and series numbers, ascending by id.
    ///
    /// # Errors
    /// Returns error if any listed run cannot be read
    pub fn summarize(&self) -> Result<Vec<RunSummary>> {
        self.list_run_ids()?
            .into_iter()
            .map(|run_id| {
                let rows = self.load_run(run_id)?;
                let series: BTreeSet<u32> = rows.iter().map(ResultRow::series_number).collect();
                Ok(RunSummary {
                    run_id,
                    table_name: table_name_of(run_id),
                    row_count: rows.len(),
                    series_numbers: series.into_iter().collect(),
                })
            })
            .collect()
    }

    fn high_water_mark(&self) -> Result<Option<RunId>> {
        let Some(schema) = self.backend.table_schema(SEQUENCE_TABLE)? else {
            return Ok(None);
        };
        if !schemas_compatible(&schema, &sequence_schema()) {
            warn!(table = SEQUENCE_TABLE, "ignoring run sequence table with unexpected shape");
            return Ok(None);
        }

        let mut highest = None;
        for batch in self.backend.scan(SEQUENCE_TABLE)? {
            let Some(ids) = batch.column(0).as_primitive_opt::<Int64Type>() else {
                continue;
            };
            let batch_max = ids
                .iter()
                .flatten()
                .filter_map(|v| u64::try_from(v).ok().and_then(RunId::new))
                .max();
            highest = highest.max(batch_max);
        }
        Ok(highest)
    }

    /// Rewrite the mark to `run_id`. On failure the previous mark is put back
    /// so an interrupted rewrite cannot free an older id.
    fn replace_high_water_mark(&self, run_id: RunId, previous: Option<RunId>) -> Result<()> {
        let result = self.write_high_water_mark(run_id);
        if result.is_err() {
            if let Some(previous) = previous {
                if let Err(restore) = self.write_high_water_mark(previous) {
                    warn!(%previous, %restore, "failed to restore run id high-water mark");
                }
            }
        }
        result
    }

    fn write_high_water_mark(&self, run_id: RunId) -> Result<()> {
        let id = i64::try_from(run_id.get())
            .map_err(|_| Error::Write(format!("run id {run_id} exceeds i64 range")))?;
        let batch = RecordBatch::try_new(
            sequence_schema(),
            vec![Arc::new(Int64Array::from(vec![id]))],
        )?;
        self.backend.drop_table(SEQUENCE_TABLE)?;
        self.backend.create_table(SEQUENCE_TABLE, sequence_schema())?;
        self.backend.append(SEQUENCE_TABLE, batch)?;
        debug!(%run_id, table = SEQUENCE_TABLE, "high-water mark written");
        Ok(())
    }
}
