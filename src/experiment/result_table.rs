//! Result Table - persisted rows of one experiment run

use super::table_name::{table_name_of, RunId};
use crate::storage::{describe_schema, schemas_compatible, TableStore};
use crate::{Error, Result};
use arrow::array::{Array, AsArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Int64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Surrogate key column, assigned on append and strictly increasing.
pub const ID_COLUMN: &str = "id";
/// Caller-supplied tag for the simulation pass that produced the row.
pub const SERIES_NUMBER_COLUMN: &str = "series_number";
/// Expression text, never empty.
pub const EXPRESSION_COLUMN: &str = "expression";

/// Fixed shape of every experiment table.
#[must_use]
pub fn result_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(ID_COLUMN, DataType::Int64, false),
        Field::new(SERIES_NUMBER_COLUMN, DataType::Int64, false),
        Field::new(EXPRESSION_COLUMN, DataType::Utf8, false),
    ]))
}

/// One stored expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    id: i64,
    series_number: u32,
    expression: String,
}

impl ResultRow {
    /// Surrogate key assigned by the store.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    /// Series number the row was appended under.
    #[must_use]
    pub const fn series_number(&self) -> u32 {
        self.series_number
    }

    /// Stored expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

/// Check an append request without touching the store.
///
/// # Errors
/// Returns [`Error::Write`] if `series_number` is zero or any expression is empty
pub fn validate_append<E: AsRef<str>>(series_number: u32, expressions: &[E]) -> Result<()> {
    if series_number == 0 {
        return Err(Error::Write(
            "series number must be a positive integer".to_string(),
        ));
    }
    if let Some(index) = expressions.iter().position(|e| e.as_ref().is_empty()) {
        return Err(Error::Write(format!(
            "expression at position {index} is empty"
        )));
    }
    Ok(())
}

/// Handle on the table `experiment_<id>` inside a [`TableStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    run_id: RunId,
    name: String,
}

impl ResultTable {
    /// Handle for the given run. Does not touch the store.
    #[must_use]
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            name: table_name_of(run_id),
        }
    }

    /// Run this table belongs to.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Backing table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create the table. Idempotent if it already exists with the right shape.
    ///
    /// # Errors
    /// Returns [`Error::Schema`] if a table with this name has another shape
    pub fn create<S: TableStore + ?Sized>(&self, store: &S) -> Result<()> {
        let expected = result_schema();
        match store.table_schema(&self.name)? {
            Some(existing) if schemas_compatible(&existing, &expected) => {
                debug!(table = %self.name, "result table already present");
                Ok(())
            }
            Some(existing) => Err(Error::Schema {
                table: self.name.clone(),
                expected: describe_schema(&expected),
                found: describe_schema(&existing),
            }),
            None => {
                store.create_table(&self.name, expected)?;
                debug!(table = %self.name, "result table created");
                Ok(())
            }
        }
    }

    /// Append one row per expression, in input order, all tagged with
    /// `series_number`. Returns the number of rows written.
    ///
    /// Nothing is written unless every expression is valid.
    ///
    /// # Errors
    /// - [`Error::Write`] if an expression is empty, `series_number` is zero,
    ///   or the backend append fails
    /// - [`Error::NotFound`] if the table does not exist
    /// - [`Error::Schema`] if the table has another shape
    pub fn append<S, E>(&self, store: &S, series_number: u32, expressions: &[E]) -> Result<usize>
    where
        S: TableStore + ?Sized,
        E: AsRef<str>,
    {
        validate_append(series_number, expressions)?;
        self.check_shape(store)?;

        if expressions.is_empty() {
            return Ok(0);
        }

        let count = i64::try_from(expressions.len())
            .map_err(|_| Error::Write("too many expressions in one append".to_string()))?;
        let first_id = self.max_id(store)? + 1;

        let batch = RecordBatch::try_new(
            result_schema(),
            vec![
                Arc::new(Int64Array::from_iter_values(first_id..first_id + count)),
                Arc::new(Int64Array::from_iter_values(
                    std::iter::repeat(i64::from(series_number)).take(expressions.len()),
                )),
                Arc::new(StringArray::from_iter_values(
                    expressions.iter().map(|e| e.as_ref()),
                )),
            ],
        )?;

        store.append(&self.name, batch).map_err(|err| match err {
            Error::NotFound { .. } | Error::Schema { .. } | Error::Write(_) => err,
            other => Error::Write(format!("append to '{}' failed: {other}", self.name)),
        })?;

        debug!(table = %self.name, rows = expressions.len(), series_number, "rows appended");
        Ok(expressions.len())
    }

    /// Read every row in insertion order.
    ///
    /// # Errors
    /// - [`Error::NotFound`] if the table does not exist
    /// - [`Error::Schema`] if the table has another shape
    pub fn read_all<S: TableStore + ?Sized>(&self, store: &S) -> Result<Vec<ResultRow>> {
        self.check_shape(store)?;
        let batches = store.scan(&self.name)?;
        let mut rows = Vec::with_capacity(batches.iter().map(RecordBatch::num_rows).sum());
        for batch in &batches {
            self.decode_into(batch, &mut rows)?;
        }
        Ok(rows)
    }

    fn check_shape<S: TableStore + ?Sized>(&self, store: &S) -> Result<()> {
        let expected = result_schema();
        let existing = store
            .table_schema(&self.name)?
            .ok_or_else(|| Error::NotFound {
                table: self.name.clone(),
            })?;
        if schemas_compatible(&existing, &expected) {
            Ok(())
        } else {
            Err(Error::Schema {
                table: self.name.clone(),
                expected: describe_schema(&expected),
                found: describe_schema(&existing),
            })
        }
    }

    fn max_id<S: TableStore + ?Sized>(&self, store: &S) -> Result<i64> {
        let mut max = 0;
        for batch in store.scan(&self.name)? {
            let ids = self.int_column(&batch, ID_COLUMN)?;
            if let Some(batch_max) = ids.iter().flatten().max() {
                max = max.max(batch_max);
            }
        }
        Ok(max)
    }

    fn int_column<'a>(&self, batch: &'a RecordBatch, column: &str) -> Result<&'a Int64Array> {
        batch
            .column_by_name(column)
            .and_then(|c| c.as_primitive_opt::<Int64Type>())
            .ok_or_else(|| self.shape_error(batch))
    }

    fn decode_into(&self, batch: &RecordBatch, rows: &mut Vec<ResultRow>) -> Result<()> {
        let ids = self.int_column(batch, ID_COLUMN)?;
        let series = self.int_column(batch, SERIES_NUMBER_COLUMN)?;
        let expressions = batch
            .column_by_name(EXPRESSION_COLUMN)
            .and_then(|c| c.as_string_opt::<i32>())
            .ok_or_else(|| self.shape_error(batch))?;

        for i in 0..batch.num_rows() {
            if ids.is_null(i) || series.is_null(i) || expressions.is_null(i) {
                return Err(Error::StorageError(format!(
                    "table '{}' holds a null value in row {i}",
                    self.name
                )));
            }
            let series_number = u32::try_from(series.value(i)).map_err(|_| {
                Error::StorageError(format!(
                    "table '{}' holds series number {} outside the u32 range",
                    self.name,
                    series.value(i)
                ))
            })?;
            rows.push(ResultRow {
                id: ids.value(i),
                series_number,
                expression: expressions.value(i).to_string(),
            });
        }
        Ok(())
    }

    fn shape_error(&self, batch: &RecordBatch) -> Error {
        Error::Schema {
            table: self.name.clone(),
            expected: describe_schema(&result_schema()),
            found: describe_schema(&batch.schema()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTableStore;

    fn table(n: u64) -> ResultTable {
        ResultTable::new(RunId::new(n).unwrap())
    }

    #[test]
    fn test_create_is_idempotent() {
        let store = MemoryTableStore::new();
        let t = table(1);
        t.create(&store).unwrap();
        t.append(&store, 1, &["ab"]).unwrap();
        t.create(&store).unwrap();

        assert_eq!(t.read_all(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_create_incompatible_shape() {
        let store = MemoryTableStore::new();
        let other = Arc::new(Schema::new(vec![Field::new("x", DataType::Utf8, false)]));
        store.create_table("experiment_1", other).unwrap();

        let err = table(1).create(&store).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
        assert!(err.to_string().contains("experiment_1"));
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let store = MemoryTableStore::new();
        let t = table(3);
        t.create(&store).unwrap();
        t.append(&store, 1, &["a", "b"]).unwrap();
        t.append(&store, 2, &["c"]).unwrap();

        let rows = t.read_all(&store).unwrap();
        let ids: Vec<i64> = rows.iter().map(ResultRow::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(rows[2].series_number(), 2);
        assert_eq!(rows[2].expression(), "c");
    }

    #[test]
    fn test_append_empty_expression_writes_nothing() {
        let store = MemoryTableStore::new();
        let t = table(1);
        t.create(&store).unwrap();
        t.append(&store, 1, &["keep"]).unwrap();

        let err = t.append(&store, 1, &["ok", ""]).unwrap_err();
        assert!(matches!(err, Error::Write(_)));
        assert!(err.to_string().contains("position 1"));

        let rows = t.read_all(&store).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].expression(), "keep");
    }

    #[test]
    fn test_append_zero_series_number() {
        let store = MemoryTableStore::new();
        let t = table(1);
        t.create(&store).unwrap();
        assert!(matches!(
            t.append(&store, 0, &["x"]).unwrap_err(),
            Error::Write(_)
        ));
    }

    #[test]
    fn test_append_missing_table() {
        let store = MemoryTableStore::new();
        assert!(matches!(
            table(9).append(&store, 1, &["x"]).unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[test]
    fn test_read_all_missing_table() {
        let store = MemoryTableStore::new();
        assert!(matches!(
            table(9).read_all(&store).unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[test]
    fn test_append_nothing_is_noop() {
        let store = MemoryTableStore::new();
        let t = table(1);
        t.create(&store).unwrap();
        let empty: [&str; 0] = [];
        assert_eq!(t.append(&store, 1, &empty).unwrap(), 0);
        assert!(t.read_all(&store).unwrap().is_empty());
    }
}
