//! Named-table storage (Arrow `RecordBatch` tables)
//!
//! **Append-Only Design**:
//! - Every table is a fixed-shape sequence of Arrow batches
//! - Write pattern: whole-batch appends, no row updates, no in-place rewrites
//! - A table is reachable only by its name; there is no secondary index
//!
//! Backends:
//! - [`MemoryTableStore`]: `DashMap`-backed, process-local
//! - [`ParquetTableStore`]: one Parquet file per table inside a directory
//! - `SqliteTableStore` (feature `sqlite`): one SQL table per name in a single database file
//!
//! Toyota Way Principles:
//! - Poka-Yoke: appends are all-or-nothing, schema is validated before any row lands
//! - Jidoka: backend equivalence tests (memory == parquet == sqlite)

mod memory;
mod parquet_files;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use self::memory::MemoryTableStore;
pub use self::parquet_files::ParquetTableStore;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteTableStore;

use crate::{Error, Result};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

/// Synchronous store of named, fixed-shape tables.
///
/// Implementations must make [`append`](TableStore::append) atomic: after it
/// returns, either every row of the batch is visible to [`scan`](TableStore::scan)
/// or none is.
pub trait TableStore: Send + Sync {
    /// List every table name, ascending.
    ///
    /// # Errors
    /// Returns error if the backend cannot be enumerated
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Get the schema of a table, or `None` if it does not exist.
    ///
    /// # Errors
    /// Returns error if the name is invalid or the backend fails
    fn table_schema(&self, name: &str) -> Result<Option<SchemaRef>>;

    /// Create an empty table.
    ///
    /// # Errors
    /// Returns error if the name is invalid or a table with that name already exists
    fn create_table(&self, name: &str, schema: SchemaRef) -> Result<()>;

    /// Append one batch to an existing table.
    ///
    /// # Errors
    /// - [`Error::NotFound`] if the table does not exist
    /// - [`Error::Schema`] if the batch shape does not match the table
    fn append(&self, name: &str, batch: RecordBatch) -> Result<()>;

    /// Read every batch of a table in insertion order.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if the table does not exist
    fn scan(&self, name: &str) -> Result<Vec<RecordBatch>>;

    /// Drop a table. No-op if it does not exist.
    ///
    /// # Errors
    /// Returns error if the backend fails to remove an existing table
    fn drop_table(&self, name: &str) -> Result<()>;

    /// Check whether a table exists.
    ///
    /// # Errors
    /// Returns error if the backend fails
    fn contains_table(&self, name: &str) -> Result<bool> {
        Ok(self.table_schema(name)?.is_some())
    }
}

impl<T: TableStore + ?Sized> TableStore for Box<T> {
    fn list_tables(&self) -> Result<Vec<String>> {
        (**self).list_tables()
    }

    fn table_schema(&self, name: &str) -> Result<Option<SchemaRef>> {
        (**self).table_schema(name)
    }

    fn create_table(&self, name: &str, schema: SchemaRef) -> Result<()> {
        (**self).create_table(name, schema)
    }

    fn append(&self, name: &str, batch: RecordBatch) -> Result<()> {
        (**self).append(name, batch)
    }

    fn scan(&self, name: &str) -> Result<Vec<RecordBatch>> {
        (**self).scan(name)
    }

    fn drop_table(&self, name: &str) -> Result<()> {
        (**self).drop_table(name)
    }
}

/// In-memory representation of one table: a schema plus its appended batches.
#[derive(Debug, Clone)]
pub struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Create an empty table with the given shape
    #[must_use]
    pub const fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    /// Rebuild a table from batches already known to match `schema`
    pub(crate) const fn from_parts(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Table shape
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// All record batches, in insertion order
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of rows across all batches
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Append a batch (the ONLY supported write operation)
    ///
    /// The batch is re-labelled with the table's own schema so every stored
    /// batch carries an identical schema, whatever nullability or metadata the
    /// caller used. Empty batches are accepted and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if column names or types differ from the table
    pub fn append_batch(&mut self, table: &str, batch: RecordBatch) -> Result<()> {
        if !schemas_compatible(&self.schema, &batch.schema()) {
            return Err(Error::Schema {
                table: table.to_string(),
                expected: describe_schema(&self.schema),
                found: describe_schema(&batch.schema()),
            });
        }

        if batch.num_rows() == 0 {
            return Ok(());
        }

        let batch = RecordBatch::try_new(self.schema.clone(), batch.columns().to_vec())?;
        self.batches.push(batch);
        Ok(())
    }
}

/// Validate a table or column identifier: `[A-Za-z0-9_]+`.
///
/// # Errors
/// Returns [`Error::InvalidInput`] for empty names or names with other characters
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("table name must not be empty".to_string()));
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(Error::InvalidInput(format!(
            "table name '{name}' may only contain ASCII letters, digits and '_'"
        )));
    }
    Ok(())
}

/// Two schemas are compatible when they have the same column names and data
/// types in the same order. Nullability and metadata are ignored.
#[must_use]
pub fn schemas_compatible(a: &Schema, b: &Schema) -> bool {
    a.fields().len() == b.fields().len()
        && a
            .fields()
            .iter()
            .zip(b.fields().iter())
            .all(|(x, y)| x.name() == y.name() && x.data_type() == y.data_type())
}

/// Render a schema as `[name: Type, ...]` for error messages
#[must_use]
pub fn describe_schema(schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("{}: {}", f.name(), f.data_type()))
        .collect();
    format!("[{}]", columns.join(", "))
}

#[cfg(test)]
pub(crate) mod test_support {
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    pub fn pair_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("key", DataType::Int64, false),
            Field::new("label", DataType::Utf8, false),
        ]))
    }

    pub fn pair_batch(keys: &[i64], labels: &[&str]) -> RecordBatch {
        RecordBatch::try_new(
            pair_schema(),
            vec![
                Arc::new(Int64Array::from(keys.to_vec())),
                Arc::new(StringArray::from(labels.to_vec())),
            ],
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{pair_batch, pair_schema};
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field};
    use std::sync::Arc;

    #[test]
    fn test_append_batch_accumulates_rows() {
        let mut table = Table::new(pair_schema());
        table.append_batch("t", pair_batch(&[1, 2], &["a", "b"])).unwrap();
        table.append_batch("t", pair_batch(&[3], &["c"])).unwrap();

        assert_eq!(table.batches().len(), 2);
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn test_append_batch_schema_validation() {
        let mut table = Table::new(pair_schema());

        let other = Arc::new(Schema::new(vec![Field::new(
            "different_field",
            DataType::Int64,
            false,
        )]));
        let batch =
            RecordBatch::try_new(other, vec![Arc::new(Int64Array::from(vec![1, 2, 3]))]).unwrap();

        let err = table.append_batch("t", batch).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
        assert_eq!(table.num_rows(), 0);
    }

    #[test]
    fn test_append_empty_batch_is_dropped() {
        let mut table = Table::new(pair_schema());
        table.append_batch("t", pair_batch(&[], &[])).unwrap();
        assert!(table.batches().is_empty());
    }

    #[test]
    fn test_schemas_compatible_ignores_nullability() {
        let nullable = Schema::new(vec![
            Field::new("key", DataType::Int64, true),
            Field::new("label", DataType::Utf8, true),
        ]);
        assert!(schemas_compatible(&pair_schema(), &nullable));

        let reordered = Schema::new(vec![
            Field::new("label", DataType::Utf8, false),
            Field::new("key", DataType::Int64, false),
        ]);
        assert!(!schemas_compatible(&pair_schema(), &reordered));
    }

    #[test]
    fn test_describe_schema() {
        assert_eq!(describe_schema(&pair_schema()), "[key: Int64, label: Utf8]");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("experiment_12").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("experiment 1").is_err());
        assert!(validate_identifier("x\"; DROP TABLE y").is_err());
    }
}
