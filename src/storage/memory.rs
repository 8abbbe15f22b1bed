//! In-memory table store implementation using `DashMap`.
//!
//! This is the default backend - data is lost on process restart.
//! For persistence, use [`ParquetTableStore`](super::ParquetTableStore).

use super::{validate_identifier, Table, TableStore};
use crate::{Error, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory table store using a lock-free concurrent hashmap.
///
/// Each append holds the shard lock of its table for the whole batch, so a
/// concurrent scan sees either none or all of the batch's rows.
///
/// # Example
///
/// ```rust
/// use soup_scope::storage::{MemoryTableStore, TableStore};
/// use arrow::datatypes::{DataType, Field, Schema};
/// use std::sync::Arc;
///
/// # fn main() -> soup_scope::Result<()> {
/// let store = MemoryTableStore::new();
/// let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
/// store.create_table("numbers", schema)?;
/// assert_eq!(store.list_tables()?, vec!["numbers".to_string()]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryTableStore {
    tables: DashMap<String, Table>,
}

impl MemoryTableStore {
    /// Create a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Get the number of tables in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the store holds no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Drop every table.
    pub fn clear(&self) {
        self.tables.clear();
    }
}

impl Default for MemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore for MemoryTableStore {
    fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.key().clone()).collect();
        names.sort_unstable();
        Ok(names)
    }

    fn table_schema(&self, name: &str) -> Result<Option<SchemaRef>> {
        validate_identifier(name)?;
        Ok(self.tables.get(name).map(|t| t.schema()))
    }

    fn create_table(&self, name: &str, schema: SchemaRef) -> Result<()> {
        validate_identifier(name)?;
        match self.tables.entry(name.to_string()) {
            Entry::Occupied(_) => Err(Error::StorageError(format!(
                "table '{name}' already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Table::new(schema));
                Ok(())
            }
        }
    }

    fn append(&self, name: &str, batch: RecordBatch) -> Result<()> {
        validate_identifier(name)?;
        let mut table = self.tables.get_mut(name).ok_or_else(|| Error::NotFound {
            table: name.to_string(),
        })?;
        table.append_batch(name, batch)
    }

    fn scan(&self, name: &str) -> Result<Vec<RecordBatch>> {
        validate_identifier(name)?;
        self.tables
            .get(name)
            .map(|t| t.batches().to_vec())
            .ok_or_else(|| Error::NotFound {
                table: name.to_string(),
            })
    }

    fn drop_table(&self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        self.tables.remove(name);
        Ok(())
    }
}
