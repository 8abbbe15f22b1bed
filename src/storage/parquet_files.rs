//! Directory-backed table store: one Parquet file per table.
//!
//! Appends rewrite the whole file into a hidden temporary sibling and rename
//! it over the original, so a reader never observes a half-written table.

use super::{validate_identifier, Table, TableStore};
use crate::{Error, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const EXTENSION: &str = "parquet";

/// Table store persisting each table as `<root>/<name>.parquet`.
#[derive(Debug, Clone)]
pub struct ParquetTableStore {
    root: PathBuf,
}

impl ParquetTableStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            Error::StorageError(format!(
                "Failed to create store directory {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    /// Directory holding the table files
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{EXTENSION}"))
    }

    fn load(&self, name: &str) -> Result<Table> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(Error::NotFound {
                table: name.to_string(),
            });
        }

        let file = File::open(&path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.build()?;

        let mut batches = Vec::new();
        for batch in reader {
            batches.push(batch?);
        }

        Ok(Table::from_parts(schema, batches))
    }

    fn write(&self, name: &str, schema: SchemaRef, batches: &[RecordBatch]) -> Result<()> {
        let tmp = self.root.join(format!(".{name}.{EXTENSION}.tmp"));

        let file = File::create(&tmp)?;
        let mut writer = ArrowWriter::try_new(file, schema, None)?;
        for batch in batches {
            writer.write(batch)?;
        }
        writer.close()?;

        fs::rename(&tmp, self.path_for(name))?;
        Ok(())
    }
}

impl TableStore for ParquetTableStore {
    fn list_tables(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_identifier(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    fn table_schema(&self, name: &str) -> Result<Option<SchemaRef>> {
        validate_identifier(name)?;
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        Ok(Some(builder.schema().clone()))
    }

    fn create_table(&self, name: &str, schema: SchemaRef) -> Result<()> {
        validate_identifier(name)?;
        if self.path_for(name).exists() {
            return Err(Error::StorageError(format!(
                "table '{name}' already exists"
            )));
        }
        self.write(name, schema, &[])
    }

    fn append(&self, name: &str, batch: RecordBatch) -> Result<()> {
        validate_identifier(name)?;
        let mut table = self.load(name)?;
        table.append_batch(name, batch)?;
        self.write(name, table.schema(), table.batches())
    }

    fn scan(&self, name: &str) -> Result<Vec<RecordBatch>> {
        validate_identifier(name)?;
        Ok(self.load(name)?.batches().to_vec())
    }

    fn drop_table(&self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
