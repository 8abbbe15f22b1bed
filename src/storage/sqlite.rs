//! SQLite table store: one SQL table per name inside a single database file.
//!
//! Only `Int64`, `Float64` and `Utf8` columns are supported; they map to
//! `INTEGER`, `REAL` and `TEXT`. Appends run in a single transaction.

use super::{describe_schema, schemas_compatible, validate_identifier, TableStore};
use crate::{Error, Result};
use arrow::array::{ArrayRef, AsArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Table store backed by a `SQLite` database.
#[derive(Debug)]
pub struct SqliteTableStore {
    conn: Mutex<Connection>,
}

impl SqliteTableStore {
    /// Open (creating if needed) a database file.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open(path)?),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns error if `SQLite` cannot allocate the database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StorageError("sqlite connection mutex poisoned".to_string()))
    }

    fn require_schema(&self, name: &str) -> Result<SchemaRef> {
        self.table_schema(name)?.ok_or_else(|| Error::NotFound {
            table: name.to_string(),
        })
    }
}

fn sql_type(data_type: &DataType) -> Result<&'static str> {
    match data_type {
        DataType::Int64 => Ok("INTEGER"),
        DataType::Float64 => Ok("REAL"),
        DataType::Utf8 => Ok("TEXT"),
        other => Err(Error::InvalidInput(format!(
            "column type {other} is not supported by the sqlite store"
        ))),
    }
}

fn arrow_type(declared: &str) -> Result<DataType> {
    let declared = declared.to_ascii_uppercase();
    if declared.contains("INT") {
        Ok(DataType::Int64)
    } else if declared.contains("CHAR") || declared.contains("TEXT") || declared.contains("CLOB") {
        Ok(DataType::Utf8)
    } else if declared.contains("REAL") || declared.contains("FLOA") || declared.contains("DOUB") {
        Ok(DataType::Float64)
    } else {
        Err(Error::StorageError(format!(
            "unsupported sqlite column type '{declared}'"
        )))
    }
}

fn column_list(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| format!("\"{}\"", f.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every row of a `SELECT` as owned values, `width` columns each.
fn select_rows(conn: &Connection, sql: &str, width: usize) -> Result<Vec<Vec<Value>>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<std::result::Result<Vec<_>, _>>()
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn cell(column: &ArrayRef, row: usize) -> Result<Value> {
    if column.is_null(row) {
        return Ok(Value::Null);
    }
    match column.data_type() {
        DataType::Int64 => Ok(Value::Integer(column.as_primitive::<Int64Type>().value(row))),
        DataType::Float64 => Ok(Value::Real(column.as_primitive::<Float64Type>().value(row))),
        DataType::Utf8 => Ok(Value::Text(column.as_string::<i32>().value(row).to_string())),
        other => Err(Error::InvalidInput(format!(
            "column type {other} is not supported by the sqlite store"
        ))),
    }
}

fn build_column(field: &Field, rows: &[Vec<Value>], idx: usize) -> Result<ArrayRef> {
    let mismatch = |v: &Value| {
        Error::StorageError(format!(
            "column '{}' holds {v:?}, expected {}",
            field.name(),
            field.data_type()
        ))
    };

    let array: ArrayRef = match field.data_type() {
        DataType::Int64 => Arc::new(
            rows.iter()
                .map(|r| match &r[idx] {
                    Value::Integer(v) => Ok(Some(*v)),
                    Value::Null => Ok(None),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Int64Array>>()?,
        ),
        DataType::Float64 => Arc::new(
            rows.iter()
                .map(|r| match &r[idx] {
                    Value::Real(v) => Ok(Some(*v)),
                    #[allow(clippy::cast_precision_loss)]
                    Value::Integer(v) => Ok(Some(*v as f64)),
                    Value::Null => Ok(None),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<Float64Array>>()?,
        ),
        DataType::Utf8 => Arc::new(
            rows.iter()
                .map(|r| match &r[idx] {
                    Value::Text(v) => Ok(Some(v.clone())),
                    Value::Null => Ok(None),
                    other => Err(mismatch(other)),
                })
                .collect::<Result<StringArray>>()?,
        ),
        other => {
            return Err(Error::StorageError(format!(
                "unsupported column type {other}"
            )))
        }
    };
    Ok(array)
}

impl TableStore for SqliteTableStore {
    fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn table_schema(&self, name: &str) -> Result<Option<SchemaRef>> {
        validate_identifier(name)?;
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{name}\")"))?;
        let columns = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Ok(None);
        }

        let fields = columns
            .into_iter()
            .map(|(column, declared, not_null)| {
                Ok(Field::new(column, arrow_type(&declared)?, not_null == 0))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Arc::new(Schema::new(fields))))
    }

    fn create_table(&self, name: &str, schema: SchemaRef) -> Result<()> {
        validate_identifier(name)?;
        if self.table_schema(name)?.is_some() {
            return Err(Error::StorageError(format!(
                "table '{name}' already exists"
            )));
        }

        let mut columns = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            validate_identifier(field.name())?;
            let not_null = if field.is_nullable() { "" } else { " NOT NULL" };
            columns.push(format!(
                "\"{}\" {}{not_null}",
                field.name(),
                sql_type(field.data_type())?
            ));
        }

        self.conn()?.execute(
            &format!("CREATE TABLE \"{name}\" ({})", columns.join(", ")),
            [],
        )?;
        Ok(())
    }

    fn append(&self, name: &str, batch: RecordBatch) -> Result<()> {
        validate_identifier(name)?;
        let schema = self.require_schema(name)?;
        if !schemas_compatible(&schema, &batch.schema()) {
            return Err(Error::Schema {
                table: name.to_string(),
                expected: describe_schema(&schema),
                found: describe_schema(&batch.schema()),
            });
        }

        let placeholders = vec!["?"; schema.fields().len()].join(", ");
        let sql = format!(
            "INSERT INTO \"{name}\" ({}) VALUES ({placeholders})",
            column_list(&schema)
        );

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in 0..batch.num_rows() {
                let values = batch
                    .columns()
                    .iter()
                    .map(|column| cell(column, row))
                    .collect::<Result<Vec<_>>>()?;
                stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn scan(&self, name: &str) -> Result<Vec<RecordBatch>> {
        validate_identifier(name)?;
        let schema = self.require_schema(name)?;

        let sql = format!(
            "SELECT {} FROM \"{name}\" ORDER BY rowid",
            column_list(&schema)
        );
        let rows = select_rows(&self.conn()?, &sql, schema.fields().len())?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| build_column(field, &rows, idx))
            .collect::<Result<Vec<_>>>()?;
        Ok(vec![RecordBatch::try_new(schema, columns)?])
    }

    fn drop_table(&self, name: &str) -> Result<()> {
        validate_identifier(name)?;
        self.conn()?
            .execute(&format!("DROP TABLE IF EXISTS \"{name}\""), [])?;
        Ok(())
    }
}
