//! Error types for soup-scope
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// soup-scope error types
#[derive(Error, Debug)]
pub enum Error {
    /// Requested table (and therefore experiment run) does not exist
    #[error("Not found: no table named '{table}' in the backing store")]
    NotFound {
        /// Name of the missing table
        table: String,
    },

    /// Existing table has a shape incompatible with the one requested
    #[error("Schema error: table '{table}' has columns {found}, expected {expected}\nRefusing to overwrite an existing table")]
    Schema {
        /// Name of the offending table
        table: String,
        /// Expected column list
        expected: String,
        /// Column list actually present
        found: String,
    },

    /// Append rejected or failed; no rows were committed
    #[error("Write error: {0}\nNo rows were committed; retry the whole persist call")]
    Write(String),

    /// Table carries the experiment prefix but its suffix is not a run id
    #[error("Malformed experiment table name: '{0}'")]
    MalformedName(String),

    /// Simulation finished but its results could not be stored
    #[error("Simulation ran for {steps_run} steps but storing the results failed: {source}")]
    PersistFailed {
        /// Steps the simulation engine reported as completed
        steps_run: usize,
        /// Underlying storage error
        #[source]
        source: Box<Error>,
    },

    /// Simulation engine reported a failure
    #[error("Simulation failed: {0}")]
    Simulation(String),

    /// Invalid input (e.g. a table name outside `[A-Za-z0-9_]`)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration rejected during validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Storage error (backend-level failure)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON (config or chart document) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Steps the simulation completed, when this error came out of
    /// [`record_simulation`](crate::simulation::record_simulation).
    #[must_use]
    pub const fn steps_run(&self) -> Option<usize> {
        match self {
            Self::PersistFailed { steps_run, .. } => Some(*steps_run),
            _ => None,
        }
    }
}
