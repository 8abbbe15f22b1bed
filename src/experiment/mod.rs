//! Experiment Result Store
//!
//! One experiment run is persisted as one table named `experiment_<id>`,
//! holding the expressions produced by a simulation in insertion order.
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentStore ──< ResultTable "experiment_<id>" (1 per RunId)
//!                          │
//!                          └──< ResultRow (id, series_number, expression)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use soup_scope::experiment::ExperimentStore;
//!
//! # fn main() -> soup_scope::Result<()> {
//! let mut store = ExperimentStore::in_memory();
//!
//! let run_id = store.persist_run(1, &["\\x.x", "\\x.\\y.x"])?;
//! assert_eq!(run_id.table_name(), "experiment_1");
//!
//! let rows = store.load_run(run_id)?;
//! assert_eq!(rows[1].expression(), "\\x.\\y.x");
//! # Ok(())
//! # }
//! ```

mod result_table;
mod store;
mod table_name;

pub use result_table::{
    result_schema, validate_append, ResultRow, ResultTable, EXPRESSION_COLUMN, ID_COLUMN,
    SERIES_NUMBER_COLUMN,
};
pub use store::{ExperimentStore, RunSummary, SEQUENCE_TABLE};
pub use table_name::{parse_table_name, run_id_of, table_name_of, RunId, TABLE_PREFIX};
