//! Run identity and the `experiment_<id>` table naming convention
//!
//! The table name is the only index from a run id to its rows, so every place
//! that produces or parses a name goes through [`table_name_of`] and
//! [`parse_table_name`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every experiment result table.
pub const TABLE_PREFIX: &str = "experiment_";

/// Identity of one experiment run: a positive integer, unique within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RunId(u64);

impl RunId {
    /// Id given to the first run of an empty store.
    pub const FIRST: Self = Self(1);

    /// Create a run id; `None` for zero.
    #[must_use]
    pub const fn new(id: u64) -> Option<Self> {
        if id == 0 {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id allocated after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Name of the table holding this run.
    #[must_use]
    pub fn table_name(self) -> String {
        table_name_of(self)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for RunId {
    type Error = Error;

    fn try_from(id: u64) -> Result<Self> {
        Self::new(id).ok_or_else(|| Error::InvalidInput("run id must be positive".to_string()))
    }
}

impl From<RunId> for u64 {
    fn from(id: RunId) -> Self {
        id.0
    }
}

/// Build the table name for a run: `experiment_<id>`.
#[must_use]
pub fn table_name_of(id: RunId) -> String {
    format!("{TABLE_PREFIX}{}", id.0)
}

/// Classify a table name.
///
/// - `Ok(None)`: not an experiment table (no prefix)
/// - `Ok(Some(id))`: a well-formed experiment table
/// - `Err(MalformedName)`: prefixed, but the suffix is not a positive integer
///   without leading zeros
///
/// # Errors
/// Returns [`Error::MalformedName`] for prefixed names with a bad suffix
pub fn parse_table_name(name: &str) -> Result<Option<RunId>> {
    let Some(suffix) = name.strip_prefix(TABLE_PREFIX) else {
        return Ok(None);
    };

    let canonical = !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_digit())
        && !suffix.starts_with('0');
    if !canonical {
        return Err(Error::MalformedName(name.to_string()));
    }

    suffix
        .parse::<u64>()
        .ok()
        .and_then(RunId::new)
        .map(Some)
        .ok_or_else(|| Error::MalformedName(name.to_string()))
}

/// Run id encoded in a table name, if it is a well-formed experiment table.
#[must_use]
pub fn run_id_of(name: &str) -> Option<RunId> {
    parse_table_name(name).ok().flatten()
}
