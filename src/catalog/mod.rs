//! Series Catalog - in-memory projection of every stored run into plot-ready series
//!
//! Built read-only from an [`ExperimentStore`]; a rebuild is the only way to
//! pick up new runs. Runs that disappear or fail to decode between listing
//! and loading are skipped, since catalogs are built against stores that may
//! be written by another process.

mod derived;

pub use derived::{unique_entropy, unique_expressions_count, DerivedPoint, DerivedSeries};

use crate::experiment::{ExperimentStore, RunId};
use crate::storage::TableStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Mapping from run id to its derived series, iterated in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesCatalog {
    series: BTreeMap<RunId, DerivedSeries>,
}

impl SeriesCatalog {
    /// Derive a series for every run in the store.
    ///
    /// # Errors
    /// Returns error only if the store cannot list its runs; unreadable runs
    /// are logged and left out
    pub fn build<S: TableStore>(store: &ExperimentStore<S>) -> Result<Self> {
        let mut series = BTreeMap::new();
        for run_id in store.list_run_ids()? {
            match store.load_run(run_id) {
                Ok(rows) => {
                    series.insert(run_id, DerivedSeries::from_rows(&rows));
                }
                Err(err) => warn!(%run_id, %err, "skipping unreadable run"),
            }
        }
        debug!(runs = series.len(), "series catalog built");
        Ok(Self { series })
    }

    /// Series of one run
    #[must_use]
    pub fn get(&self, run_id: RunId) -> Option<&DerivedSeries> {
        self.series.get(&run_id)
    }

    /// Run ids, ascending
    pub fn run_ids(&self) -> impl Iterator<Item = RunId> + '_ {
        self.series.keys().copied()
    }

    /// `(run id, series)` pairs, ascending by id
    pub fn iter(&self) -> impl Iterator<Item = (RunId, &DerivedSeries)> + '_ {
        self.series.iter().map(|(&id, s)| (id, s))
    }

    /// Number of runs
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// True if no runs were loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl FromIterator<(RunId, DerivedSeries)> for SeriesCatalog {
    fn from_iter<T: IntoIterator<Item = (RunId, DerivedSeries)>>(iter: T) -> Self {
        Self {
            series: iter.into_iter().collect(),
        }
    }
}
