//! Nearest-series selection
//!
//! A pointer coordinate on the overview plot is resolved to the visible run
//! whose time steps come closest to it on the x axis. The scan is
//! `O(runs x steps)` per query; queries arrive at human pace.

use crate::catalog::SeriesCatalog;
use crate::experiment::RunId;
use serde::{Deserialize, Serialize};

/// Resolve `query_x` to the nearest visible run.
///
/// For each visible run, the distance is `min over t of (t - query_x)^2`.
/// The run with the smallest distance wins; on a tie the run met first in
/// `visible` keeps the selection (only a strictly smaller distance replaces
/// it). Runs missing from the catalog or without time steps are skipped.
///
/// Returns `None` if nothing visible has a time step or `query_x` is not finite.
///
/// # Examples
///
/// ```rust
/// use soup_scope::catalog::{DerivedSeries, SeriesCatalog};
/// use soup_scope::experiment::RunId;
/// use soup_scope::selection::resolve;
///
/// let one = RunId::new(1).unwrap();
/// let two = RunId::new(2).unwrap();
/// let catalog: SeriesCatalog = [
///     (one, DerivedSeries::from_expressions(["a", "b", "c"])),
///     (two, DerivedSeries::from_expressions(["a"])),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(resolve(&catalog, [one, two], 1.6), Some(one));
/// assert_eq!(resolve(&catalog, [two], 1.6), Some(two));
/// assert_eq!(resolve(&catalog, std::iter::empty(), 1.6), None);
/// ```
pub fn resolve<I>(catalog: &SeriesCatalog, visible: I, query_x: f64) -> Option<RunId>
where
    I: IntoIterator<Item = RunId>,
{
    if !query_x.is_finite() {
        return None;
    }

    let mut best: Option<(RunId, f64)> = None;
    for run_id in visible {
        let Some(distance) = catalog
            .get(run_id)
            .and_then(|series| series.min_squared_distance(query_x))
        else {
            continue;
        };
        if best.map_or(true, |(_, closest)| distance < closest) {
            best = Some((run_id, distance));
        }
    }
    best.map(|(run_id, _)| run_id)
}

/// Which run currently drives the detail plot.
///
/// Starts empty. Only a resolved selection changes it; an unresolved
/// interaction leaves it as it was.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    focused: Option<RunId>,
}

impl SelectionState {
    /// Empty selection
    #[must_use]
    pub const fn new() -> Self {
        Self { focused: None }
    }

    /// Currently focused run
    #[must_use]
    pub const fn focused(&self) -> Option<RunId> {
        self.focused
    }

    /// Focus a run
    pub fn focus(&mut self, run_id: RunId) {
        self.focused = Some(run_id);
    }
}
