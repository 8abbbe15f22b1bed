//! Render Surface - binds catalog series to chart marks and wires the two plots
//!
//! ```text
//!   overview plot                         detail plot
//!   ┌──────────────────────┐             ┌──────────────────────┐
//!   │ experiment_1 (blue)  │  tap at x   │ unique_expressions   │
//!   │ experiment_2 (green) │ ──resolve──▶│ of the focused run   │
//!   │ experiment_3 (red)   │             │                      │
//!   └──────────────────────┘             └──────────────────────┘
//! ```
//!
//! The surface owns its [`SelectionState`], so independent surfaces never
//! share a focus. Drawing goes through a [`ChartBackend`].

mod chart;
mod document;

pub use chart::{
    ChartBackend, DataSource, HeadlessChart, LineSpec, MarkId, PlotId, RecordedMark,
    TIME_STEP_FIELD, UNIQUE_ENTROPY_FIELD, UNIQUE_EXPRESSIONS_FIELD,
};
pub use document::{
    ChartDocument, LegendItem, LineDocument, PlotDocument, Tooltip, OVERVIEW_TOOLTIPS,
};

use crate::catalog::SeriesCatalog;
use crate::config::ExplorerConfig;
use crate::experiment::{table_name_of, RunId};
use crate::selection::{resolve, SelectionState};
use crate::{Error, Result};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

/// Name of the single detail mark
pub const DETAIL_LINE_NAME: &str = "selected_experiment";

#[derive(Debug, Clone)]
struct OverviewLine {
    run_id: RunId,
    mark: MarkId,
    spec: LineSpec,
    visible: bool,
}

/// Overview and detail plots over one [`SeriesCatalog`].
///
/// ## Example
///
/// ```rust
/// use soup_scope::catalog::{DerivedSeries, SeriesCatalog};
/// use soup_scope::config::ExplorerConfig;
/// use soup_scope::experiment::RunId;
/// use soup_scope::render::{HeadlessChart, RenderSurface};
///
/// # fn main() -> soup_scope::Result<()> {
/// let run = RunId::FIRST;
/// let catalog: SeriesCatalog = [(run, DerivedSeries::from_expressions(["ab", "abc"]))]
///     .into_iter()
///     .collect();
///
/// let mut surface = RenderSurface::new(HeadlessChart::new(), &ExplorerConfig::default(), catalog)?;
/// assert_eq!(surface.on_tap(0.4)?, Some(run));
/// assert_eq!(surface.detail_source().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RenderSurface<B> {
    backend: B,
    config: ExplorerConfig,
    catalog: SeriesCatalog,
    lines: Vec<OverviewLine>,
    mark_to_run: FxHashMap<MarkId, RunId>,
    run_to_line: FxHashMap<RunId, usize>,
    detail: LineSpec,
    detail_mark: MarkId,
    selection: SelectionState,
}

impl<B: ChartBackend> RenderSurface<B> {
    /// Add one overview line per catalog run and an empty detail line.
    ///
    /// Lines are added in ascending run id order and take palette colors
    /// cyclically in that order, so the same catalog always gets the same
    /// colors.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for an invalid configuration, or any
    /// error the backend raises while adding marks
    pub fn new(mut backend: B, config: &ExplorerConfig, catalog: SeriesCatalog) -> Result<Self> {
        config.validate()?;

        let mut lines = Vec::with_capacity(catalog.len());
        let mut mark_to_run = FxHashMap::default();
        let mut run_to_line = FxHashMap::default();

        for (index, (run_id, series)) in catalog.iter().enumerate() {
            let spec = LineSpec {
                name: table_name_of(run_id),
                color: config.palette[index % config.palette.len()].clone(),
                line_width: config.line_width,
                x_field: TIME_STEP_FIELD.to_string(),
                y_field: UNIQUE_ENTROPY_FIELD.to_string(),
                source: DataSource::overview(series),
            };
            let mark = backend.add_line(PlotId::Overview, &spec)?;
            mark_to_run.insert(mark, run_id);
            run_to_line.insert(run_id, lines.len());
            lines.push(OverviewLine {
                run_id,
                mark,
                spec,
                visible: true,
            });
        }

        let detail = LineSpec {
            name: DETAIL_LINE_NAME.to_string(),
            color: config.detail_color.clone(),
            line_width: config.line_width,
            x_field: TIME_STEP_FIELD.to_string(),
            y_field: UNIQUE_EXPRESSIONS_FIELD.to_string(),
            source: DataSource::empty_detail(),
        };
        let detail_mark = backend.add_line(PlotId::Detail, &detail)?;

        debug!(lines = lines.len(), "render surface bound");
        Ok(Self {
            backend,
            config: config.clone(),
            catalog,
            lines,
            mark_to_run,
            run_to_line,
            detail,
            detail_mark,
            selection: SelectionState::new(),
        })
    }

    /// Handle a tap on the overview plot at data-space `x`.
    ///
    /// Resolves against the currently visible runs. When nothing resolves
    /// (no visible runs, or `x` not finite) the detail plot keeps whatever
    /// it showed before.
    ///
    /// # Errors
    /// Returns error if the backend fails to rebind the detail mark
    pub fn on_tap(&mut self, x: f64) -> Result<Option<RunId>> {
        let resolved = resolve(&self.catalog, self.visible_run_ids(), x);
        match resolved {
            Some(run_id) => {
                self.select(run_id)?;
                Ok(Some(run_id))
            }
            None => {
                debug!(x, "tap resolved to no run");
                Ok(None)
            }
        }
    }

    /// Handle an event fired on a specific overview mark.
    ///
    /// Returns `None` for marks the surface did not create (the detail mark
    /// included).
    ///
    /// # Errors
    /// Returns error if the backend fails to rebind the detail mark
    pub fn on_mark_event(&mut self, mark: MarkId) -> Result<Option<RunId>> {
        let Some(run_id) = self.run_for_mark(mark) else {
            return Ok(None);
        };
        self.select(run_id)?;
        Ok(Some(run_id))
    }

    /// Bind a run's `(time_step, unique_expressions_count)` to the detail plot
    /// and focus it.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] if the run is not in the catalog, or the
    /// backend's rebind error
    pub fn select(&mut self, run_id: RunId) -> Result<()> {
        let series = self
            .catalog
            .get(run_id)
            .ok_or_else(|| Error::InvalidInput(format!("run {run_id} is not rendered")))?;
        let source = DataSource::detail(series);
        self.backend.rebind(self.detail_mark, &source)?;
        self.detail.source = source;
        self.selection.focus(run_id);
        info!(%run_id, steps = self.detail.source.len(), "detail plot bound");
        Ok(())
    }

    /// Show or hide a run's overview line. Hidden runs are not eligible for
    /// tap resolution; stored data and the detail plot are untouched.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for a run without a line, or the
    /// backend's error
    pub fn set_visible(&mut self, run_id: RunId, visible: bool) -> Result<()> {
        let index = self.line_index(run_id)?;
        let line = &mut self.lines[index];
        self.backend.set_visible(line.mark, visible)?;
        line.visible = visible;
        debug!(%run_id, visible, "overview line visibility changed");
        Ok(())
    }

    /// Flip a run's visibility, as a legend click does. Returns the new state.
    ///
    /// # Errors
    /// Same as [`set_visible`](Self::set_visible)
    pub fn toggle_legend(&mut self, run_id: RunId) -> Result<bool> {
        let visible = !self.lines[self.line_index(run_id)?].visible;
        self.set_visible(run_id, visible)?;
        Ok(visible)
    }

    /// Visible runs in render order
    pub fn visible_run_ids(&self) -> impl Iterator<Item = RunId> + '_ {
        self.lines.iter().filter(|l| l.visible).map(|l| l.run_id)
    }

    /// Run owning an overview mark
    #[must_use]
    pub fn run_for_mark(&self, mark: MarkId) -> Option<RunId> {
        self.mark_to_run.get(&mark).copied()
    }

    /// Overview mark of a run
    #[must_use]
    pub fn mark_for_run(&self, run_id: RunId) -> Option<MarkId> {
        self.run_to_line.get(&run_id).map(|&i| self.lines[i].mark)
    }

    /// Assigned line color of a run
    #[must_use]
    pub fn color_of(&self, run_id: RunId) -> Option<&str> {
        self.run_to_line
            .get(&run_id)
            .map(|&i| self.lines[i].spec.color.as_str())
    }

    /// Whether a run's line is shown; `None` for unknown runs
    #[must_use]
    pub fn is_visible(&self, run_id: RunId) -> Option<bool> {
        self.run_to_line.get(&run_id).map(|&i| self.lines[i].visible)
    }

    /// Data currently bound to the detail plot
    #[must_use]
    pub const fn detail_source(&self) -> &DataSource {
        &self.detail.source
    }

    /// Mark of the detail line
    #[must_use]
    pub const fn detail_mark(&self) -> MarkId {
        self.detail_mark
    }

    /// Current focus
    #[must_use]
    pub const fn selection(&self) -> SelectionState {
        self.selection
    }

    /// Rendered catalog
    #[must_use]
    pub const fn catalog(&self) -> &SeriesCatalog {
        &self.catalog
    }

    /// Chart backend
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Legend entries in render order
    #[must_use]
    pub fn legend(&self) -> Vec<LegendItem> {
        self.lines
            .iter()
            .map(|l| LegendItem {
                run_id: l.run_id,
                label: l.spec.name.clone(),
                color: l.spec.color.clone(),
                visible: l.visible,
            })
            .collect()
    }

    /// Hover tooltips shown on the overview plot
    #[must_use]
    pub const fn hover_tooltips(&self) -> &'static [Tooltip] {
        &OVERVIEW_TOOLTIPS
    }

    /// Snapshot both plots for an external chart runtime.
    #[must_use]
    pub fn document(&self) -> ChartDocument {
        let mut overview = PlotDocument::new(
            &self.config.overview,
            self.lines
                .iter()
                .map(|l| LineDocument::from_spec(Some(l.run_id), &l.spec, l.visible))
                .collect(),
        );
        overview.tooltips = OVERVIEW_TOOLTIPS.to_vec();
        overview.legend = self.legend();

        let detail = PlotDocument::new(
            &self.config.detail,
            vec![LineDocument::from_spec(None, &self.detail, true)],
        );

        ChartDocument {
            intro: self.config.intro.clone(),
            overview,
            detail,
            selected: self.selection.focused(),
        }
    }

    fn line_index(&self, run_id: RunId) -> Result<usize> {
        self.run_to_line
            .get(&run_id)
            .copied()
            .ok_or_else(|| Error::InvalidInput(format!("run {run_id} is not rendered")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DerivedSeries;

    fn id(n: u64) -> RunId {
        RunId::new(n).unwrap()
    }

    fn catalog(lengths: &[(u64, usize)]) -> SeriesCatalog {
        lengths
            .iter()
            .map(|&(run, n)| (id(run), DerivedSeries::from_expressions(vec!["ab"; n])))
            .collect()
    }

    fn surface(lengths: &[(u64, usize)]) -> RenderSurface<HeadlessChart> {
        RenderSurface::new(HeadlessChart::new(), &ExplorerConfig::default(), catalog(lengths))
            .unwrap()
    }

    #[test]
    fn test_colors_cycle_in_id_order() {
        let s = surface(&[(4, 1), (1, 1), (2, 1), (3, 1)]);
        assert_eq!(s.color_of(id(1)), Some("blue"));
        assert_eq!(s.color_of(id(2)), Some("green"));
        assert_eq!(s.color_of(id(3)), Some("red"));
        assert_eq!(s.color_of(id(4)), Some("blue"));
        assert_eq!(s.color_of(id(9)), None);
    }

    #[test]
    fn test_mark_run_mapping_is_bidirectional() {
        let s = surface(&[(1, 2), (2, 3)]);
        for run in [id(1), id(2)] {
            let mark = s.mark_for_run(run).unwrap();
            assert_eq!(s.run_for_mark(mark), Some(run));
        }
        assert_eq!(s.run_for_mark(s.detail_mark()), None);
        assert_eq!(s.backend().len(), 3);
    }

    #[test]
    fn test_detail_starts_empty() {
        let s = surface(&[(1, 2)]);
        assert!(s.detail_source().is_empty());
        assert_eq!(s.selection().focused(), None);
    }

    #[test]
    fn test_tap_binds_detail() {
        let mut s = surface(&[(1, 3), (2, 6)]);
        assert_eq!(s.on_tap(4.0).unwrap(), Some(id(2)));
        assert_eq!(s.selection().focused(), Some(id(2)));
        assert_eq!(s.detail_source().len(), 6);

        let detail = s.backend().mark(s.detail_mark()).unwrap();
        assert_eq!(detail.rebinds, 1);
        assert_eq!(detail.line.source, *s.detail_source());
    }

    #[test]
    fn test_unresolved_tap_keeps_detail() {
        let mut s = surface(&[(1, 3)]);
        s.on_tap(1.0).unwrap();
        let before = s.detail_source().clone();

        s.set_visible(id(1), false).unwrap();
        assert_eq!(s.on_tap(1.0).unwrap(), None);
        assert_eq!(s.on_tap(f64::NAN).unwrap(), None);

        assert_eq!(*s.detail_source(), before);
        assert_eq!(s.selection().focused(), Some(id(1)));
        assert_eq!(s.backend().mark(s.detail_mark()).unwrap().rebinds, 1);
    }

    #[test]
    fn test_hidden_runs_not_eligible() {
        let mut s = surface(&[(1, 3), (2, 6)]);
        s.set_visible(id(2), false).unwrap();
        assert_eq!(s.on_tap(5.0).unwrap(), Some(id(1)));
        let ids: Vec<_> = s.visible_run_ids().collect();
        assert_eq!(ids, vec![id(1)]);
    }

    #[test]
    fn test_toggle_legend() {
        let mut s = surface(&[(1, 1)]);
        let mark = s.mark_for_run(id(1)).unwrap();
        assert!(!s.toggle_legend(id(1)).unwrap());
        assert!(!s.backend().mark(mark).unwrap().visible);
        assert!(s.toggle_legend(id(1)).unwrap());
        assert_eq!(s.is_visible(id(1)), Some(true));
        assert!(matches!(
            s.toggle_legend(id(5)).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }

    #[test]
    fn test_mark_event_selects_owner() {
        let mut s = surface(&[(1, 1), (2, 2)]);
        let mark = s.mark_for_run(id(2)).unwrap();
        assert_eq!(s.on_mark_event(mark).unwrap(), Some(id(2)));
        let detail_mark = s.detail_mark();
        assert_eq!(s.on_mark_event(detail_mark).unwrap(), None);
        assert_eq!(s.selection().focused(), Some(id(2)));
    }

    #[test]
    fn test_legend_and_tooltips() {
        let s = surface(&[(1, 1), (2, 1)]);
        let legend = s.legend();
        assert_eq!(legend[0].label, "experiment_1");
        assert_eq!(legend[1].color, "green");
        let labels: Vec<_> = s.hover_tooltips().iter().map(|t| t.label).collect();
        assert_eq!(labels, vec!["Experiment", "Time Step", "Unique Entropy"]);
    }

    #[test]
    fn test_document() {
        let mut s = surface(&[(1, 2)]);
        s.on_tap(0.0).unwrap();
        let doc = s.document();
        assert_eq!(doc.overview.width, 1800);
        assert_eq!(doc.overview.lines.len(), 1);
        assert_eq!(doc.detail.lines[0].color, "green");
        assert_eq!(doc.selected, Some(id(1)));

        let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json["overview"]["lines"][0]["name"], "experiment_1");
        assert_eq!(json["detail"]["lines"][0]["source"]["time_step"], serde_json::json!([0, 1]));
        assert!(json["detail"].get("tooltips").is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExplorerConfig {
            palette: Vec::new(),
            ..ExplorerConfig::default()
        };
        let err = RenderSurface::new(HeadlessChart::new(), &config, catalog(&[])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
