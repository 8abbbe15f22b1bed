//! Chart runtime contract and a headless recorder

use crate::catalog::DerivedSeries;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// x column shared by both plots
pub const TIME_STEP_FIELD: &str = "time_step";
/// y column of the overview plot
pub const UNIQUE_ENTROPY_FIELD: &str = "unique_entropy";
/// y column of the detail plot
pub const UNIQUE_EXPRESSIONS_FIELD: &str = "unique_expressions_count";

/// The two plots of the explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotId {
    /// One line per run, `unique_entropy` over time
    Overview,
    /// The focused run, `unique_expressions_count` over time
    Detail,
}

/// Handle of a mark issued by a [`ChartBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkId(u32);

impl MarkId {
    /// Wrap a backend-issued handle
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw handle
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mark#{}", self.0)
    }
}

/// Column name to ordered values, the unit a chart runtime binds to a mark.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSource {
    columns: BTreeMap<String, Vec<u64>>,
}

impl DataSource {
    /// `(time_step, unique_entropy)` of a run
    #[must_use]
    pub fn overview(series: &DerivedSeries) -> Self {
        Self::pair(UNIQUE_ENTROPY_FIELD, series.time_step(), series.unique_entropy())
    }

    /// `(time_step, unique_expressions_count)` of a run
    #[must_use]
    pub fn detail(series: &DerivedSeries) -> Self {
        Self::pair(
            UNIQUE_EXPRESSIONS_FIELD,
            series.time_step(),
            series.unique_expressions_count(),
        )
    }

    /// Detail columns with no rows, bound before anything is selected
    #[must_use]
    pub fn empty_detail() -> Self {
        Self::pair(UNIQUE_EXPRESSIONS_FIELD, &[], &[])
    }

    fn pair(y_field: &str, x: &[u64], y: &[u64]) -> Self {
        let mut columns = BTreeMap::new();
        columns.insert(TIME_STEP_FIELD.to_string(), x.to_vec());
        columns.insert(y_field.to_string(), y.to_vec());
        Self { columns }
    }

    /// Values of one column
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[u64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Column names, sorted
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    /// Row count (length of the longest column)
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).max().unwrap_or(0)
    }

    /// True if no column has rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a chart runtime needs to draw one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    /// Mark name, used as the legend label and the `$name` tooltip value
    pub name: String,
    /// Stroke color
    pub color: String,
    /// Stroke width
    pub line_width: f64,
    /// Column used for x
    pub x_field: String,
    /// Column used for y
    pub y_field: String,
    /// Bound data
    pub source: DataSource,
}

/// Declarative chart runtime the explorer draws through.
///
/// Implementations own the marks; callers only hold [`MarkId`]s.
pub trait ChartBackend {
    /// Add a line to a plot and return its handle.
    ///
    /// # Errors
    /// Returns error if the runtime rejects the mark
    fn add_line(&mut self, plot: PlotId, line: &LineSpec) -> Result<MarkId>;

    /// Replace the data bound to an existing mark without recreating it.
    ///
    /// # Errors
    /// Returns error if `mark` is unknown to the runtime
    fn rebind(&mut self, mark: MarkId, source: &DataSource) -> Result<()>;

    /// Show or hide a mark.
    ///
    /// # Errors
    /// Returns error if `mark` is unknown to the runtime
    fn set_visible(&mut self, mark: MarkId, visible: bool) -> Result<()>;
}

impl<B: ChartBackend + ?Sized> ChartBackend for &mut B {
    fn add_line(&mut self, plot: PlotId, line: &LineSpec) -> Result<MarkId> {
        (**self).add_line(plot, line)
    }

    fn rebind(&mut self, mark: MarkId, source: &DataSource) -> Result<()> {
        (**self).rebind(mark, source)
    }

    fn set_visible(&mut self, mark: MarkId, visible: bool) -> Result<()> {
        (**self).set_visible(mark, visible)
    }
}

/// A mark as recorded by [`HeadlessChart`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMark {
    /// Plot the mark was added to
    pub plot: PlotId,
    /// Line as last bound
    pub line: LineSpec,
    /// Current visibility
    pub visible: bool,
    /// Number of rebinds since creation
    pub rebinds: usize,
}

/// In-process [`ChartBackend`] that records marks instead of drawing them.
#[derive(Debug, Clone, Default)]
pub struct HeadlessChart {
    marks: Vec<RecordedMark>,
}

impl HeadlessChart {
    /// Empty chart
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded mark
    #[must_use]
    pub fn mark(&self, mark: MarkId) -> Option<&RecordedMark> {
        self.marks.get(mark.0 as usize)
    }

    /// Marks of one plot, in creation order
    pub fn marks_on(&self, plot: PlotId) -> impl Iterator<Item = &RecordedMark> + '_ {
        self.marks.iter().filter(move |m| m.plot == plot)
    }

    /// Total number of marks
    #[must_use]
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    /// True if no mark was added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    fn mark_mut(&mut self, mark: MarkId) -> Result<&mut RecordedMark> {
        self.marks
            .get_mut(mark.0 as usize)
            .ok_or_else(|| Error::InvalidInput(format!("unknown chart mark {mark}")))
    }
}

impl ChartBackend for HeadlessChart {
    fn add_line(&mut self, plot: PlotId, line: &LineSpec) -> Result<MarkId> {
        let raw = u32::try_from(self.marks.len())
            .map_err(|_| Error::InvalidInput("too many chart marks".to_string()))?;
        self.marks.push(RecordedMark {
            plot,
            line: line.clone(),
            visible: true,
            rebinds: 0,
        });
        Ok(MarkId(raw))
    }

    fn rebind(&mut self, mark: MarkId, source: &DataSource) -> Result<()> {
        let recorded = self.mark_mut(mark)?;
        recorded.line.source = source.clone();
        recorded.rebinds += 1;
        Ok(())
    }

    fn set_visible(&mut self, mark: MarkId, visible: bool) -> Result<()> {
        self.mark_mut(mark)?.visible = visible;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(source: DataSource) -> LineSpec {
        LineSpec {
            name: "experiment_1".to_string(),
            color: "blue".to_string(),
            line_width: 2.0,
            x_field: TIME_STEP_FIELD.to_string(),
            y_field: UNIQUE_ENTROPY_FIELD.to_string(),
            source,
        }
    }

    #[test]
    fn test_data_source_columns() {
        let series = DerivedSeries::from_expressions(["ab", "aab"]);
        let overview = DataSource::overview(&series);
        assert_eq!(overview.column(TIME_STEP_FIELD), Some(&[0, 1][..]));
        assert_eq!(overview.column(UNIQUE_ENTROPY_FIELD), Some(&[2, 3][..]));
        assert_eq!(overview.column(UNIQUE_EXPRESSIONS_FIELD), None);

        let detail = DataSource::detail(&series);
        assert_eq!(detail.column(UNIQUE_EXPRESSIONS_FIELD), Some(&[2, 2][..]));
        assert_eq!(detail.len(), 2);
    }

    #[test]
    fn test_empty_detail() {
        let source = DataSource::empty_detail();
        assert!(source.is_empty());
        let names: Vec<_> = source.column_names().collect();
        assert_eq!(names, vec![TIME_STEP_FIELD, UNIQUE_EXPRESSIONS_FIELD]);
    }

    #[test]
    fn test_data_source_serializes_as_column_map() {
        let source = DataSource::detail(&DerivedSeries::from_expressions(["a"]));
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"time_step": [0], "unique_expressions_count": [1]})
        );
    }

    #[test]
    fn test_headless_chart_records_marks() {
        let mut chart = HeadlessChart::new();
        let a = chart.add_line(PlotId::Overview, &line(DataSource::default())).unwrap();
        let b = chart.add_line(PlotId::Detail, &line(DataSource::empty_detail())).unwrap();
        assert_ne!(a, b);
        assert_eq!(chart.len(), 2);
        assert_eq!(chart.marks_on(PlotId::Overview).count(), 1);

        let series = DerivedSeries::from_expressions(["x"]);
        chart.rebind(b, &DataSource::detail(&series)).unwrap();
        chart.set_visible(a, false).unwrap();

        assert_eq!(chart.mark(b).unwrap().rebinds, 1);
        assert_eq!(chart.mark(b).unwrap().line.source.len(), 1);
        assert!(!chart.mark(a).unwrap().visible);
    }

    #[test]
    fn test_headless_chart_unknown_mark() {
        let mut chart = HeadlessChart::new();
        let err = chart.set_visible(MarkId::new(7), true).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(chart.rebind(MarkId::new(0), &DataSource::default()).is_err());
    }
}
