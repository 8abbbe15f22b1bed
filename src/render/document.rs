//! Serializable snapshot of both plots, for handing to a JavaScript chart runtime

use super::chart::{DataSource, LineSpec};
use crate::config::PlotConfig;
use crate::experiment::RunId;
use serde::Serialize;

/// One hover tooltip row: label and the field it shows.
///
/// `@column` reads the hovered data column, `$name` the mark name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    /// Row label
    pub label: &'static str,
    /// Field reference
    pub field: &'static str,
}

/// Hover tooltips of the overview plot
pub const OVERVIEW_TOOLTIPS: [Tooltip; 3] = [
    Tooltip {
        label: "Experiment",
        field: "$name",
    },
    Tooltip {
        label: "Time Step",
        field: "@time_step",
    },
    Tooltip {
        label: "Unique Entropy",
        field: "@unique_entropy",
    },
];

/// One legend entry of the overview plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendItem {
    /// Run the entry controls
    pub run_id: RunId,
    /// `experiment_<id>`
    pub label: String,
    /// Line color
    pub color: String,
    /// Whether the line is shown
    pub visible: bool,
}

/// A line as it appears in a [`PlotDocument`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineDocument {
    /// Owning run, absent for the detail line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Mark name
    pub name: String,
    /// Stroke color
    pub color: String,
    /// Stroke width
    pub line_width: f64,
    /// x column
    pub x: String,
    /// y column
    pub y: String,
    /// Whether the line is shown
    pub visible: bool,
    /// Bound columns
    pub source: DataSource,
}

impl LineDocument {
    pub(crate) fn from_spec(run_id: Option<RunId>, spec: &LineSpec, visible: bool) -> Self {
        Self {
            run_id,
            name: spec.name.clone(),
            color: spec.color.clone(),
            line_width: spec.line_width,
            x: spec.x_field.clone(),
            y: spec.y_field.clone(),
            visible,
            source: spec.source.clone(),
        }
    }
}

/// Layout, tools and lines of one plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotDocument {
    /// Title
    pub title: String,
    /// X axis label
    pub x_label: String,
    /// Y axis label
    pub y_label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Enabled interaction tools
    pub tools: Vec<String>,
    /// Hover tooltips (overview only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tooltips: Vec<Tooltip>,
    /// Legend entries (overview only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legend: Vec<LegendItem>,
    /// Lines in render order
    pub lines: Vec<LineDocument>,
}

impl PlotDocument {
    pub(crate) fn new(plot: &PlotConfig, lines: Vec<LineDocument>) -> Self {
        Self {
            title: plot.title.clone(),
            x_label: plot.x_label.clone(),
            y_label: plot.y_label.clone(),
            width: plot.width,
            height: plot.height,
            tools: plot.tools.clone(),
            tooltips: Vec::new(),
            legend: Vec::new(),
            lines,
        }
    }
}

/// Both plots plus the current selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDocument {
    /// Heading shown above the plots
    pub intro: String,
    /// Overview plot
    pub overview: PlotDocument,
    /// Detail plot
    pub detail: PlotDocument,
    /// Run bound to the detail plot
    pub selected: Option<RunId>,
}

impl ChartDocument {
    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
