//! Explorer configuration
//!
//! Loaded from JSON (every field optional, defaults below) or assembled with
//! [`ExplorerConfig::builder`].
//!
//! ```json
//! {
//!   "store": { "kind": "parquet", "dir": "data/runs" },
//!   "palette": ["blue", "green", "red"],
//!   "overview": { "title": "Unique Entropy Over Time (All Experiments)" }
//! }
//! ```

use crate::storage::{MemoryTableStore, ParquetTableStore, TableStore};
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Where the experiment tables live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreLocation {
    /// Process-local, lost on exit
    #[default]
    Memory,
    /// One Parquet file per table under `dir`
    Parquet {
        /// Directory holding the table files
        dir: PathBuf,
    },
    /// One `SQLite` database file (requires the `sqlite` feature)
    Sqlite {
        /// Database file
        path: PathBuf,
    },
}

impl StoreLocation {
    /// Open the backing table store.
    ///
    /// # Errors
    /// Returns error if the store cannot be opened, or if `Sqlite` is
    /// requested from a build without the `sqlite` feature
    pub fn open(&self) -> Result<Box<dyn TableStore>> {
        match self {
            Self::Memory => Ok(Box::new(MemoryTableStore::new())),
            Self::Parquet { dir } => Ok(Box::new(ParquetTableStore::open(dir)?)),
            #[cfg(feature = "sqlite")]
            Self::Sqlite { path } => Ok(Box::new(crate::storage::SqliteTableStore::open(path)?)),
            #[cfg(not(feature = "sqlite"))]
            Self::Sqlite { .. } => Err(Error::InvalidConfig(
                "sqlite store requested but soup-scope was built without the `sqlite` feature"
                    .to_string(),
            )),
        }
    }
}

/// Presentation settings of one plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Plot title
    pub title: String,
    /// X axis label
    pub x_label: String,
    /// Y axis label
    pub y_label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Interaction tools offered by the chart runtime
    pub tools: Vec<String>,
}

impl PlotConfig {
    /// Defaults for the overview (one line per run) plot
    #[must_use]
    pub fn overview() -> Self {
        Self {
            title: "Unique Entropy Over Time (All Experiments)".to_string(),
            x_label: "Time".to_string(),
            y_label: "Unique Entropy".to_string(),
            width: 1800,
            height: 900,
            tools: ["tap", "pan", "box_zoom", "wheel_zoom", "reset"]
                .map(String::from)
                .to_vec(),
        }
    }

    /// Defaults for the detail (selected run) plot
    #[must_use]
    pub fn detail() -> Self {
        Self {
            title: "Number of Unique Expressions Over Time (Selected Experiment)".to_string(),
            y_label: "Number of Unique Expressions".to_string(),
            tools: ["pan", "box_zoom", "wheel_zoom", "reset"]
                .map(String::from)
                .to_vec(),
            ..Self::overview()
        }
    }

    fn validate(&self, which: &str) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "{which} plot size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// A plot object as written in a config file. Absent fields fall back to the
/// defaults of the plot being configured, not to a shared default.
#[derive(Deserialize)]
struct PlotOverrides {
    title: Option<String>,
    x_label: Option<String>,
    y_label: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    tools: Option<Vec<String>>,
}

impl PlotOverrides {
    fn over(self, base: PlotConfig) -> PlotConfig {
        PlotConfig {
            title: self.title.unwrap_or(base.title),
            x_label: self.x_label.unwrap_or(base.x_label),
            y_label: self.y_label.unwrap_or(base.y_label),
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
            tools: self.tools.unwrap_or(base.tools),
        }
    }
}

fn overview_plot<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<PlotConfig, D::Error> {
    PlotOverrides::deserialize(deserializer).map(|o| o.over(PlotConfig::overview()))
}

fn detail_plot<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<PlotConfig, D::Error> {
    PlotOverrides::deserialize(deserializer).map(|o| o.over(PlotConfig::detail()))
}

/// Top-level explorer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Backing store location
    pub store: StoreLocation,
    /// Cyclic color palette for overview lines, in render order
    pub palette: Vec<String>,
    /// Color of the detail line
    pub detail_color: String,
    /// Line width of every mark
    pub line_width: f64,
    /// Heading shown above the plots
    pub intro: String,
    /// Overview plot settings
    #[serde(deserialize_with = "overview_plot")]
    pub overview: PlotConfig,
    /// Detail plot settings
    #[serde(deserialize_with = "detail_plot")]
    pub detail: PlotConfig,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            store: StoreLocation::Memory,
            palette: ["blue", "green", "red"].map(String::from).to_vec(),
            detail_color: "green".to_string(),
            line_width: 2.0,
            intro: "Expression Soup Experiments".to_string(),
            overview: PlotConfig::overview(),
            detail: PlotConfig::detail(),
        }
    }
}

impl ExplorerConfig {
    /// Start a builder from the defaults
    #[must_use]
    pub fn builder() -> ExplorerConfigBuilder {
        ExplorerConfigBuilder::default()
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    /// Returns error on malformed JSON or a configuration that fails validation
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or its content is invalid
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Check invariants the rest of the crate relies on.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] describing the first violation
    pub fn validate(&self) -> Result<()> {
        if self.palette.is_empty() {
            return Err(Error::InvalidConfig("palette must not be empty".to_string()));
        }
        if !(self.line_width.is_finite() && self.line_width > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "line width must be positive, got {}",
                self.line_width
            )));
        }
        self.overview.validate("overview")?;
        self.detail.validate("detail")
    }
}

/// Builder for [`ExplorerConfig`]
#[derive(Debug, Default)]
pub struct ExplorerConfigBuilder {
    config: ExplorerConfig,
}

impl ExplorerConfigBuilder {
    /// Set the store location
    #[must_use]
    pub fn store(mut self, store: StoreLocation) -> Self {
        self.config.store = store;
        self
    }

    /// Set the overview palette
    #[must_use]
    pub fn palette<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.palette = colors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the detail line color
    #[must_use]
    pub fn detail_color(mut self, color: impl Into<String>) -> Self {
        self.config.detail_color = color.into();
        self
    }

    /// Set the line width
    #[must_use]
    pub const fn line_width(mut self, width: f64) -> Self {
        self.config.line_width = width;
        self
    }

    /// Set the intro heading
    #[must_use]
    pub fn intro(mut self, intro: impl Into<String>) -> Self {
        self.config.intro = intro.into();
        self
    }

    /// Replace the overview plot settings
    #[must_use]
    pub fn overview(mut self, plot: PlotConfig) -> Self {
        self.config.overview = plot;
        self
    }

    /// Replace the detail plot settings
    #[must_use]
    pub fn detail(mut self, plot: PlotConfig) -> Self {
        self.config.detail = plot;
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if validation fails
    pub fn build(self) -> Result<ExplorerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExplorerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.palette, vec!["blue", "green", "red"]);
        assert_eq!(config.store, StoreLocation::Memory);
        assert_eq!(config.overview.width, 1800);
        assert_eq!(config.detail.height, 900);
        assert!(config.overview.tools.contains(&"tap".to_string()));
        assert!(!config.detail.tools.contains(&"tap".to_string()));
    }

    #[test]
    fn test_from_json_partial() {
        let config = ExplorerConfig::from_json_str(
            r#"{"store": {"kind": "parquet", "dir": "/tmp/runs"}, "palette": ["black"]}"#,
        )
        .unwrap();
        assert_eq!(
            config.store,
            StoreLocation::Parquet {
                dir: PathBuf::from("/tmp/runs")
            }
        );
        assert_eq!(config.palette, vec!["black"]);
        assert_eq!(config.detail_color, "green");
    }

    #[test]
    fn test_partial_plot_objects_keep_their_own_defaults() {
        let config = ExplorerConfig::from_json_str(
            r#"{"detail": {"title": "Mine"}, "overview": {"width": 640}}"#,
        )
        .unwrap();

        assert_eq!(config.detail.title, "Mine");
        assert_eq!(config.detail.y_label, "Number of Unique Expressions");
        assert!(!config.detail.tools.contains(&"tap".to_string()));
        assert_eq!(config.detail.width, 1800);

        assert_eq!(config.overview.width, 640);
        assert_eq!(config.overview.y_label, "Unique Entropy");
        assert!(config.overview.tools.contains(&"tap".to_string()));
    }

    #[test]
    fn test_json_round_trip_keeps_plots() {
        let config = ExplorerConfig::builder()
            .detail(PlotConfig {
                tools: vec!["reset".to_string()],
                ..PlotConfig::detail()
            })
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ExplorerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_from_json_rejects_empty_palette() {
        let err = ExplorerConfig::from_json_str(r#"{"palette": []}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            ExplorerConfig::from_json_str("{not json").unwrap_err(),
            Error::Json(_)
        ));
    }

    #[test]
    fn test_builder() {
        let config = ExplorerConfig::builder()
            .palette(["red", "blue"])
            .detail_color("black")
            .line_width(1.5)
            .intro("Runs")
            .build()
            .unwrap();
        assert_eq!(config.palette, vec!["red", "blue"]);
        assert_eq!(config.detail_color, "black");
        assert_eq!(config.intro, "Runs");
    }

    #[test]
    fn test_builder_rejects_zero_size() {
        let plot = PlotConfig {
            width: 0,
            ..PlotConfig::overview()
        };
        assert!(ExplorerConfig::builder().overview(plot).build().is_err());
    }

    #[test]
    fn test_memory_location_opens() {
        let store = StoreLocation::Memory.open().unwrap();
        assert!(store.list_tables().unwrap().is_empty());
    }
}
