//! # Soup-Scope: Experiment Result Store and Linked Plot Explorer
//!
//! **Version**: 0.1.0
//!
//! Soup-Scope persists the output of expression-soup simulations as
//! auto-numbered `experiment_<id>` tables and explores them through two linked
//! plots: an overview with one line per run, and a detail plot bound to the
//! run nearest the last tap.
//!
//! ## Data Flow
//!
//! ```text
//! TableStore ─▶ ExperimentStore ─▶ SeriesCatalog ─▶ RenderSurface ─▶ ChartBackend
//!                     ▲                                  │
//!              record_simulation              tap x ─▶ resolve ─▶ detail rebind
//! ```
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: Run ids are allocated past a persisted high-water
//!   mark, so a deleted run's id is never handed out again
//! - **Jidoka**: A failed persist drops its half-written table
//! - **Genchi Genbutsu**: Catalog metrics are recomputed from stored rows,
//!   never cached on disk
//!
//! ## Example Usage
//!
//! ```rust
//! use soup_scope::config::ExplorerConfig;
//! use soup_scope::render::HeadlessChart;
//! use soup_scope::Explorer;
//!
//! # fn main() -> soup_scope::Result<()> {
//! let mut explorer = Explorer::open(&ExplorerConfig::default())?;
//! explorer.store_mut().persist_run(1, &["\\x.x", "\\x.\\y.x"])?;
//! explorer.store_mut().persist_run(1, &["\\x.x"])?;
//!
//! let mut surface = explorer.surface(HeadlessChart::new())?;
//! let selected = surface.on_tap(1.0)?;
//! assert_eq!(selected.map(|id| id.get()), Some(1));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod experiment;
pub mod render;
pub mod selection;
pub mod simulation;
pub mod storage;

pub use error::{Error, Result};

use catalog::SeriesCatalog;
use config::ExplorerConfig;
use experiment::ExperimentStore;
use render::{ChartBackend, RenderSurface};
use storage::TableStore;

/// Store plus configuration, opened from an [`ExplorerConfig`].
pub struct Explorer {
    config: ExplorerConfig,
    store: ExperimentStore<Box<dyn TableStore>>,
}

impl Explorer {
    /// Validate the configuration and open its store.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the store cannot be opened
    pub fn open(config: &ExplorerConfig) -> Result<Self> {
        config.validate()?;
        let store = ExperimentStore::new(config.store.open()?);
        Ok(Self {
            config: config.clone(),
            store,
        })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// Experiment store
    #[must_use]
    pub const fn store(&self) -> &ExperimentStore<Box<dyn TableStore>> {
        &self.store
    }

    /// Experiment store, for persisting runs
    pub fn store_mut(&mut self) -> &mut ExperimentStore<Box<dyn TableStore>> {
        &mut self.store
    }

    /// Build a fresh catalog of every stored run.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot list its runs
    pub fn catalog(&self) -> Result<SeriesCatalog> {
        SeriesCatalog::build(&self.store)
    }

    /// Build a catalog and bind it to a chart backend.
    ///
    /// # Errors
    ///
    /// Returns error if the catalog cannot be built or the backend rejects a mark
    pub fn surface<B: ChartBackend>(&self, backend: B) -> Result<RenderSurface<B>> {
        RenderSurface::new(backend, &self.config, self.catalog()?)
    }
}

impl std::fmt::Debug for Explorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
