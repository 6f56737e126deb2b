//! Cardfolio catalog SDK.
//!
//! Data-access layer for the Cardfolio collection tracker: per-game catalog
//! search, expansion listings, sealed products and pricing behind a uniform
//! service contract. Catalog snapshots are downloaded from the CDN as
//! parquet files, cached locally, and queried in-process via DuckDB; games
//! can alternatively be served by the hosted pricing API.
//!
//! # Quick start
//!
//! ```no_run
//! use cardfolio_catalog::{Catalog, QueryOptions};
//!
//! let catalog = Catalog::builder().build().unwrap();
//!
//! let pokemon = catalog.service_for("pokemon");
//! let page = pokemon.search_cards(&QueryOptions {
//!     search: Some("charizard".into()),
//!     ..QueryOptions::default()
//! });
//! println!("{} of {} cards", page.data.len(), page.total);
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod query;
pub mod registry;
pub mod services;
pub mod snapshot;
pub mod sql_builder;
pub mod store;

#[cfg(feature = "async")]
pub use async_client::AsyncCatalog;
pub use cache::TtlCache;
pub use config::{Feature, GameConfig};
pub use error::{CatalogError, Result};
pub use models::{CatalogItem, Expansion, ItemKind, PricingBlock, TrendSet};
pub use query::{Filters, Page, QueryOptions, SortOrder};
pub use registry::ServiceRegistry;
pub use services::{ApiGameService, DbGameService, GameService, RemoteConfig};
pub use snapshot::SnapshotManager;
pub use sql_builder::SqlBuilder;
pub use store::Store;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

// ---------------------------------------------------------------------------
// CatalogBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`Catalog`] instance.
///
/// Use [`Catalog::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](CatalogBuilder::build) to create the
/// catalog.
pub struct CatalogBuilder {
    cache_dir: Option<PathBuf>,
    offline: bool,
    timeout: Duration,
    cache_ttl: Duration,
    remote_backends: Vec<(String, RemoteConfig)>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self {
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(120),
            cache_ttl: config::DEFAULT_CACHE_TTL,
            remote_backends: Vec::new(),
        }
    }
}

impl CatalogBuilder {
    /// Set a custom snapshot cache directory.
    ///
    /// If not set, the platform-appropriate default cache directory is used
    /// (e.g. `~/.cache/cardfolio-catalog` on Linux).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable offline mode.
    ///
    /// When offline, the catalog never downloads from the CDN and only uses
    /// previously cached snapshot files. Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the HTTP request timeout for CDN downloads.
    ///
    /// Defaults to 120 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the TTL for the per-service result caches.
    ///
    /// Defaults to five minutes.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Serve the given game from the remote pricing API instead of the
    /// local snapshot tables.
    pub fn remote_backend(mut self, game_id: impl Into<String>, remote: RemoteConfig) -> Self {
        self.remote_backends.push((game_id.into(), remote));
        self
    }

    /// Build the catalog, initializing the snapshot cache, the DuckDB store
    /// and the service registry.
    ///
    /// This may trigger a version check against the CDN (unless offline mode
    /// is enabled) but does **not** download any snapshot eagerly -- they
    /// are fetched lazily on first query.
    pub fn build(self) -> Result<Catalog> {
        let snapshots = SnapshotManager::new(self.cache_dir, self.offline, self.timeout)?;
        let store = Store::new(snapshots)?;
        let mut registry = ServiceRegistry::new(self.cache_ttl);
        for (game_id, remote) in self.remote_backends {
            registry.set_remote_backend(&game_id, remote)?;
        }
        Ok(Catalog { store, registry })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The main entry point for the catalog SDK.
///
/// Owns the [`Store`] (which owns the [`SnapshotManager`] and the DuckDB
/// database) and the [`ServiceRegistry`]; game services are handed out as
/// lightweight borrowing wrappers.
///
/// Created via [`Catalog::builder()`].
pub struct Catalog {
    store: Store,
    registry: ServiceRegistry,
}

impl Catalog {
    /// Create a new builder for configuring the catalog.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    // -- Service resolution ------------------------------------------------

    /// Resolve the service for a game identifier.
    ///
    /// Never fails: unrecognized identifiers resolve to the default game's
    /// service with a logged warning. Use [`is_supported`](Self::is_supported)
    /// first when "not supported" must be distinguished from "supported".
    pub fn service_for(&self, game_id: &str) -> Box<dyn GameService + '_> {
        self.registry.resolve(game_id, &self.store)
    }

    /// Whether a game identifier has a registered service.
    pub fn is_supported(&self, game_id: &str) -> bool {
        self.registry.is_supported(game_id)
    }

    /// Identifiers of all registered games, sorted.
    pub fn supported_games(&self) -> Vec<&'static str> {
        self.registry.supported_games()
    }

    // -- Metadata and utility methods --------------------------------------

    /// Load and return the catalog metadata (version, publish date, etc.).
    ///
    /// Fetches `meta.json` from the snapshot cache (downloading if
    /// necessary) and returns the parsed JSON object.
    pub fn meta(&self) -> Result<serde_json::Value> {
        self.store.snapshots.borrow_mut().load_json("meta")
    }

    /// Return the list of currently registered backend table names.
    ///
    /// Tables are registered lazily on first query, so this list grows as
    /// different services are used.
    pub fn tables(&self) -> Vec<String> {
        self.store.tables()
    }

    /// Execute a raw SQL query against the DuckDB store.
    ///
    /// Provides escape-hatch access for queries not covered by the game
    /// services.
    ///
    /// # Arguments
    ///
    /// * `query` - SQL string with `?` positional placeholders.
    /// * `params` - Parameter values corresponding to the placeholders.
    pub fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.store.execute(query, params)
    }

    /// Check for a newer catalog version and reset local state if stale.
    ///
    /// Returns `true` if the data was stale -- the snapshot cache is
    /// cleared, registered tables are reset (so subsequent queries
    /// re-download data) and every service result cache is dropped --
    /// or `false` if already up to date.
    pub fn refresh(&self) -> Result<bool> {
        let stale = self.store.snapshots.borrow_mut().is_stale()?;
        if stale {
            self.store.snapshots.borrow().clear()?;
            self.store.reset_tables();
            self.registry.clear_caches();
            info!("catalog snapshots were stale; cache cleared and tables reset");
        }
        Ok(stale)
    }

    /// Consume the catalog and release all resources.
    ///
    /// Closes the DuckDB connection and HTTP clients. This is called
    /// automatically when the catalog is dropped, but can be invoked
    /// explicitly for deterministic cleanup.
    pub fn close(self) {
        drop(self);
    }

    /// Return a reference to the underlying [`Store`] for advanced usage.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.store.tables();
        let snapshots = self.store.snapshots.borrow();
        write!(
            f,
            "Catalog(cache_dir={}, games=[{}], tables=[{}], offline={})",
            snapshots.cache_dir.display(),
            self.supported_games().join(", "),
            tables.join(", "),
            snapshots.offline
        )
    }
}
