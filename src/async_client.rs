//! Async wrapper around [`Catalog`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all catalog operations on a blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free.
//! DuckDB queries are CPU-bound but fast, making this approach efficient.
//!
//! # Example
//!
//! ```no_run
//! use cardfolio_catalog::{AsyncCatalog, QueryOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = AsyncCatalog::builder().build().await.unwrap();
//!
//!     // Run any sync catalog method via closure
//!     let page = catalog.run(|c| {
//!         Ok(c.service_for("pokemon").search_cards(&QueryOptions::default()))
//!     }).await.unwrap();
//!
//!     println!("{} cards", page.total);
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{CatalogError, Result};
use crate::services::RemoteConfig;
use crate::Catalog;

// ---------------------------------------------------------------------------
// AsyncCatalogBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncCatalog`] instance.
pub struct AsyncCatalogBuilder {
    cache_dir: Option<PathBuf>,
    offline: bool,
    timeout: Duration,
    cache_ttl: Duration,
    remote_backends: Vec<(String, RemoteConfig)>,
}

impl Default for AsyncCatalogBuilder {
    fn default() -> Self {
        Self {
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(120),
            cache_ttl: crate::config::DEFAULT_CACHE_TTL,
            remote_backends: Vec::new(),
        }
    }
}

impl AsyncCatalogBuilder {
    /// Set a custom snapshot cache directory.
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable offline mode.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the HTTP request timeout for CDN downloads.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the TTL for the per-service result caches.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Serve the given game from the remote pricing API.
    pub fn remote_backend(mut self, game_id: impl Into<String>, remote: RemoteConfig) -> Self {
        self.remote_backends.push((game_id.into(), remote));
        self
    }

    /// Build the async catalog, initializing the snapshot cache and the
    /// DuckDB store.
    ///
    /// Initialization runs on the blocking thread pool so it won't block
    /// the async event loop.
    pub async fn build(self) -> Result<AsyncCatalog> {
        tokio::task::spawn_blocking(move || {
            let mut builder = Catalog::builder();
            if let Some(dir) = self.cache_dir {
                builder = builder.cache_dir(dir);
            }
            builder = builder
                .offline(self.offline)
                .timeout(self.timeout)
                .cache_ttl(self.cache_ttl);
            for (game_id, remote) in self.remote_backends {
                builder = builder.remote_backend(game_id, remote);
            }
            let catalog = builder.build()?;
            Ok(AsyncCatalog {
                inner: Arc::new(Mutex::new(catalog)),
            })
        })
        .await
        .map_err(|e| CatalogError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncCatalog
// ---------------------------------------------------------------------------

/// Async wrapper around [`Catalog`].
///
/// All operations are dispatched to a blocking thread pool via
/// [`tokio::task::spawn_blocking`]. The underlying [`Catalog`] is protected
/// by a [`Mutex`] since it uses `RefCell` internally.
pub struct AsyncCatalog {
    inner: Arc<Mutex<Catalog>>,
}

impl AsyncCatalog {
    /// Create a new builder for configuring the async catalog.
    pub fn builder() -> AsyncCatalogBuilder {
        AsyncCatalogBuilder::default()
    }

    /// Run a sync catalog operation on the blocking thread pool.
    ///
    /// The closure receives a `&Catalog` reference and should return a
    /// `Result<T>`. The operation runs on a dedicated blocking thread,
    /// keeping the async event loop free.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use cardfolio_catalog::AsyncCatalog;
    /// # async fn example() -> cardfolio_catalog::Result<()> {
    /// # let catalog = AsyncCatalog::builder().build().await?;
    /// let pricing = catalog.run(|c| {
    ///     Ok(c.service_for("pokemon").get_pricing("swsh7-215"))
    /// }).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Catalog) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let catalog = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = catalog
                .lock()
                .map_err(|_| CatalogError::InvalidArgument("catalog lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| CatalogError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Execute a raw SQL query asynchronously.
    ///
    /// Convenience wrapper around [`run()`](Self::run) for [`Catalog::sql()`].
    pub async fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let query = query.to_string();
        let params = params.to_vec();
        self.run(move |c| c.sql(&query, &params)).await
    }

    /// Load and return the catalog metadata asynchronously.
    pub async fn meta(&self) -> Result<serde_json::Value> {
        self.run(|c| c.meta()).await
    }

    /// Check for a newer catalog version and reset local state if stale.
    pub async fn refresh(&self) -> Result<bool> {
        self.run(|c| c.refresh()).await
    }

    /// Identifiers of all registered games, sorted.
    pub async fn supported_games(&self) -> Result<Vec<&'static str>> {
        self.run(|c| Ok(c.supported_games())).await
    }
}
