//! Service factory: resolves a game identifier to its service instance.
//!
//! The registry is built once by the catalog builder and owns each game's
//! static config, backend selection and private result caches. Resolution
//! never fails: unrecognized identifiers fall back to the default game's
//! service with a logged warning, so callers that need to distinguish
//! "supported" from "not supported" must use [`ServiceRegistry::is_supported`]
//! before dispatching.

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use crate::config::{self, GameConfig};
use crate::error::{CatalogError, Result};
use crate::services::api::{ApiGameService, RemoteConfig, RemoteState};
use crate::services::{DbGameService, GameService, ServiceCaches};
use crate::store::Store;

enum BackendKind {
    Database,
    Remote(RemoteState),
}

/// Everything the registry holds for one game: its immutable config, which
/// backend serves it, and the caches its service owns. Caches are private
/// per game, so cross-game key collisions are impossible by construction.
struct ServiceState {
    config: &'static GameConfig,
    backend: BackendKind,
    caches: ServiceCaches,
}

pub struct ServiceRegistry {
    states: HashMap<&'static str, ServiceState>,
    default_game: &'static str,
}

impl ServiceRegistry {
    /// Build states for every configured game, all database-backed, with
    /// result caches using the given TTL.
    pub fn new(cache_ttl: Duration) -> Self {
        let mut states = HashMap::new();
        for game in config::GAME_CONFIGS {
            states.insert(
                game.id,
                ServiceState {
                    config: game,
                    backend: BackendKind::Database,
                    caches: ServiceCaches::new(cache_ttl),
                },
            );
        }
        Self {
            states,
            default_game: config::DEFAULT_GAME,
        }
    }

    /// Serve the given game from the remote pricing API instead of the
    /// snapshot tables.
    pub fn set_remote_backend(&mut self, game_id: &str, remote: RemoteConfig) -> Result<()> {
        let state = self.states.get_mut(game_id).ok_or_else(|| {
            CatalogError::InvalidArgument(format!("unknown game id: {}", game_id))
        })?;
        state.backend = BackendKind::Remote(RemoteState::new(remote));
        Ok(())
    }

    /// Whether a game identifier has a registered service.
    pub fn is_supported(&self, game_id: &str) -> bool {
        self.states.contains_key(game_id)
    }

    /// Identifiers of all registered games, sorted.
    pub fn supported_games(&self) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self.states.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drop every cached result across all services.
    pub fn clear_caches(&self) {
        for state in self.states.values() {
            state.caches.clear();
        }
    }

    /// Resolve a game identifier to its service.
    ///
    /// Always succeeds: unrecognized identifiers resolve to the default
    /// game's service with a logged warning.
    pub fn resolve<'s>(&'s self, game_id: &str, store: &'s Store) -> Box<dyn GameService + 's> {
        let state = self.states.get(game_id).unwrap_or_else(|| {
            warn!(
                game = game_id,
                fallback = self.default_game,
                "unrecognized game id, falling back to default service"
            );
            &self.states[self.default_game]
        });

        match &state.backend {
            BackendKind::Database => {
                Box::new(DbGameService::new(state.config, store, &state.caches))
            }
            BackendKind::Remote(remote) => {
                Box::new(ApiGameService::new(state.config, remote, &state.caches))
            }
        }
    }
}
