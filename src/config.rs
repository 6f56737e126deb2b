use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const CDN_BASE: &str = "https://data.cardfolio.app/catalog/v1";
pub const META_URL: &str = "https://data.cardfolio.app/catalog/v1/meta.json";

/// How long a cached query result stays visible before it is treated as
/// absent and lazily evicted.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Row cap for the client-side numeric sort path. Capping bounds the cost of
/// fetching the superset; `total` reported on that path is clamped to this
/// value, which is an accepted approximation for large catalogs.
pub const NUMERIC_SORT_FETCH_CAP: usize = 1000;

// ---------------------------------------------------------------------------
// Feature flags
// ---------------------------------------------------------------------------

/// Optional capabilities a game's catalog may or may not carry.
///
/// A service must only answer operations for features listed in its static
/// [`GameConfig`]; gated operations on an unsupported game return empty
/// results without touching the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Pricing,
    SealedProducts,
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Static per-game descriptor: identifier, backend table names and feature
/// flags. Constructed once at module load and immutable thereafter; each
/// service state owns a reference to exactly one of these.
#[derive(Debug)]
pub struct GameConfig {
    pub id: &'static str,
    pub display_name: &'static str,
    pub cards_table: &'static str,
    pub expansions_table: &'static str,
    pub sealed_table: Option<&'static str>,
    pub features: &'static [Feature],
}

impl GameConfig {
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }
}

/// All games the catalog ships services for.
pub const GAME_CONFIGS: &[GameConfig] = &[
    GameConfig {
        id: "pokemon",
        display_name: "Pokémon TCG (International)",
        cards_table: "pokemon_cards",
        expansions_table: "pokemon_expansions",
        sealed_table: Some("pokemon_sealed"),
        features: &[Feature::Pricing, Feature::SealedProducts],
    },
    GameConfig {
        id: "pokemon-jp",
        display_name: "Pokémon TCG (Japan)",
        cards_table: "pokemon_jp_cards",
        expansions_table: "pokemon_jp_expansions",
        sealed_table: None,
        features: &[Feature::Pricing],
    },
];

/// Game the factory falls back to when asked for an unrecognized identifier.
pub const DEFAULT_GAME: &str = "pokemon";

pub fn game_config(id: &str) -> Option<&'static GameConfig> {
    GAME_CONFIGS.iter().find(|c| c.id == id)
}

// ---------------------------------------------------------------------------
// Snapshot file layout on the CDN
// ---------------------------------------------------------------------------

pub fn snapshot_files() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("pokemon_cards", "parquet/pokemon/cards.parquet"),
        ("pokemon_expansions", "parquet/pokemon/expansions.parquet"),
        ("pokemon_sealed", "parquet/pokemon/sealed.parquet"),
        ("pokemon_jp_cards", "parquet/pokemon-jp/cards.parquet"),
        ("pokemon_jp_expansions", "parquet/pokemon-jp/expansions.parquet"),
    ])
}

pub fn json_files() -> HashMap<&'static str, &'static str> {
    HashMap::from([("meta", "meta.json")])
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("cardfolio-catalog")
    } else {
        PathBuf::from(".cardfolio-catalog-cache")
    }
}
