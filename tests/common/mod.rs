//! Shared test fixtures for the catalog integration tests.
//!
//! Provides `setup_catalog()` which builds an offline [`Catalog`] backed by a
//! temporary cache directory and populates small sample tables
//! (pokemon_cards, pokemon_expansions, pokemon_sealed plus the Japanese
//! variants) via NDJSON temp files.

use std::io::Write;
use std::time::Duration;

use cardfolio_catalog::{Catalog, Store};
use tempfile::NamedTempFile;

/// Build an offline `Catalog` with sample data loaded into DuckDB tables.
///
/// Returns `(Catalog, tempfile::TempDir)`. The caller must keep the
/// `TempDir` alive for the duration of the test so the cache directory is
/// not deleted prematurely.
pub fn setup_catalog() -> (Catalog, tempfile::TempDir) {
    setup_catalog_with_ttl(Duration::from_secs(300))
}

/// Same as [`setup_catalog`] but with a custom result-cache TTL.
pub fn setup_catalog_with_ttl(ttl: Duration) -> (Catalog, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::builder()
        .cache_dir(tmp_dir.path())
        .offline(true)
        .timeout(Duration::from_secs(30))
        .cache_ttl(ttl)
        .build()
        .unwrap();

    register_pokemon_cards(catalog.store());
    register_pokemon_expansions(catalog.store());
    register_pokemon_sealed(catalog.store());
    register_pokemon_jp(catalog.store());

    (catalog, tmp_dir)
}

/// An offline catalog with **no** tables registered: every snapshot lookup
/// fails, exercising the error-degradation paths.
pub fn setup_empty_catalog() -> (Catalog, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::builder()
        .cache_dir(tmp_dir.path())
        .offline(true)
        .build()
        .unwrap();
    (catalog, tmp_dir)
}

fn register_pokemon_cards(store: &Store) {
    let cards = vec![
        serde_json::json!({
            "id": "pkm-001",
            "name": "Bulbasaur - 001/132",
            "expansion_id": "exp-001",
            "expansion_name": "ME01: Mega Evolution",
            "number": "1",
            "rarity": "Common",
            "supertype": "Pokémon",
            "artist": "Mitsuhiro Arita",
            "types": ["Grass"],
            "subtypes": ["Basic"],
            "weaknesses": ["Fire"],
            "resistances": [],
            "image_url": "https://img.cardfolio.app/pokemon/pkm-001.png",
            "release_date": "2025-09-26",
            "market_price": 1.25,
            "mid_price": 1.60,
            "low_price": 0.80,
            "graded_price": 24.00,
            "psa10_price": 31.50,
            "trend_7d": 2.5,
            "trend_30d": -1.0,
            "trend_90d": 4.75,
            "trend_180d": 10.0
        }),
        serde_json::json!({
            "id": "pkm-002",
            "name": "Ivysaur - 002/132",
            "expansion_id": "exp-001",
            "expansion_name": "ME01: Mega Evolution",
            "number": "2",
            "rarity": "Uncommon",
            "supertype": "Pokémon",
            "artist": "Mitsuhiro Arita",
            "types": ["Grass"],
            "subtypes": ["Stage 1"],
            "weaknesses": ["Fire"],
            "resistances": [],
            "image_url": "https://img.cardfolio.app/pokemon/pkm-002.png",
            "release_date": "2025-09-26",
            "market_price": 0.60,
            "mid_price": 0.75,
            "low_price": 0.40,
            "graded_price": null,
            "psa10_price": 18.00,
            "trend_7d": 0.0,
            "trend_30d": 1.2,
            "trend_90d": 0.0,
            "trend_180d": -3.4
        }),
        serde_json::json!({
            "id": "pkm-010",
            "name": "Venusaur ex - 010/132",
            "expansion_id": "exp-001",
            "expansion_name": "ME01: Mega Evolution",
            "number": "10",
            "rarity": "Rare Holo",
            "supertype": "Pokémon",
            "artist": "5ban Graphics",
            "types": ["Grass"],
            "subtypes": ["ex"],
            "weaknesses": ["Fire"],
            "resistances": ["Water"],
            "image_url": "https://img.cardfolio.app/pokemon/pkm-010.png",
            "release_date": "2025-09-26",
            "market_price": null,
            "mid_price": 42.00,
            "low_price": 30.00,
            "graded_price": 180.00,
            "psa10_price": 240.00,
            "trend_7d": 8.0,
            "trend_30d": 12.5,
            "trend_90d": 20.0,
            "trend_180d": 35.0
        }),
        serde_json::json!({
            "id": "pkm-025",
            "name": "Pikachu - 025/198",
            "expansion_id": "exp-002",
            "expansion_name": "SVP: Scarlet & Violet Promos",
            "number": "25",
            "rarity": "Promo",
            "supertype": "Pokémon",
            "artist": "Atsuko Nishida",
            "types": ["Lightning"],
            "subtypes": ["Basic"],
            "weaknesses": ["Fighting"],
            "resistances": ["Metal"],
            "image_url": "https://img.cardfolio.app/pokemon/pkm-025.png",
            "release_date": "2023-06-01",
            "market_price": 3.10,
            "mid_price": 3.90,
            "low_price": 2.20,
            "graded_price": 55.00,
            "psa10_price": 70.00,
            "trend_7d": -0.5,
            "trend_30d": 0.0,
            "trend_90d": 6.0,
            "trend_180d": 9.5
        }),
        serde_json::json!({
            "id": "pkm-tg05",
            "name": "Boss's Orders - TG05/TG30",
            "expansion_id": "exp-002",
            "expansion_name": "SVP: Scarlet & Violet Promos",
            "number": "TG05",
            "rarity": "Trainer Gallery",
            "supertype": "Trainer",
            "artist": "NC Empire",
            "types": [],
            "subtypes": ["Supporter"],
            "weaknesses": [],
            "resistances": [],
            "image_url": "https://img.cardfolio.app/pokemon/pkm-tg05.png",
            "release_date": "2023-06-01",
            "market_price": 12.00,
            "mid_price": 14.50,
            "low_price": 9.00,
            "graded_price": null,
            "psa10_price": null,
            "trend_7d": 0.0,
            "trend_30d": 0.0,
            "trend_90d": 0.0,
            "trend_180d": 0.0
        }),
    ];

    write_ndjson_and_register(store, "pokemon_cards", &cards);
}

fn register_pokemon_expansions(store: &Store) {
    let expansions = vec![
        serde_json::json!({
            "id": "exp-001",
            "code": "ME01",
            "name": "ME01: Mega Evolution",
            "series": "Scarlet & Violet",
            "release_date": "2025-09-26",
            "logo_url": "https://img.cardfolio.app/pokemon/exp-001-logo.png",
            "symbol_url": "https://img.cardfolio.app/pokemon/exp-001-symbol.png"
        }),
        serde_json::json!({
            "id": "exp-002",
            "code": "SVP",
            "name": "SVP: Scarlet & Violet Promos",
            "series": "Scarlet & Violet",
            "release_date": "2023-06-01",
            "logo_url": "https://img.cardfolio.app/pokemon/exp-002-logo.png",
            "symbol_url": "https://img.cardfolio.app/pokemon/exp-002-symbol.png"
        }),
        serde_json::json!({
            "id": "exp-003",
            "code": "TWM",
            "name": "Twilight Masquerade",
            "series": "Scarlet & Violet",
            "release_date": "2024-05-24",
            "logo_url": "https://img.cardfolio.app/pokemon/exp-003-logo.png",
            "symbol_url": "https://img.cardfolio.app/pokemon/exp-003-symbol.png"
        }),
    ];

    write_ndjson_and_register(store, "pokemon_expansions", &expansions);
}

fn register_pokemon_sealed(store: &Store) {
    let products = vec![
        serde_json::json!({
            "id": "seal-001",
            "name": "Mega Evolution Booster Box",
            "expansion_id": "exp-001",
            "expansion_name": "ME01: Mega Evolution",
            "image_url": "https://img.cardfolio.app/pokemon/seal-001.png",
            "release_date": "2025-09-26",
            "market_price": 129.99,
            "msrp": 161.64,
            "low_price": 118.00
        }),
        serde_json::json!({
            "id": "seal-002",
            "name": "Pikachu Collection Box",
            "expansion_id": "exp-002",
            "expansion_name": "SVP: Scarlet & Violet Promos",
            "image_url": "https://img.cardfolio.app/pokemon/seal-002.png",
            "release_date": "2023-06-01",
            "market_price": null,
            "msrp": 49.99,
            "low_price": 39.95
        }),
    ];

    write_ndjson_and_register(store, "pokemon_sealed", &products);
}

fn register_pokemon_jp(store: &Store) {
    let cards = vec![serde_json::json!({
        "id": "jp-001",
        "name": "Lillie's Clefairy ex - 056/064",
        "expansion_id": "jexp-001",
        "expansion_name": "SV11: Black Bolt",
        "number": "56",
        "rarity": "RR",
        "supertype": "Pokémon",
        "artist": "PLANETA Igarashi",
        "types": ["Psychic"],
        "subtypes": ["ex"],
        "weaknesses": ["Metal"],
        "resistances": [],
        "image_url": "https://img.cardfolio.app/pokemon-jp/jp-001.png",
        "release_date": "2025-06-06",
        "market_price": 88.00,
        "mid_price": 95.00,
        "low_price": 70.00,
        "graded_price": null,
        "psa10_price": 210.00,
        "trend_7d": 1.0,
        "trend_30d": 5.0,
        "trend_90d": 15.0,
        "trend_180d": 40.0
    })];

    let expansions = vec![serde_json::json!({
        "id": "jexp-001",
        "code": "SV11",
        "name": "SV11: Black Bolt",
        "series": "Scarlet & Violet",
        "release_date": "2025-06-06",
        "logo_url": "https://img.cardfolio.app/pokemon-jp/jexp-001-logo.png",
        "symbol_url": "https://img.cardfolio.app/pokemon-jp/jexp-001-symbol.png"
    })];

    write_ndjson_and_register(store, "pokemon_jp_cards", &cards);
    write_ndjson_and_register(store, "pokemon_jp_expansions", &expansions);
}

/// Write a slice of JSON values as NDJSON to a temp file and register it
/// as a DuckDB table via `Store::register_table_from_ndjson`.
pub fn write_ndjson_and_register(store: &Store, table_name: &str, rows: &[serde_json::Value]) {
    let mut file = NamedTempFile::new().unwrap();
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row).unwrap()).unwrap();
    }
    file.flush().unwrap();

    let path = file.path().to_str().unwrap();
    store.register_table_from_ndjson(table_name, path).unwrap();
    // NamedTempFile is dropped here, but DuckDB has already read the data
    // into an in-memory table, so this is fine.
}
