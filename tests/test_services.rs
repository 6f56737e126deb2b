//! Game service integration tests against in-memory sample data.

mod common;

use std::cell::Cell;
use std::time::Duration;

use cardfolio_catalog::services::enrich_total_cards;
use cardfolio_catalog::{CatalogError, Expansion, Feature, ItemKind, QueryOptions, SortOrder};

// ---------------------------------------------------------------------------
// search_cards
// ---------------------------------------------------------------------------

#[test]
fn search_cards_returns_formatted_items() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    let page = svc.search_cards(&QueryOptions {
        search: Some("bulba".into()),
        ..QueryOptions::default()
    });

    assert_eq!(page.total, 1);
    let item = &page.data[0];
    assert_eq!(item.id, "pkm-001");
    assert_eq!(item.name, "Bulbasaur"); // number annotation stripped
    assert_eq!(item.expansion_name.as_deref(), Some("Mega Evolution"));
    assert_eq!(item.kind, ItemKind::Single);
    assert_eq!(item.source, "pokemon_cards");
    assert_eq!(item.pricing.market_cents, 125);
}

#[test]
fn search_cards_numeric_number_sort() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    let page = svc.get_cards_by_expansion(
        "exp-001",
        &QueryOptions {
            page_size: 10,
            sort_by: Some("number".into()),
            sort_order: SortOrder::Asc,
            ..QueryOptions::default()
        },
    );

    let numbers: Vec<&str> = page
        .data
        .iter()
        .map(|i| i.number.as_deref().unwrap())
        .collect();
    assert_eq!(numbers, vec!["1", "2", "10"]);
}

#[test]
fn search_cards_backend_error_degrades_to_empty_page() {
    // No tables registered and offline: every query path fails underneath.
    let (catalog, _tmp) = common::setup_empty_catalog();
    let svc = catalog.service_for("pokemon");

    let page = svc.search_cards(&QueryOptions::default());
    assert!(page.data.is_empty());
    assert_eq!(page.total, 0);
    assert_eq!(page.total_pages, 0);
    assert!(!page.has_more);
}

// ---------------------------------------------------------------------------
// get_card_by_id / get_pricing
// ---------------------------------------------------------------------------

#[test]
fn get_card_by_id_finds_existing_card() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    let item = svc.get_card_by_id("pkm-025").unwrap();
    assert_eq!(item.name, "Pikachu");
    assert_eq!(item.expansion_id.as_deref(), Some("exp-002"));
}

#[test]
fn get_card_by_id_returns_none_for_unknown() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    assert!(svc.get_card_by_id("nonexistent").is_none());
}

#[test]
fn get_card_by_id_returns_none_on_backend_error() {
    let (catalog, _tmp) = common::setup_empty_catalog();
    let svc = catalog.service_for("pokemon");

    assert!(svc.get_card_by_id("pkm-001").is_none());
}

#[test]
fn get_pricing_applies_price_priority() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    // pkm-010 has a null market_price; mid_price (42.00) wins
    let block = svc.get_pricing("pkm-010").unwrap();
    assert_eq!(block.market_cents, 4200);
    assert_eq!(block.graded_cents, 18000);
    assert_eq!(block.trends.days_90, 20.0);
}

#[test]
fn get_pricing_returns_none_for_unknown_card() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    assert!(svc.get_pricing("nonexistent").is_none());
}

// ---------------------------------------------------------------------------
// get_expansions
// ---------------------------------------------------------------------------

#[test]
fn get_expansions_enriches_total_cards() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    let page = svc.get_expansions(&QueryOptions {
        page_size: 10,
        ..QueryOptions::default()
    });
    assert_eq!(page.total, 3);

    let by_id = |id: &str| page.data.iter().find(|e| e.id == id).unwrap();
    assert_eq!(by_id("exp-001").total_cards, 3);
    assert_eq!(by_id("exp-002").total_cards, 2);
    assert_eq!(by_id("exp-003").total_cards, 0); // no cards in this set

    // Default ordering is release date, newest first
    assert_eq!(page.data[0].id, "exp-001");
    assert_eq!(page.data[1].id, "exp-003");
    assert_eq!(page.data[2].id, "exp-002");
}

#[test]
fn get_expansions_cleans_code_prefixed_names() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    let page = svc.get_expansions(&QueryOptions {
        page_size: 10,
        ..QueryOptions::default()
    });
    let me01 = page.data.iter().find(|e| e.code == "ME01").unwrap();
    assert_eq!(me01.name, "Mega Evolution");
}

#[test]
fn one_failed_count_degrades_only_its_own_expansion() {
    let mk = |id: &str| Expansion {
        id: id.into(),
        code: id.to_uppercase(),
        name: format!("Set {}", id),
        series: None,
        release_date: None,
        logo_url: None,
        symbol_url: None,
        total_cards: 0,
        source: "pokemon_expansions".into(),
    };
    let mut expansions = vec![mk("a"), mk("b"), mk("c")];

    let calls = Cell::new(0);
    enrich_total_cards(&mut expansions, |id| {
        calls.set(calls.get() + 1);
        if id == "b" {
            Err(CatalogError::NotFound("count query failed".into()))
        } else {
            Ok(7)
        }
    });

    assert_eq!(calls.get(), 3); // the failure did not cancel the siblings
    assert_eq!(expansions[0].total_cards, 7);
    assert_eq!(expansions[1].total_cards, 0);
    assert_eq!(expansions[2].total_cards, 7);
}

// ---------------------------------------------------------------------------
// Sealed products and feature gating
// ---------------------------------------------------------------------------

#[test]
fn sealed_search_returns_products_for_supporting_game() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");
    assert!(svc.has_feature(Feature::SealedProducts));

    let page = svc.search_sealed_products(&QueryOptions::default());
    assert_eq!(page.total, 2);
    assert!(page.data.iter().all(|i| i.kind == ItemKind::Sealed));

    // MSRP fallback when market price is null
    let box_item = page.data.iter().find(|i| i.id == "seal-002").unwrap();
    assert_eq!(box_item.pricing.market_cents, 4999);
}

#[test]
fn sealed_by_expansion_scopes_to_the_expansion() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon");

    let page = svc.get_sealed_by_expansion("exp-001", &QueryOptions::default());
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].id, "seal-001");
}

#[test]
fn unsupported_sealed_feature_returns_empty_without_backend_call() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon-jp");
    assert!(!svc.has_feature(Feature::SealedProducts));

    let page = svc.search_sealed_products(&QueryOptions::default());
    assert!(page.data.is_empty());
    assert_eq!(page.total, 0);

    let page = svc.get_sealed_by_expansion("jexp-001", &QueryOptions::default());
    assert!(page.data.is_empty());
    assert_eq!(page.total, 0);

    // No sealed table was ever registered for the Japanese catalog
    assert!(!catalog.tables().iter().any(|t| t.contains("sealed") && t.contains("jp")));
}

#[test]
fn japanese_variant_serves_its_own_tables() {
    let (catalog, _tmp) = common::setup_catalog();
    let svc = catalog.service_for("pokemon-jp");

    let page = svc.search_cards(&QueryOptions::default());
    assert_eq!(page.total, 1);
    assert_eq!(page.data[0].name, "Lillie's Clefairy ex");
    assert_eq!(page.data[0].source, "pokemon_jp_cards");
}

// ---------------------------------------------------------------------------
// Result caching
// ---------------------------------------------------------------------------

#[test]
fn identical_queries_are_served_from_cache() {
    let (catalog, _tmp) = common::setup_catalog();
    let opts = QueryOptions::default();

    let first = catalog.service_for("pokemon").search_cards(&opts);
    assert_eq!(first.total, 5);

    // Swap the underlying table out; a cached result must not notice.
    common::write_ndjson_and_register(
        catalog.store(),
        "pokemon_cards",
        &[serde_json::json!({
            "id": "pkm-999",
            "name": "Mew - 151/165",
            "expansion_id": "exp-002",
            "expansion_name": "SVP: Scarlet & Violet Promos",
            "number": "151",
            "rarity": "Secret",
            "supertype": "Pokémon",
            "artist": "Sowsow",
            "types": ["Psychic"],
            "subtypes": ["Basic"],
            "weaknesses": ["Darkness"],
            "resistances": [],
            "image_url": null,
            "release_date": "2023-06-01",
            "market_price": 20.0,
            "mid_price": null,
            "low_price": null,
            "graded_price": null,
            "psa10_price": null,
            "trend_7d": 0.0,
            "trend_30d": 0.0,
            "trend_90d": 0.0,
            "trend_180d": 0.0
        })],
    );

    let second = catalog.service_for("pokemon").search_cards(&opts);
    assert_eq!(second, first);

    // A different option set misses the cache and sees the new data.
    let fresh = catalog.service_for("pokemon").search_cards(&QueryOptions {
        page_size: 50,
        ..QueryOptions::default()
    });
    assert_eq!(fresh.total, 1);
    assert_eq!(fresh.data[0].id, "pkm-999");
}

#[test]
fn cache_entries_expire_after_the_ttl() {
    let (catalog, _tmp) = common::setup_catalog_with_ttl(Duration::from_millis(40));
    let opts = QueryOptions::default();

    let first = catalog.service_for("pokemon").search_cards(&opts);
    assert_eq!(first.total, 5);

    common::write_ndjson_and_register(
        catalog.store(),
        "pokemon_cards",
        &[serde_json::json!({
            "id": "pkm-999",
            "name": "Mew",
            "expansion_id": "exp-002",
            "expansion_name": "SVP: Scarlet & Violet Promos",
            "number": "151",
            "rarity": "Secret",
            "supertype": "Pokémon",
            "artist": "Sowsow",
            "types": ["Psychic"],
            "subtypes": [],
            "weaknesses": [],
            "resistances": [],
            "image_url": null,
            "release_date": "2023-06-01",
            "market_price": 20.0,
            "mid_price": null,
            "low_price": null,
            "graded_price": null,
            "psa10_price": null,
            "trend_7d": 0.0,
            "trend_30d": 0.0,
            "trend_90d": 0.0,
            "trend_180d": 0.0
        })],
    );

    std::thread::sleep(Duration::from_millis(60));
    let after = catalog.service_for("pokemon").search_cards(&opts);
    assert_eq!(after.total, 1);
}

#[test]
fn failed_queries_are_not_cached() {
    let (catalog, _tmp) = common::setup_empty_catalog();
    let opts = QueryOptions::default();

    let empty = catalog.service_for("pokemon").search_cards(&opts);
    assert_eq!(empty.total, 0);

    // Register the table after the failure; the next identical query must
    // see real data rather than a cached empty page.
    common::write_ndjson_and_register(
        catalog.store(),
        "pokemon_cards",
        &[serde_json::json!({
            "id": "pkm-001",
            "name": "Bulbasaur - 001/132",
            "expansion_id": "exp-001",
            "expansion_name": "ME01: Mega Evolution",
            "number": "1",
            "rarity": "Common",
            "supertype": "Pokémon",
            "artist": "Mitsuhiro Arita",
            "types": ["Grass"],
            "subtypes": [],
            "weaknesses": [],
            "resistances": [],
            "image_url": null,
            "release_date": "2025-09-26",
            "market_price": 1.25,
            "mid_price": null,
            "low_price": null,
            "graded_price": null,
            "psa10_price": null,
            "trend_7d": 0.0,
            "trend_30d": 0.0,
            "trend_90d": 0.0,
            "trend_180d": 0.0
        })],
    );

    let retry = catalog.service_for("pokemon").search_cards(&opts);
    assert_eq!(retry.total, 1);
}
