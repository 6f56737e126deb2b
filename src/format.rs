//! Row formatters: map raw backend rows into the normalized view models.
//!
//! Pure functions, one variant per source-table shape. The price column
//! priority orders and the name-cleaning rules are part of the public
//! contract — downstream grouping and search depend on the cleaned text,
//! and the priority order determines which price the user sees.

use serde_json::Value;

use crate::models::{CatalogItem, Expansion, ItemKind, PricingBlock, TrendSet};
use crate::store::Row;

// ---------------------------------------------------------------------------
// Price column priorities (fixed per table shape)
// ---------------------------------------------------------------------------

/// Raw-card market value sources, highest priority first.
pub const CARD_RAW_PRICE_COLUMNS: &[&str] = &["market_price", "marketPrice", "mid_price", "low_price"];

/// Graded-card market value sources, highest priority first.
pub const CARD_GRADED_PRICE_COLUMNS: &[&str] =
    &["graded_price", "gradedPrice", "psa10_price", "bgs10_price"];

/// Sealed products price differently: fall back to MSRP before the low sale.
pub const SEALED_RAW_PRICE_COLUMNS: &[&str] = &["market_price", "marketPrice", "msrp", "low_price"];

const TREND_COLUMNS: &[(&str, &str)] = &[
    ("trend_7d", "trend7d"),
    ("trend_30d", "trend30d"),
    ("trend_90d", "trend90d"),
    ("trend_180d", "trend180d"),
];

// ---------------------------------------------------------------------------
// Field access helpers
// ---------------------------------------------------------------------------

/// First non-null string value among the aliased columns.
///
/// Alias lists cover both the snapshot column names (snake_case) and the
/// remote API's camelCase variants, so the same formatter serves both
/// backends.
fn str_field(row: &Row, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find_map(|v| v.as_str().map(|s| s.to_string()))
}

/// First non-null numeric value among the aliased columns. Numeric strings
/// parse too (older snapshots exported prices as text).
fn num_field(row: &Row, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match row.get(*key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(parsed) = s.trim().parse::<f64>() {
                    return Some(parsed);
                }
            }
            _ => continue,
        }
    }
    None
}

/// Round a decimal price to integer cents.
pub fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

// ---------------------------------------------------------------------------
// Name cleaning
// ---------------------------------------------------------------------------

fn looks_like_card_number(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric())
        && s.chars().any(|c| c.is_ascii_digit())
}

/// Strip a trailing `" - <num>/<num>"` card-number annotation from a display
/// name: `"Bulbasaur - 001/132"` becomes `"Bulbasaur"`. Names without the
/// annotation pass through unchanged, so cleaning is idempotent.
pub fn clean_card_name(raw: &str) -> String {
    if let Some(idx) = raw.rfind(" - ") {
        let suffix = &raw[idx + 3..];
        if let Some((num, denom)) = suffix.split_once('/') {
            if looks_like_card_number(num) && looks_like_card_number(denom) {
                return raw[..idx].trim_end().to_string();
            }
        }
    }
    raw.trim().to_string()
}

/// Strip a leading `"<CODE>: "` set-code prefix from an expansion name:
/// `"ME01: Mega Evolution"` becomes `"Mega Evolution"`. Prefixes longer than
/// a set code, or containing non-alphanumeric characters, are left alone
/// (so `"Sword & Shield: Evolving Skies"`-style subtitles survive).
pub fn clean_expansion_name(raw: &str) -> String {
    if let Some((prefix, rest)) = raw.split_once(": ") {
        if (1..=8).contains(&prefix.len()) && prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return rest.trim().to_string();
        }
    }
    raw.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Derive the normalized pricing block from a raw row.
///
/// `raw_priority` and `graded_priority` are probed in order; the first
/// non-null column wins. Trend buckets missing from the row default to zero.
pub fn pricing_block(row: &Row, raw_priority: &[&str], graded_priority: &[&str]) -> PricingBlock {
    let market = num_field(row, raw_priority).unwrap_or(0.0);
    let graded = num_field(row, graded_priority).unwrap_or(0.0);

    let mut buckets = [0.0f64; 4];
    for (i, (snake, camel)) in TREND_COLUMNS.iter().copied().enumerate() {
        buckets[i] = num_field(row, &[snake, camel]).unwrap_or(0.0);
    }

    PricingBlock {
        market_cents: to_cents(market),
        graded_cents: to_cents(graded),
        trends: TrendSet {
            days_7: buckets[0],
            days_30: buckets[1],
            days_90: buckets[2],
            days_180: buckets[3],
        },
    }
}

// ---------------------------------------------------------------------------
// Row -> view model
// ---------------------------------------------------------------------------

/// Format a single-card row into a [`CatalogItem`].
///
/// `source` records the producing table or endpoint (provenance).
pub fn card_item(row: &Row, source: &str) -> CatalogItem {
    CatalogItem {
        id: str_field(row, &["id", "uuid"]).unwrap_or_default(),
        name: clean_card_name(&str_field(row, &["name"]).unwrap_or_default()),
        expansion_id: str_field(row, &["expansion_id", "expansionId"]),
        expansion_name: str_field(row, &["expansion_name", "expansionName"])
            .map(|n| clean_expansion_name(&n)),
        number: str_field(row, &["number"]),
        rarity: str_field(row, &["rarity"]),
        image_url: str_field(row, &["image_url", "imageUrl", "image"]),
        kind: ItemKind::Single,
        source: source.to_string(),
        pricing: pricing_block(row, CARD_RAW_PRICE_COLUMNS, CARD_GRADED_PRICE_COLUMNS),
    }
}

/// Format a sealed-product row into a [`CatalogItem`].
///
/// Sealed rows have no card number or rarity and use the sealed price
/// priority (market, then MSRP, then low sale).
pub fn sealed_item(row: &Row, source: &str) -> CatalogItem {
    CatalogItem {
        id: str_field(row, &["id", "uuid"]).unwrap_or_default(),
        name: clean_card_name(&str_field(row, &["name"]).unwrap_or_default()),
        expansion_id: str_field(row, &["expansion_id", "expansionId"]),
        expansion_name: str_field(row, &["expansion_name", "expansionName"])
            .map(|n| clean_expansion_name(&n)),
        number: None,
        rarity: None,
        image_url: str_field(row, &["image_url", "imageUrl", "image"]),
        kind: ItemKind::Sealed,
        source: source.to_string(),
        pricing: pricing_block(row, SEALED_RAW_PRICE_COLUMNS, &[]),
    }
}

/// Format an expansion (set/series) row.
///
/// `total_cards` is taken from the row when the backend embeds it (the
/// remote API does); the database services overwrite it afterwards with a
/// per-expansion count query.
pub fn expansion(row: &Row, source: &str) -> Expansion {
    Expansion {
        id: str_field(row, &["id", "uuid"]).unwrap_or_default(),
        code: str_field(row, &["code"]).unwrap_or_default(),
        name: clean_expansion_name(&str_field(row, &["name"]).unwrap_or_default()),
        series: str_field(row, &["series"]),
        release_date: str_field(row, &["release_date", "releaseDate"]),
        logo_url: str_field(row, &["logo_url", "logoUrl"]),
        symbol_url: str_field(row, &["symbol_url", "symbolUrl"]),
        total_cards: num_field(row, &["total_cards", "totalCards", "card_count", "cardCount"])
            .map(|n| n as i64)
            .unwrap_or(0),
        source: source.to_string(),
    }
}
