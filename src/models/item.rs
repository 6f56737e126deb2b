use serde::{Deserialize, Serialize};

use super::pricing::PricingBlock;

// ---------------------------------------------------------------------------
// CatalogItem — the normalized view model every backend produces
// ---------------------------------------------------------------------------

/// Whether an item is a single card or a packaged, unopened product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Single,
    Sealed,
}

/// A catalog entry with consistent field names regardless of which backend
/// or table produced it. Every item handed to the UI layer has exactly this
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    /// Display name, cleaned of structural suffixes.
    pub name: String,
    pub expansion_id: Option<String>,
    pub expansion_name: Option<String>,
    pub number: Option<String>,
    pub rarity: Option<String>,
    pub image_url: Option<String>,
    pub kind: ItemKind,
    /// Provenance: the backend table or remote endpoint that produced this
    /// item.
    pub source: String,
    pub pricing: PricingBlock,
}
