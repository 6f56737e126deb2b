use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Expansion — a release set/series within a game
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expansion {
    pub id: String,
    pub code: String,
    /// Display name, cleaned of `"<CODE>: "` prefixes.
    pub name: String,
    pub series: Option<String>,
    pub release_date: Option<String>,
    pub logo_url: Option<String>,
    pub symbol_url: Option<String>,
    /// Derived card count; degrades to 0 when the count query for this
    /// expansion fails.
    #[serde(default)]
    pub total_cards: i64,
    pub source: String,
}
