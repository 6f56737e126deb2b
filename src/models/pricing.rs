use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TrendSet — fixed four-bucket price trend shape
// ---------------------------------------------------------------------------

/// Percent price change over the four fixed windows. Buckets missing from
/// the source row default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendSet {
    #[serde(rename = "7d", default)]
    pub days_7: f64,
    #[serde(rename = "30d", default)]
    pub days_30: f64,
    #[serde(rename = "90d", default)]
    pub days_90: f64,
    #[serde(rename = "180d", default)]
    pub days_180: f64,
}

// ---------------------------------------------------------------------------
// PricingBlock
// ---------------------------------------------------------------------------

/// Normalized pricing for one item: raw and graded market value in integer
/// cents plus the trend buckets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBlock {
    pub market_cents: i64,
    pub graded_cents: i64,
    pub trends: TrendSet,
}
