//! Per-game services behind a uniform capability contract.
//!
//! Each supported game gets one service implementing [`GameService`],
//! selected through the registry rather than subclassing: the database
//! variant ([`DbGameService`]) queries catalog snapshot tables through the
//! store, the remote variant ([`ApiGameService`]) speaks to the pricing API
//! over HTTP. Both compose query execution, row formatting and a private
//! per-namespace result cache.
//!
//! Every public operation has a documented non-throwing failure value:
//! backend errors degrade to empty pages (logged), missing entities to
//! `None`, unsupported optional capabilities to empty results without a
//! backend call. Callers debugging apparent "no results" should check the
//! logs.

pub mod api;
pub mod db;

pub use api::{ApiGameService, RemoteConfig};
pub use db::DbGameService;

use std::cell::RefCell;
use std::time::Duration;

use tracing::warn;

use crate::cache::TtlCache;
use crate::config::Feature;
use crate::error::Result;
use crate::models::{CatalogItem, Expansion, PricingBlock};
use crate::query::{Page, QueryOptions};

// ---------------------------------------------------------------------------
// GameService — the uniform per-game contract
// ---------------------------------------------------------------------------

/// Capability set every game service implements, independent of the
/// underlying game's schema quirks and of which backend serves it.
pub trait GameService {
    /// Identifier of the game this service answers for.
    fn game_id(&self) -> &'static str;

    /// Whether the game's static config carries the given feature flag.
    fn has_feature(&self, feature: Feature) -> bool;

    /// Search single cards. Backend errors degrade to an empty page.
    fn search_cards(&self, opts: &QueryOptions) -> Page<CatalogItem>;

    /// Look up one card by id. Missing or failed lookups return `None`.
    fn get_card_by_id(&self, card_id: &str) -> Option<CatalogItem>;

    /// List expansions, each enriched with a derived `total_cards` count.
    /// A failed count degrades only that expansion's count to 0.
    fn get_expansions(&self, opts: &QueryOptions) -> Page<Expansion>;

    /// List the cards belonging to one expansion.
    fn get_cards_by_expansion(&self, expansion_id: &str, opts: &QueryOptions) -> Page<CatalogItem>;

    /// Pricing block for one card, or `None` when unknown.
    fn get_pricing(&self, card_id: &str) -> Option<PricingBlock>;

    /// Search sealed products. Games without the `SealedProducts` feature
    /// return an empty page without touching the backend.
    fn search_sealed_products(&self, opts: &QueryOptions) -> Page<CatalogItem>;

    /// Sealed products belonging to one expansion; gated like
    /// [`search_sealed_products`](Self::search_sealed_products).
    fn get_sealed_by_expansion(&self, expansion_id: &str, opts: &QueryOptions) -> Page<CatalogItem>;
}

// ---------------------------------------------------------------------------
// ServiceCaches — per-service result caches, one per logical namespace
// ---------------------------------------------------------------------------

/// Result caches owned privately by one game service. Namespaces are
/// separate cache instances, so a search result can never shadow a pricing
/// entry even if keys were ever to collide.
pub struct ServiceCaches {
    pub searches: RefCell<TtlCache<Page<CatalogItem>>>,
    pub items: RefCell<TtlCache<CatalogItem>>,
    pub expansions: RefCell<TtlCache<Page<Expansion>>>,
    pub pricing: RefCell<TtlCache<PricingBlock>>,
}

impl ServiceCaches {
    pub fn new(ttl: Duration) -> Self {
        Self {
            searches: RefCell::new(TtlCache::new(ttl)),
            items: RefCell::new(TtlCache::new(ttl)),
            expansions: RefCell::new(TtlCache::new(ttl)),
            pricing: RefCell::new(TtlCache::new(ttl)),
        }
    }

    pub fn clear(&self) {
        self.searches.borrow_mut().clear();
        self.items.borrow_mut().clear();
        self.expansions.borrow_mut().clear();
        self.pricing.borrow_mut().clear();
    }
}

// ---------------------------------------------------------------------------
// Expansion count enrichment
// ---------------------------------------------------------------------------

/// Fill in `total_cards` for each expansion via the supplied count lookup.
///
/// Counts are independent: a failure degrades only its own expansion's
/// count to 0 and never affects the siblings or the page as a whole.
pub fn enrich_total_cards<F>(expansions: &mut [Expansion], count: F)
where
    F: Fn(&str) -> Result<i64>,
{
    for exp in expansions.iter_mut() {
        match count(&exp.id) {
            Ok(n) => exp.total_cards = n,
            Err(e) => {
                warn!(expansion = %exp.id, error = %e, "expansion card count failed; defaulting to 0");
                exp.total_cards = 0;
            }
        }
    }
}
