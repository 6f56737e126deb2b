//! Remote game service speaking to the hosted pricing/search API.
//!
//! Implements the same [`GameService`] contract as the database variant,
//! against HTTP endpoints instead of snapshot tables. The API's response
//! envelopes are inconsistent across deployments — the data array and the
//! total count each appear under one of several key names — so every body
//! goes through the explicit normalization functions below, which probe the
//! known aliases in a fixed priority order.

use std::cell::RefCell;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::warn;

use crate::cache;
use crate::config::{Feature, GameConfig};
use crate::error::Result;
use crate::format;
use crate::models::{CatalogItem, Expansion, PricingBlock};
use crate::query::{Page, QueryOptions};
use crate::services::{GameService, ServiceCaches};
use crate::store::Row;

/// Provenance tag recorded on items served by the remote API.
pub const API_SOURCE: &str = "remote-api";

/// Key names the data array may appear under, probed in priority order.
const ROW_ALIASES: &[&str] = &["data", "products"];

/// Key names the total count may appear under, probed in priority order.
const TOTAL_ALIASES: &[&str] = &["total_count", "totalCount", "total"];

// ---------------------------------------------------------------------------
// Response envelope normalization
// ---------------------------------------------------------------------------

/// Extract the row array from a response body, whichever alias it hides
/// under. Unknown shapes normalize to no rows.
pub fn extract_rows(body: &Value) -> Vec<Row> {
    for key in ROW_ALIASES {
        if let Some(arr) = body.get(*key).and_then(Value::as_array) {
            return arr
                .iter()
                .filter_map(|v| v.as_object())
                .map(|o| o.clone().into_iter().collect())
                .collect();
        }
    }
    Vec::new()
}

/// Extract the total count from a response body, falling back to the row
/// count of the page when no alias is present.
pub fn extract_total(body: &Value, fallback: usize) -> i64 {
    for key in TOTAL_ALIASES {
        if let Some(n) = body.get(*key).and_then(Value::as_i64) {
            return n;
        }
    }
    fallback as i64
}

/// Extract a single-entity object, either nested under `data` or flat.
pub fn extract_entity(body: &Value) -> Option<Row> {
    let obj = body
        .get("data")
        .and_then(Value::as_object)
        .or_else(|| body.as_object())?;
    if obj.is_empty() {
        return None;
    }
    Some(obj.clone().into_iter().collect())
}

// ---------------------------------------------------------------------------
// RemoteConfig / RemoteState
// ---------------------------------------------------------------------------

/// Connection settings for the remote pricing/search API.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Owned HTTP state for one remote-backed game: config plus a lazily built
/// client.
pub(crate) struct RemoteState {
    config: RemoteConfig,
    client: RefCell<Option<Client>>,
}

impl RemoteState {
    pub(crate) fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            client: RefCell::new(None),
        }
    }

    fn client(&self) -> Result<Client> {
        let mut slot = self.client.borrow_mut();
        if slot.is_none() {
            *slot = Some(Client::builder().timeout(self.config.timeout).build()?);
        }
        Ok(slot.as_ref().unwrap().clone())
    }

    fn get_json(&self, path: &str, query: &[(&'static str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let resp = self
            .client()?
            .get(&url)
            .bearer_auth(&self.config.token)
            .query(query)
            .send()?
            .error_for_status()?;
        Ok(resp.json()?)
    }
}

// ---------------------------------------------------------------------------
// ApiGameService
// ---------------------------------------------------------------------------

pub struct ApiGameService<'a> {
    config: &'static GameConfig,
    remote: &'a RemoteState,
    caches: &'a ServiceCaches,
}

impl<'a> ApiGameService<'a> {
    pub(crate) fn new(
        config: &'static GameConfig,
        remote: &'a RemoteState,
        caches: &'a ServiceCaches,
    ) -> Self {
        Self {
            config,
            remote,
            caches,
        }
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/{}", self.config.id, suffix)
    }

    fn page_params(opts: &QueryOptions) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", opts.page.to_string()),
            ("page_size", opts.page_size.to_string()),
            ("order", opts.sort_order.as_sql().to_lowercase()),
        ];
        if let Some(sort) = &opts.sort_by {
            params.push(("sort", sort.clone()));
        }
        if let Some(q) = opts.search.as_deref() {
            if !q.trim().is_empty() {
                params.push(("q", q.trim().to_string()));
            }
        }
        let f = &opts.filters;
        if let Some(rarity) = &f.rarity {
            params.push(("rarity", rarity.clone()));
        }
        if let Some(supertype) = &f.supertype {
            params.push(("supertype", supertype.clone()));
        }
        if let Some(artist) = &f.artist {
            params.push(("artist", artist.clone()));
        }
        if !f.types.is_empty() {
            params.push(("types", f.types.join(",")));
        }
        if !f.subtypes.is_empty() {
            params.push(("subtypes", f.subtypes.join(",")));
        }
        if !f.weaknesses.is_empty() {
            params.push(("weaknesses", f.weaknesses.join(",")));
        }
        if !f.resistances.is_empty() {
            params.push(("resistances", f.resistances.join(",")));
        }
        params
    }

    /// Fetch a paged item endpoint and normalize the envelope.
    fn fetch_item_page(
        &self,
        path: &str,
        opts: &QueryOptions,
        formatter: fn(&Row, &str) -> CatalogItem,
    ) -> Result<Page<CatalogItem>> {
        let body = self.remote.get_json(path, &Self::page_params(opts))?;
        let rows = extract_rows(&body);
        let total = extract_total(&body, rows.len());
        let data = rows.iter().map(|r| formatter(r, API_SOURCE)).collect();
        Ok(Page::new(data, total, opts.page, opts.page_size))
    }
}

impl GameService for ApiGameService<'_> {
    fn game_id(&self) -> &'static str {
        self.config.id
    }

    fn has_feature(&self, feature: Feature) -> bool {
        self.config.has_feature(feature)
    }

    fn search_cards(&self, opts: &QueryOptions) -> Page<CatalogItem> {
        let opts = opts.normalized();
        let key = cache::key(self.config.id, "api:search_cards", &opts);
        if let Some(hit) = self.caches.searches.borrow_mut().get(&key) {
            return hit;
        }

        let path = self.endpoint("search/cards");
        match self.fetch_item_page(&path, &opts, format::card_item) {
            Ok(page) => {
                self.caches.searches.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(game = self.config.id, error = %e, "remote card search failed");
                Page::empty(&opts)
            }
        }
    }

    fn get_card_by_id(&self, card_id: &str) -> Option<CatalogItem> {
        let key = cache::entity_key(self.config.id, "api:card", card_id);
        if let Some(hit) = self.caches.items.borrow_mut().get(&key) {
            return Some(hit);
        }

        let path = self.endpoint(&format!("cards/{}", card_id));
        match self.remote.get_json(&path, &[]) {
            Ok(body) => {
                let item = extract_entity(&body).map(|row| format::card_item(&row, API_SOURCE))?;
                self.caches.items.borrow_mut().set(key, item.clone());
                Some(item)
            }
            Err(e) => {
                warn!(game = self.config.id, card = card_id, error = %e, "remote card lookup failed");
                None
            }
        }
    }

    fn get_expansions(&self, opts: &QueryOptions) -> Page<Expansion> {
        let opts = opts.normalized();
        let key = cache::key(self.config.id, "api:expansions", &opts);
        if let Some(hit) = self.caches.expansions.borrow_mut().get(&key) {
            return hit;
        }

        let path = self.endpoint("expansions");
        match self.remote.get_json(&path, &Self::page_params(&opts)) {
            Ok(body) => {
                let rows = extract_rows(&body);
                let total = extract_total(&body, rows.len());
                // The remote API embeds per-expansion card counts in its
                // rows; the formatter picks them up through the aliases.
                let data: Vec<Expansion> = rows
                    .iter()
                    .map(|r| format::expansion(r, API_SOURCE))
                    .collect();
                let page = Page::new(data, total, opts.page, opts.page_size);
                self.caches.expansions.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(game = self.config.id, error = %e, "remote expansion listing failed");
                Page::empty(&opts)
            }
        }
    }

    fn get_cards_by_expansion(&self, expansion_id: &str, opts: &QueryOptions) -> Page<CatalogItem> {
        let opts = opts.normalized();
        let op = format!("api:expansion_cards:{}", expansion_id);
        let key = cache::key(self.config.id, &op, &opts);
        if let Some(hit) = self.caches.searches.borrow_mut().get(&key) {
            return hit;
        }

        let path = self.endpoint(&format!("expansions/{}/cards", expansion_id));
        match self.fetch_item_page(&path, &opts, format::card_item) {
            Ok(page) => {
                self.caches.searches.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(
                    game = self.config.id,
                    expansion = expansion_id,
                    error = %e,
                    "remote expansion card listing failed"
                );
                Page::empty(&opts)
            }
        }
    }

    fn get_pricing(&self, card_id: &str) -> Option<PricingBlock> {
        if !self.config.has_feature(Feature::Pricing) {
            return None;
        }
        let key = cache::entity_key(self.config.id, "api:pricing", card_id);
        if let Some(hit) = self.caches.pricing.borrow_mut().get(&key) {
            return Some(hit);
        }

        let path = self.endpoint(&format!("cards/{}/pricing", card_id));
        match self.remote.get_json(&path, &[]) {
            Ok(body) => {
                let row = extract_entity(&body)?;
                let block = format::pricing_block(
                    &row,
                    format::CARD_RAW_PRICE_COLUMNS,
                    format::CARD_GRADED_PRICE_COLUMNS,
                );
                self.caches.pricing.borrow_mut().set(key, block);
                Some(block)
            }
            Err(e) => {
                warn!(game = self.config.id, card = card_id, error = %e, "remote pricing lookup failed");
                None
            }
        }
    }

    fn search_sealed_products(&self, opts: &QueryOptions) -> Page<CatalogItem> {
        let opts = opts.normalized();
        if !self.config.has_feature(Feature::SealedProducts) {
            return Page::empty(&opts);
        }

        let key = cache::key(self.config.id, "api:search_sealed", &opts);
        if let Some(hit) = self.caches.searches.borrow_mut().get(&key) {
            return hit;
        }

        let path = self.endpoint("sealed");
        match self.fetch_item_page(&path, &opts, format::sealed_item) {
            Ok(page) => {
                self.caches.searches.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(game = self.config.id, error = %e, "remote sealed search failed");
                Page::empty(&opts)
            }
        }
    }

    fn get_sealed_by_expansion(&self, expansion_id: &str, opts: &QueryOptions) -> Page<CatalogItem> {
        let opts = opts.normalized();
        if !self.config.has_feature(Feature::SealedProducts) {
            return Page::empty(&opts);
        }

        let op = format!("api:expansion_sealed:{}", expansion_id);
        let key = cache::key(self.config.id, &op, &opts);
        if let Some(hit) = self.caches.searches.borrow_mut().get(&key) {
            return hit;
        }

        let path = self.endpoint(&format!("expansions/{}/sealed", expansion_id));
        match self.fetch_item_page(&path, &opts, format::sealed_item) {
            Ok(page) => {
                self.caches.searches.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(
                    game = self.config.id,
                    expansion = expansion_id,
                    error = %e,
                    "remote sealed expansion listing failed"
                );
                Page::empty(&opts)
            }
        }
    }
}
