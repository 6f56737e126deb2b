//! Database-backed game service over the catalog snapshot tables.

use tracing::warn;

use crate::cache;
use crate::config::{Feature, GameConfig};
use crate::error::Result;
use crate::format;
use crate::models::{CatalogItem, Expansion, PricingBlock};
use crate::query::{run_paged, Page, QueryOptions, SortOrder, TableQuery};
use crate::services::{enrich_total_cards, GameService, ServiceCaches};
use crate::sql_builder::SqlBuilder;
use crate::store::{Row, Store};

const CARD_SEARCH_COLUMNS: &[&str] = &["name", "number", "artist", "expansion_name"];
const CARD_SORTABLE_COLUMNS: &[&str] = &["name", "number", "rarity", "market_price", "release_date"];

const EXPANSION_SEARCH_COLUMNS: &[&str] = &["name", "code", "series"];
const EXPANSION_SORTABLE_COLUMNS: &[&str] = &["name", "code", "release_date"];

const SEALED_SEARCH_COLUMNS: &[&str] = &["name", "expansion_name"];
const SEALED_SORTABLE_COLUMNS: &[&str] = &["name", "market_price", "release_date"];

/// Game service answering from the snapshot tables through the store.
///
/// A lightweight borrowing wrapper: the registry owns the per-game config
/// and caches, the catalog owns the store; this struct ties the three
/// together for the duration of a call.
pub struct DbGameService<'a> {
    config: &'static GameConfig,
    store: &'a Store,
    caches: &'a ServiceCaches,
}

impl<'a> DbGameService<'a> {
    pub(crate) fn new(config: &'static GameConfig, store: &'a Store, caches: &'a ServiceCaches) -> Self {
        Self {
            config,
            store,
            caches,
        }
    }

    fn card_query<'q>(&self, scope: &'q [(&'q str, &'q str)]) -> TableQuery<'q>
    where
        'a: 'q,
    {
        TableQuery {
            table: self.config.cards_table,
            search_columns: CARD_SEARCH_COLUMNS,
            sortable_columns: CARD_SORTABLE_COLUMNS,
            default_sort: ("name", SortOrder::Asc),
            scope,
        }
    }

    fn sealed_query<'q>(&self, table: &'q str, scope: &'q [(&'q str, &'q str)]) -> TableQuery<'q> {
        TableQuery {
            table,
            search_columns: SEALED_SEARCH_COLUMNS,
            sortable_columns: SEALED_SORTABLE_COLUMNS,
            default_sort: ("name", SortOrder::Asc),
            scope,
        }
    }

    /// Run a paged card/sealed query and format each row.
    fn fetch_item_page(
        &self,
        plan: &TableQuery<'_>,
        opts: &QueryOptions,
        formatter: fn(&Row, &str) -> CatalogItem,
    ) -> Result<Page<CatalogItem>> {
        self.store.ensure_tables(&[plan.table])?;
        let (rows, total) = run_paged(self.store, plan, opts)?;
        let data = rows.iter().map(|r| formatter(r, plan.table)).collect();
        Ok(Page::new(data, total, opts.page, opts.page_size))
    }

    fn fetch_card_by_id(&self, card_id: &str) -> Result<Option<CatalogItem>> {
        self.store.ensure_tables(&[self.config.cards_table])?;
        let (sql, params) = SqlBuilder::new(self.config.cards_table)
            .where_eq("id", card_id)
            .limit(1)
            .build();
        let rows = self.store.execute(&sql, &params)?;
        Ok(rows
            .first()
            .map(|r| format::card_item(r, self.config.cards_table)))
    }

    fn fetch_expansion_page(&self, opts: &QueryOptions) -> Result<Page<Expansion>> {
        self.store
            .ensure_tables(&[self.config.expansions_table, self.config.cards_table])?;

        let plan = TableQuery {
            table: self.config.expansions_table,
            search_columns: EXPANSION_SEARCH_COLUMNS,
            sortable_columns: EXPANSION_SORTABLE_COLUMNS,
            default_sort: ("release_date", SortOrder::Desc),
            scope: &[],
        };
        let (rows, total) = run_paged(self.store, &plan, opts)?;
        let mut expansions: Vec<Expansion> = rows
            .iter()
            .map(|r| format::expansion(r, self.config.expansions_table))
            .collect();

        enrich_total_cards(&mut expansions, |exp_id| self.count_cards_in(exp_id));

        Ok(Page::new(expansions, total, opts.page, opts.page_size))
    }

    fn count_cards_in(&self, expansion_id: &str) -> Result<i64> {
        let (sql, params) = SqlBuilder::new(self.config.cards_table)
            .select(&["COUNT(*) AS total"])
            .where_eq("expansion_id", expansion_id)
            .build();
        Ok(self
            .store
            .execute_scalar(&sql, &params)?
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    fn fetch_pricing(&self, card_id: &str) -> Result<Option<PricingBlock>> {
        self.store.ensure_tables(&[self.config.cards_table])?;
        let (sql, params) = SqlBuilder::new(self.config.cards_table)
            .where_eq("id", card_id)
            .limit(1)
            .build();
        let rows = self.store.execute(&sql, &params)?;
        Ok(rows.first().map(|r| {
            format::pricing_block(
                r,
                format::CARD_RAW_PRICE_COLUMNS,
                format::CARD_GRADED_PRICE_COLUMNS,
            )
        }))
    }
}

impl GameService for DbGameService<'_> {
    fn game_id(&self) -> &'static str {
        self.config.id
    }

    fn has_feature(&self, feature: Feature) -> bool {
        self.config.has_feature(feature)
    }

    fn search_cards(&self, opts: &QueryOptions) -> Page<CatalogItem> {
        let opts = opts.normalized();
        let key = cache::key(self.config.id, "search_cards", &opts);
        if let Some(hit) = self.caches.searches.borrow_mut().get(&key) {
            return hit;
        }

        let plan = self.card_query(&[]);
        match self.fetch_item_page(&plan, &opts, format::card_item) {
            Ok(page) => {
                self.caches.searches.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(game = self.config.id, error = %e, "card search failed");
                Page::empty(&opts)
            }
        }
    }

    fn get_card_by_id(&self, card_id: &str) -> Option<CatalogItem> {
        let key = cache::entity_key(self.config.id, "card", card_id);
        if let Some(hit) = self.caches.items.borrow_mut().get(&key) {
            return Some(hit);
        }

        match self.fetch_card_by_id(card_id) {
            Ok(Some(item)) => {
                self.caches.items.borrow_mut().set(key, item.clone());
                Some(item)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(game = self.config.id, card = card_id, error = %e, "card lookup failed");
                None
            }
        }
    }

    fn get_expansions(&self, opts: &QueryOptions) -> Page<Expansion> {
        let opts = opts.normalized();
        let key = cache::key(self.config.id, "expansions", &opts);
        if let Some(hit) = self.caches.expansions.borrow_mut().get(&key) {
            return hit;
        }

        match self.fetch_expansion_page(&opts) {
            Ok(page) => {
                self.caches.expansions.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(game = self.config.id, error = %e, "expansion listing failed");
                Page::empty(&opts)
            }
        }
    }

    fn get_cards_by_expansion(&self, expansion_id: &str, opts: &QueryOptions) -> Page<CatalogItem> {
        let opts = opts.normalized();
        let op = format!("expansion_cards:{}", expansion_id);
        let key = cache::key(self.config.id, &op, &opts);
        if let Some(hit) = self.caches.searches.borrow_mut().get(&key) {
            return hit;
        }

        let scope = [("expansion_id", expansion_id)];
        let plan = self.card_query(&scope);
        match self.fetch_item_page(&plan, &opts, format::card_item) {
            Ok(page) => {
                self.caches.searches.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(
                    game = self.config.id,
                    expansion = expansion_id,
                    error = %e,
                    "expansion card listing failed"
                );
                Page::empty(&opts)
            }
        }
    }

    fn get_pricing(&self, card_id: &str) -> Option<PricingBlock> {
        if !self.config.has_feature(Feature::Pricing) {
            return None;
        }
        let key = cache::entity_key(self.config.id, "pricing", card_id);
        if let Some(hit) = self.caches.pricing.borrow_mut().get(&key) {
            return Some(hit);
        }

        match self.fetch_pricing(card_id) {
            Ok(Some(block)) => {
                self.caches.pricing.borrow_mut().set(key, block);
                Some(block)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(game = self.config.id, card = card_id, error = %e, "pricing lookup failed");
                None
            }
        }
    }

    fn search_sealed_products(&self, opts: &QueryOptions) -> Page<CatalogItem> {
        let opts = opts.normalized();
        if !self.config.has_feature(Feature::SealedProducts) {
            return Page::empty(&opts);
        }
        let Some(table) = self.config.sealed_table else {
            return Page::empty(&opts);
        };

        let key = cache::key(self.config.id, "search_sealed", &opts);
        if let Some(hit) = self.caches.searches.borrow_mut().get(&key) {
            return hit;
        }

        let plan = self.sealed_query(table, &[]);
        match self.fetch_item_page(&plan, &opts, format::sealed_item) {
            Ok(page) => {
                self.caches.searches.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(game = self.config.id, error = %e, "sealed product search failed");
                Page::empty(&opts)
            }
        }
    }

    fn get_sealed_by_expansion(&self, expansion_id: &str, opts: &QueryOptions) -> Page<CatalogItem> {
        let opts = opts.normalized();
        if !self.config.has_feature(Feature::SealedProducts) {
            return Page::empty(&opts);
        }
        let Some(table) = self.config.sealed_table else {
            return Page::empty(&opts);
        };

        let op = format!("expansion_sealed:{}", expansion_id);
        let key = cache::key(self.config.id, &op, &opts);
        if let Some(hit) = self.caches.searches.borrow_mut().get(&key) {
            return hit;
        }

        let scope = [("expansion_id", expansion_id)];
        let plan = self.sealed_query(table, &scope);
        match self.fetch_item_page(&plan, &opts, format::sealed_item) {
            Ok(page) => {
                self.caches.searches.borrow_mut().set(key, page.clone());
                page
            }
            Err(e) => {
                warn!(
                    game = self.config.id,
                    expansion = expansion_id,
                    error = %e,
                    "sealed expansion listing failed"
                );
                Page::empty(&opts)
            }
        }
    }
}
