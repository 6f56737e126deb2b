//! Structured query options, pagination metadata and paged query execution.
//!
//! Translates a [`QueryOptions`] set into backend queries against a named
//! table: filters and free-text search become WHERE predicates, sorting and
//! pagination are delegated to the backend except for numeric-looking text
//! fields (card numbers), which the backend would sort lexicographically
//! ("10" before "2"). Those are re-sorted client-side over a capped superset.

use serde::{Deserialize, Serialize};

use crate::config::NUMERIC_SORT_FETCH_CAP;
use crate::error::Result;
use crate::sql_builder::SqlBuilder;
use crate::store::{Row, Store};

// ---------------------------------------------------------------------------
// SortOrder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

// ---------------------------------------------------------------------------
// Filters / QueryOptions
// ---------------------------------------------------------------------------

/// Named filters. Unset fields constrain nothing (wildcard).
///
/// `rarity` and `supertype` are exact-match; `artist` is a substring match;
/// the list fields require array membership of every listed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    pub rarity: Option<String>,
    pub supertype: Option<String>,
    pub artist: Option<String>,
    pub types: Vec<String>,
    pub subtypes: Vec<String>,
    pub weaknesses: Vec<String>,
    pub resistances: Vec<String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.rarity.is_none()
            && self.supertype.is_none()
            && self.artist.is_none()
            && self.types.is_empty()
            && self.subtypes.is_empty()
            && self.weaknesses.is_empty()
            && self.resistances.is_empty()
    }
}

/// Options for a paged catalog query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
    /// Logical sort field; resolved against the table's sortable whitelist.
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    /// Free-text search over the table's searchable columns.
    pub search: Option<String>,
    pub filters: Filters,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            sort_by: None,
            sort_order: SortOrder::Asc,
            search: None,
            filters: Filters::default(),
        }
    }
}

impl QueryOptions {
    /// Clamp page/page_size into their valid ranges (page >= 1, page_size > 0).
    pub fn normalized(&self) -> QueryOptions {
        let mut opts = self.clone();
        opts.page = opts.page.max(1);
        opts.page_size = opts.page_size.max(1);
        opts
    }

    /// Canonical serialization of the full option set, used for cache keys.
    ///
    /// Every option value participates, including the nested filter lists,
    /// in a fixed field order: two logically identical queries always
    /// produce the same key and two different option sets never collide.
    pub fn cache_key(&self) -> String {
        let f = &self.filters;
        format!(
            "page={};size={};sort={};order={};q={};rarity={};supertype={};artist={};types={};subtypes={};weak={};resist={}",
            self.page,
            self.page_size,
            self.sort_by.as_deref().unwrap_or(""),
            self.sort_order.key(),
            self.search.as_deref().unwrap_or(""),
            f.rarity.as_deref().unwrap_or(""),
            f.supertype.as_deref().unwrap_or(""),
            f.artist.as_deref().unwrap_or(""),
            f.types.join("|"),
            f.subtypes.join("|"),
            f.weaknesses.join("|"),
            f.resistances.join("|"),
        )
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// One page of results plus pagination metadata.
///
/// `total` is the server-side count of all matching rows, not just this
/// page; `total_pages` and `has_more` are derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, page: usize, page_size: usize) -> Self {
        let total_rows = total.max(0) as usize;
        let page_size = page_size.max(1);
        let total_pages = total_rows.div_ceil(page_size);
        let has_more = page * page_size < total_rows;
        Self {
            data,
            total: total.max(0),
            page,
            page_size,
            total_pages,
            has_more,
        }
    }

    pub fn empty(opts: &QueryOptions) -> Self {
        let opts = opts.normalized();
        Self::new(Vec::new(), 0, opts.page, opts.page_size)
    }
}

// ---------------------------------------------------------------------------
// TableQuery — static per-table query surface
// ---------------------------------------------------------------------------

/// Static description of how one backend table is queried: which columns
/// free-text search spans, which columns may be sorted on, and the default
/// sort when the caller does not pick one.
#[derive(Debug, Clone, Copy)]
pub struct TableQuery<'a> {
    pub table: &'a str,
    pub search_columns: &'a [&'a str],
    pub sortable_columns: &'a [&'a str],
    pub default_sort: (&'a str, SortOrder),
    /// Extra exact-match constraints (e.g. scoping cards to an expansion).
    pub scope: &'a [(&'a str, &'a str)],
}

/// Sort fields stored as text in the catalog but holding numeric-looking
/// values. Backend lexicographic sort is wrong for these ("10" < "2"), so
/// they take the client-side re-sort path.
pub const NUMERIC_TEXT_SORT_FIELDS: &[&str] = &["number"];

fn is_numeric_text_sort(column: &str) -> bool {
    NUMERIC_TEXT_SORT_FIELDS.contains(&column)
}

/// Resolve the requested sort field against the table's whitelist.
///
/// Unknown or absent fields fall back to the table's default sort. Column
/// names therefore never flow from the caller into SQL.
fn resolve_sort<'a>(plan: &TableQuery<'a>, opts: &QueryOptions) -> (&'a str, SortOrder) {
    match opts.sort_by.as_deref() {
        Some(requested) => match plan.sortable_columns.iter().find(|c| **c == requested) {
            Some(col) => (*col, opts.sort_order),
            None => plan.default_sort,
        },
        None => plan.default_sort,
    }
}

fn apply_filters(qb: &mut SqlBuilder, plan: &TableQuery<'_>, opts: &QueryOptions) {
    for (col, val) in plan.scope.iter().copied() {
        qb.where_eq(col, val);
    }

    if let Some(q) = opts.search.as_deref() {
        let q = q.trim();
        if !q.is_empty() {
            qb.where_any_contains(plan.search_columns, q);
        }
    }

    let f = &opts.filters;
    if let Some(rarity) = &f.rarity {
        qb.where_eq("rarity", rarity);
    }
    if let Some(supertype) = &f.supertype {
        qb.where_eq("supertype", supertype);
    }
    if let Some(artist) = &f.artist {
        qb.where_contains("artist", artist);
    }
    for t in &f.types {
        qb.where_list_contains("types", t);
    }
    for t in &f.subtypes {
        qb.where_list_contains("subtypes", t);
    }
    for w in &f.weaknesses {
        qb.where_list_contains("weaknesses", w);
    }
    for r in &f.resistances {
        qb.where_list_contains("resistances", r);
    }
}

/// Leading-digits integer value of a sort field; non-numeric values
/// normalize to 0 (matching `parseInt` semantics on the legacy catalog
/// exports, where "025a" sorts as 25 and "TG05" as 0).
fn numeric_sort_value(row: &Row, column: &str) -> i64 {
    let Some(value) = row.get(column) else {
        return 0;
    };
    if let Some(n) = value.as_i64() {
        return n;
    }
    let s = value.as_str().unwrap_or("");
    let digits: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Paged execution
// ---------------------------------------------------------------------------

/// Execute a paged query against `plan.table` and return `(rows, total)`.
///
/// The non-numeric sort path delegates ordering and range pagination
/// (`OFFSET (page-1)*page_size LIMIT page_size`) to the backend alongside an
/// exact COUNT(*) with the same predicates.
///
/// The numeric-text sort path fetches a capped superset
/// ([`NUMERIC_SORT_FETCH_CAP`] rows) ignoring the requested page, sorts it
/// numerically client-side, then slices the page out. `total` on that path
/// is the minimum of the true backend count and the cap, and downstream page
/// metadata is computed against that capped total.
pub fn run_paged(store: &Store, plan: &TableQuery<'_>, opts: &QueryOptions) -> Result<(Vec<Row>, i64)> {
    let opts = opts.normalized();

    let mut count_qb = SqlBuilder::new(plan.table);
    count_qb.select(&["COUNT(*) AS total"]);
    apply_filters(&mut count_qb, plan, &opts);
    let (count_sql, count_params) = count_qb.build();
    let total = store
        .execute_scalar(&count_sql, &count_params)?
        .and_then(|v| v.as_i64())
        .unwrap_or(0);

    let (sort_col, sort_order) = resolve_sort(plan, &opts);

    if is_numeric_text_sort(sort_col) {
        let mut qb = SqlBuilder::new(plan.table);
        apply_filters(&mut qb, plan, &opts);
        qb.limit(NUMERIC_SORT_FETCH_CAP);
        let (sql, params) = qb.build();
        let mut rows = store.execute(&sql, &params)?;

        rows.sort_by(|a, b| {
            let av = numeric_sort_value(a, sort_col);
            let bv = numeric_sort_value(b, sort_col);
            match sort_order {
                SortOrder::Asc => av.cmp(&bv),
                SortOrder::Desc => bv.cmp(&av),
            }
        });

        let start = (opts.page - 1) * opts.page_size;
        let page_rows: Vec<Row> = rows.into_iter().skip(start).take(opts.page_size).collect();
        let capped_total = total.min(NUMERIC_SORT_FETCH_CAP as i64);
        return Ok((page_rows, capped_total));
    }

    let mut qb = SqlBuilder::new(plan.table);
    apply_filters(&mut qb, plan, &opts);
    qb.order_by(sort_col, sort_order);
    qb.limit(opts.page_size);
    qb.offset((opts.page - 1) * opts.page_size);
    let (sql, params) = qb.build();
    let rows = store.execute(&sql, &params)?;

    Ok((rows, total))
}
