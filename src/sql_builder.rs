//! SQL builder with parameterized query construction.
//!
//! All user-supplied values go through DuckDB's parameter binding (`?`
//! placeholders), never through string interpolation. Column names are only
//! ever taken from the crate's static table descriptors, not from callers.
//! Builder methods return `&mut Self` for chaining.
//!
//! # Example
//!
//! ```rust
//! use cardfolio_catalog::query::SortOrder;
//! use cardfolio_catalog::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("pokemon_cards")
//!     .where_eq("rarity", "Rare Holo")
//!     .where_contains("artist", "Mitsuhiro")
//!     .order_by("name", SortOrder::Asc)
//!     .limit(10)
//!     .build();
//! ```

use crate::query::SortOrder;

/// Builds parameterized SQL queries safely.
pub struct SqlBuilder {
    select_cols: Vec<String>,
    from_table: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_by_col: Option<String>,
    limit_val: Option<usize>,
    offset_val: Option<usize>,
}

impl SqlBuilder {
    /// Create a builder targeting the given table or view.
    pub fn new(table: &str) -> Self {
        Self {
            select_cols: vec!["*".to_string()],
            from_table: table.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_col: None,
            limit_val: None,
            offset_val: None,
        }
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a WHERE condition with `?` placeholders for each param.
    ///
    /// The caller provides a condition using `?` for each parameter value.
    /// Parameters are appended in order.
    pub fn where_clause(&mut self, condition: &str, params: &[&str]) -> &mut Self {
        self.where_clauses.push(condition.to_string());
        self.params.extend(params.iter().map(|p| p.to_string()));
        self
    }

    /// Add an equality condition: `{column} = ?`.
    pub fn where_eq(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses.push(format!("{} = ?", column));
        self.params.push(value.to_string());
        self
    }

    /// Add a case-insensitive substring condition.
    ///
    /// Generates: `LOWER({column}) LIKE LOWER(?)` with a `%needle%` pattern.
    pub fn where_contains(&mut self, column: &str, needle: &str) -> &mut Self {
        self.where_clauses
            .push(format!("LOWER({}) LIKE LOWER(?)", column));
        self.params.push(format!("%{}%", needle));
        self
    }

    /// Add an OR-combined case-insensitive substring match over several
    /// columns, used for free-text search.
    ///
    /// Empty column list is a no-op.
    pub fn where_any_contains(&mut self, columns: &[&str], needle: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let mut or_parts = Vec::with_capacity(columns.len());
        for column in columns {
            or_parts.push(format!("LOWER({}) LIKE LOWER(?)", column));
            self.params.push(format!("%{}%", needle));
        }
        self.where_clauses
            .push(format!("({})", or_parts.join(" OR ")));
        self
    }

    /// Add an array-membership condition: `list_contains({column}, ?)`.
    pub fn where_list_contains(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses
            .push(format!("list_contains({}, ?)", column));
        self.params.push(value.to_string());
        self
    }

    /// Set the single ORDER BY column and direction.
    pub fn order_by(&mut self, column: &str, order: SortOrder) -> &mut Self {
        self.order_by_col = Some(format!("{} {}", column, order.as_sql()));
        self
    }

    /// Set the maximum number of rows to return.
    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    /// Set the number of rows to skip before returning results.
    pub fn offset(&mut self, n: usize) -> &mut Self {
        self.offset_val = Some(n);
        self
    }

    /// Build the final SQL string and parameter list.
    ///
    /// Returns a tuple of `(sql_string, params_list)` ready for execution.
    pub fn build(&self) -> (String, Vec<String>) {
        let cols = self.select_cols.join(", ");
        let mut parts = vec![
            format!("SELECT {}", cols),
            format!("FROM {}", self.from_table),
        ];

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if let Some(order) = &self.order_by_col {
            parts.push(format!("ORDER BY {}", order));
        }

        if let Some(n) = self.limit_val {
            parts.push(format!("LIMIT {}", n));
        }

        if let Some(n) = self.offset_val {
            parts.push(format!("OFFSET {}", n));
        }

        (parts.join("\n"), self.params.clone())
    }
}
