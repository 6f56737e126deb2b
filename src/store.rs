//! DuckDB connection wrapper with lazy table registration and query execution.
//!
//! Catalog snapshots are parquet files; each logical table is registered as a
//! DuckDB view over its snapshot on first use. Known list columns stored as
//! comma-separated VARCHAR in the snapshots are converted to arrays at view
//! creation so `list_contains` filters work uniformly.

use crate::error::Result;
use crate::snapshot::SnapshotManager;
use duckdb::{types::ValueRef, Connection as DuckDbConnection};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A single backend row, keyed by column name.
pub type Row = HashMap<String, serde_json::Value>;

/// List columns per table that snapshots may store as comma-separated
/// VARCHAR. Converted to arrays at view registration.
fn list_columns() -> HashMap<&'static str, HashSet<&'static str>> {
    let card_lists = || HashSet::from(["types", "subtypes", "weaknesses", "resistances"]);
    let mut map = HashMap::new();
    map.insert("pokemon_cards", card_lists());
    map.insert("pokemon_jp_cards", card_lists());
    map
}

/// Wraps a DuckDB connection and registers snapshot files as views.
pub struct Store {
    conn: DuckDbConnection,
    /// The snapshot manager used to download/locate catalog data files.
    pub snapshots: RefCell<SnapshotManager>,
    registered: RefCell<HashSet<String>>,
}

impl Store {
    /// Create a store backed by the given snapshot manager.
    ///
    /// Opens an in-memory DuckDB database.
    pub fn new(snapshots: SnapshotManager) -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Ok(Self {
            conn,
            snapshots: RefCell::new(snapshots),
            registered: RefCell::new(HashSet::new()),
        })
    }

    /// Ensure one or more tables are registered, downloading snapshots if
    /// needed.
    pub fn ensure_tables(&self, tables: &[&str]) -> Result<()> {
        for name in tables {
            if !self.registered.borrow().contains(*name) {
                self.register_table(name)?;
            }
        }
        Ok(())
    }

    /// Execute SQL and return results as a `Vec` of [`Row`]s.
    ///
    /// Automatically converts DuckDB types to `serde_json::Value`.
    pub fn execute(&self, sql: &str, params: &[String]) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Get column metadata AFTER query execution (calling before panics in duckdb-rs)
        let column_names: Vec<String> = rows_result
            .as_ref()
            .unwrap()
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let column_count = rows_result.as_ref().unwrap().column_count();

        let mut out: Vec<Row> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::new();
            for i in 0..column_count {
                let col_name = &column_names[i];
                let value = convert_value_ref(row.get_ref(i)?);
                map.insert(col_name.clone(), value);
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(&self, sql: &str, params: &[String]) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(
                row.into_iter()
                    .collect::<serde_json::Map<String, serde_json::Value>>(),
            );
            let item: T = serde_json::from_value(value)?;
            results.push(item);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(&self, sql: &str, params: &[String]) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            let value = convert_value_ref(row.get_ref(0)?);
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    /// Create a DuckDB table from a newline-delimited JSON file.
    ///
    /// Used by test fixtures to stand in for CDN snapshots; data is streamed
    /// from disk by DuckDB rather than loaded into a Rust structure first.
    pub fn register_table_from_ndjson(&self, table_name: &str, ndjson_path: &str) -> Result<()> {
        let path_fwd = ndjson_path.replace('\\', "/");
        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; \
             CREATE TABLE {} AS SELECT * FROM read_json_auto('{}', format='newline_delimited')",
            table_name, table_name, path_fwd
        ))?;
        self.registered.borrow_mut().insert(table_name.to_string());
        Ok(())
    }

    /// Check whether a table has been registered.
    pub fn has_table(&self, name: &str) -> bool {
        self.registered.borrow().contains(name)
    }

    /// Return a list of all registered table names.
    pub fn tables(&self) -> Vec<String> {
        self.registered.borrow().iter().cloned().collect()
    }

    /// Clear all registered tables so they are re-created on next access.
    pub fn reset_tables(&self) {
        self.registered.borrow_mut().clear();
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }

    /// Lazily register a snapshot parquet file as a DuckDB view.
    fn register_table(&self, table_name: &str) -> Result<()> {
        if self.registered.borrow().contains(table_name) {
            return Ok(());
        }

        let path = self.snapshots.borrow_mut().ensure_parquet(table_name)?;
        // Use forward slashes for DuckDB compatibility
        let path_str = path.to_string_lossy().replace('\\', "/");

        let replace_clause = self.build_list_replace(&path_str, table_name)?;

        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE VIEW {} AS SELECT *{} FROM read_parquet('{}')",
            table_name, replace_clause, path_str
        ))?;
        self.registered.borrow_mut().insert(table_name.to_string());
        debug!(table = table_name, path = %path_str, "registered catalog table");

        Ok(())
    }

    /// Build a REPLACE clause converting comma-separated VARCHAR list columns
    /// to arrays.
    ///
    /// Only the known list columns for the table are considered, and only
    /// when the snapshot actually stores them as VARCHAR (newer snapshots
    /// ship native list columns, which need no conversion). Only reads the
    /// parquet footer (DESCRIBE) -- no data scanning needed.
    fn build_list_replace(&self, path_str: &str, table_name: &str) -> Result<String> {
        let known = list_columns();
        let Some(table_lists) = known.get(table_name) else {
            return Ok(String::new());
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT column_name, column_type FROM \
             (DESCRIBE SELECT * FROM read_parquet('{}'))",
            path_str
        ))?;

        let mut rows = stmt.query([])?;
        let mut schema_map: HashMap<String, String> = HashMap::new();

        while let Some(row) = rows.next()? {
            let col_name: String = row.get(0)?;
            let col_type: String = row.get(1)?;
            schema_map.insert(col_name, col_type);
        }

        let mut final_cols: Vec<&&str> = table_lists
            .iter()
            .filter(|col| {
                schema_map
                    .get(**col)
                    .map(|t| t == "VARCHAR")
                    .unwrap_or(false)
            })
            .collect();
        final_cols.sort();

        let exprs: Vec<String> = final_cols
            .iter()
            .map(|col| {
                format!(
                    "CASE WHEN \"{}\" IS NULL OR TRIM(\"{}\") = '' \
                     THEN []::VARCHAR[] \
                     ELSE string_split(\"{}\", ', ') END AS \"{}\"",
                    col, col, col, col
                )
            })
            .collect();

        if exprs.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" REPLACE ({})", exprs.join(", ")))
        }
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => {
            // HugeInt may not fit in i64; try i64, fallback to string
            if let Ok(i) = i64::try_from(n) {
                serde_json::Value::Number(i.into())
            } else {
                serde_json::Value::String(n.to_string())
            }
        }
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).to_string()),
        ValueRef::Blob(bytes) => serde_json::Value::String(format!(
            "blob:{}",
            bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>()
        )),
        _ => {
            // Other types (Date, Time, Timestamp, Interval, List, etc.) are
            // not produced by the catalog schemas this layer queries.
            serde_json::Value::Null
        }
    }
}
