//! Inventory store access — SQLite via rusqlite.
//!
//! Every query opens its own connection and closes it on return; nothing is
//! pooled between requests. The executor folds store errors into "no results"
//! for callers and keeps the difference in the logs.

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::Value;

use crate::error::StoreError;
use crate::logging::{backend_info, backend_warn};
use crate::query_schema::create_table_sql;
use crate::record::QueryRows;

/// Anything that can run one query string and hand back rows.
pub trait DataStore: Send + Sync {
    fn run_query(&self, sql: &str) -> Result<QueryRows, StoreError>;
}

pub struct SqliteStore {
    path: String,
}

impl SqliteStore {
    pub fn new(path: &str) -> Self {
        Self { path: resolve_db_path(path) }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Connection::open(&self.path).map_err(|source| StoreError::Open {
            path: self.path.clone(),
            source,
        })
    }

    /// Create the inventory table if it does not exist yet.
    pub fn init_schema(&self, table: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let ddl = create_table_sql(table);
        conn.execute_batch(&ddl)
            .map_err(|source| StoreError::Query { query: ddl, source })
    }
}

impl DataStore for SqliteStore {
    fn run_query(&self, sql: &str) -> Result<QueryRows, StoreError> {
        let conn = self.connect()?;
        backend_info(format!("Connected to {}", self.path));

        let query_err = |source: rusqlite::Error| StoreError::Query { query: sql.to_string(), source };

        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i).map(sql_to_json))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })
            .map_err(query_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_err)?;

        Ok(QueryRows::new(columns, rows))
    }
}

fn sql_to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(n) => Value::from(n),
        SqlValue::Real(f) => Value::from(f),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(_) => Value::String("[BLOB]".to_string()),
    }
}

/// Resolve bare DB filenames to the local app data directory.
pub fn resolve_db_path(db_path: &str) -> String {
    if Path::new(db_path).is_absolute() || db_path.contains(std::path::MAIN_SEPARATOR) {
        return db_path.to_string();
    }
    if let Some(data_dir) = dirs::data_local_dir() {
        let full = data_dir.join("depot-recap").join(db_path);
        if let Some(parent) = full.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        return full.to_string_lossy().to_string();
    }
    db_path.to_string()
}

/// Runs generated queries against a [`DataStore`].
pub struct QueryExecutor {
    store: Box<dyn DataStore>,
}

impl QueryExecutor {
    pub fn new(store: Box<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Rows, or `None` for an empty result set; store failures are errors.
    pub fn try_generate_table(&self, sql: &str) -> Result<Option<QueryRows>, StoreError> {
        let rows = self.store.run_query(sql)?;
        Ok(if rows.is_empty() { None } else { Some(rows) })
    }

    /// Rows, or `None` both when nothing matched and when the query failed.
    pub fn generate_table(&self, sql: &str) -> Option<QueryRows> {
        match self.try_generate_table(sql) {
            Ok(Some(rows)) => {
                backend_info(format!("Data found: {} row(s)", rows.len()));
                Some(rows)
            }
            Ok(None) => {
                backend_info("Data not found: query returned no rows");
                None
            }
            Err(err) => {
                backend_warn(format!("Query failed, reporting no results: {}", err));
                None
            }
        }
    }
}
