//! Whole-table fetches from the analytical store

use serde_json::{json, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use tracing::debug;

use super::is_valid_table_name;
use crate::table::RawTable;
use crate::{Error, Result};

/// `SELECT * FROM <table>` as a raw table
///
/// Column names come from the first row, or from the schema when the table
/// is empty.
pub async fn fetch_table(pool: &SqlitePool, table_name: &str) -> Result<RawTable> {
    if !is_valid_table_name(table_name) {
        return Err(Error::InvalidInput(format!("Invalid table name: {}", table_name)));
    }

    let rows = sqlx::query(&format!("SELECT * FROM {}", table_name))
        .fetch_all(pool)
        .await?;

    let columns = match rows.first() {
        Some(first) => first.columns().iter().map(|c| c.name().to_string()).collect(),
        None => table_columns(pool, table_name).await?,
    };

    let mut table = RawTable::new(columns);
    for row in &rows {
        table.push_row((0..row.len()).map(|i| cell_to_json(row, i)).collect());
    }

    debug!("Fetched {} rows from {}", table.len(), table_name);
    Ok(table)
}

/// Column names for a table from its schema
pub async fn table_columns(pool: &SqlitePool, table_name: &str) -> Result<Vec<String>> {
    if !is_valid_table_name(table_name) {
        return Err(Error::InvalidInput(format!("Invalid table name: {}", table_name)));
    }

    let rows = sqlx::query(&format!("PRAGMA table_info({})", table_name))
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Err(Error::NotFound(format!("Table not found: {}", table_name)));
    }

    // PRAGMA table_info returns: (cid, name, type, notnull, dflt_value, pk)
    Ok(rows.iter().map(|row| row.get::<String, _>(1)).collect())
}

/// Convert one SQLite cell to JSON by its storage class
fn cell_to_json(row: &SqliteRow, i: usize) -> Value {
    let Ok(raw) = row.try_get_raw(i) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }

    let type_name = raw.type_info().name().to_ascii_uppercase();
    let typed = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get::<i64, _>(i).ok().map(|v| json!(v)),
        "REAL" => row.try_get::<f64, _>(i).ok().map(|v| json!(v)),
        "TEXT" => row.try_get::<String, _>(i).ok().map(Value::String),
        _ => None,
    };

    // Fall back through common types for NUMERIC and untyped values
    typed
        .or_else(|| row.try_get::<String, _>(i).ok().map(Value::String))
        .or_else(|| row.try_get::<i64, _>(i).ok().map(|v| json!(v)))
        .or_else(|| row.try_get::<f64, _>(i).ok().map(|v| json!(v)))
        .unwrap_or(Value::Null)
}
