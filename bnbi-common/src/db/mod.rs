//! Analytical store access
//!
//! The analytical backend is a SQLite database opened read-only. Only whole
//! tables are fetched (`SELECT * FROM <table>`); all filtering happens in
//! memory after cleaning.

use sqlx::SqlitePool;
use std::path::Path;

use crate::{Error, Result};

mod tables;
pub use tables::{fetch_table, table_columns};

/// Connect to the analytical database in read-only mode
pub async fn connect_readonly(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::NotFound(format!(
            "Analytical database not found: {}",
            db_path.display()
        )));
    }

    // mode=ro without immutable=1: the store may be refreshed externally and
    // a cache invalidation must observe the new contents
    let db_url = format!("sqlite://{}?mode=ro", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;

    Ok(pool)
}

/// Validate a table name before interpolating it into SQL
pub fn is_valid_table_name(name: &str) -> bool {
    // Only allow alphanumeric and underscore
    name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !name.is_empty()
        && name.len() < 100
}
