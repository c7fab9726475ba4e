//! Analytical store backend (read-only SQLite)

use bnbi_common::db::{connect_readonly, fetch_table};
use bnbi_common::{RawTable, Result};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::info;

use super::SourceId;
use crate::config::Backend;

/// Read-only analytical store holding the listings and area tables
#[derive(Debug, Clone)]
pub struct AnalyticalSource {
    pool: SqlitePool,
    database_path: PathBuf,
    listings_table: String,
    area_table: String,
}

impl AnalyticalSource {
    /// Open the store read-only
    pub async fn connect(
        database_path: &Path,
        listings_table: impl Into<String>,
        area_table: impl Into<String>,
    ) -> Result<Self> {
        let pool = connect_readonly(database_path).await?;
        info!("Connected to analytical store (read-only): {}", database_path.display());
        Ok(Self::from_pool(pool, database_path, listings_table, area_table))
    }

    /// Wrap an existing pool
    pub fn from_pool(
        pool: SqlitePool,
        database_path: &Path,
        listings_table: impl Into<String>,
        area_table: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            database_path: database_path.to_path_buf(),
            listings_table: listings_table.into(),
            area_table: area_table.into(),
        }
    }

    pub fn id(&self) -> SourceId {
        SourceId::new(Backend::Analytical, &self.database_path.display().to_string())
    }

    pub fn listings_table(&self) -> &str {
        &self.listings_table
    }

    pub fn area_table(&self) -> &str {
        &self.area_table
    }

    pub fn select_all_query(&self, table: &str) -> String {
        format!("SELECT * FROM {}", table)
    }

    /// `SELECT * FROM <table>`
    pub async fn select_all(&self, table: &str) -> Result<RawTable> {
        fetch_table(&self.pool, table).await
    }
}
