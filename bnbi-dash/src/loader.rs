//! Dataset loading
//!
//! Ties the record sources, the cleaning pipeline and the table cache
//! together. The listing snapshot holds both the cleaned table and the
//! dashboard base table (cleaned, then outlier-filtered by price over the
//! whole table).

use bnbi_common::{clean, remove_outliers, AreaTable, CleanOptions, ListingTable, Result, TargetColumn};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::cache::{CacheKey, TableCache};
use crate::source::{AnalyticalSource, RecordSource};

/// One load of the listings source
#[derive(Debug, Clone)]
pub struct ListingSnapshot {
    /// Cleaned listings (no outlier removal)
    pub cleaned: ListingTable,
    /// Cleaned listings with price outliers removed; every view starts here
    pub base: ListingTable,
    pub loaded_at: DateTime<Utc>,
}

impl ListingSnapshot {
    pub fn build(cleaned: ListingTable) -> Self {
        let base = cleaned.with_records(remove_outliers(&cleaned.records, TargetColumn::Price));
        Self {
            cleaned,
            base,
            loaded_at: Utc::now(),
        }
    }
}

/// Which cached tables an invalidation drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidateScope {
    Listings,
    Areas,
    #[default]
    All,
}

pub struct Dataset {
    listings_source: RecordSource,
    area_source: Option<AnalyticalSource>,
    clean_options: CleanOptions,
    listings: TableCache<ListingSnapshot>,
    areas: TableCache<AreaTable>,
}

impl Dataset {
    /// Area data is treated as static reference data and never expires
    pub fn new(
        listings_source: RecordSource,
        area_source: Option<AnalyticalSource>,
        clean_options: CleanOptions,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            listings_source,
            area_source,
            clean_options,
            listings: TableCache::new(ttl),
            areas: TableCache::new(None),
        }
    }

    pub fn listings_source(&self) -> &RecordSource {
        &self.listings_source
    }

    /// Current listing snapshot, fetching and cleaning on a cache miss
    pub async fn listings(&self) -> Result<Arc<ListingSnapshot>> {
        let source = &self.listings_source;
        let options = &self.clean_options;
        let key = CacheKey::new(source.id(), source.listings_query());
        self.listings
            .get_or_load(&key, || async move {
                let raw = source.fetch_listings().await?;
                let cleaned = clean(&raw, options)?;
                let snapshot = ListingSnapshot::build(cleaned);
                info!(
                    "Loaded {} listings ({} after outlier removal) from {}",
                    snapshot.cleaned.len(),
                    snapshot.base.len(),
                    source.id()
                );
                Ok(snapshot)
            })
            .await
    }

    /// Area reference table; empty when no analytical store is configured
    pub async fn areas(&self) -> Result<Arc<AreaTable>> {
        let Some(source) = &self.area_source else {
            debug!("No analytical store configured; area data unavailable");
            return Ok(Arc::new(AreaTable::default()));
        };

        let key = CacheKey::new(source.id(), source.select_all_query(source.area_table()));
        self.areas
            .get_or_load(&key, || async move {
                let raw = source.select_all(source.area_table()).await?;
                let table = AreaTable::from_raw(&raw)?;
                info!("Loaded {} neighbourhood areas from {}", table.len(), source.id());
                Ok(table)
            })
            .await
    }

    /// Drop cached tables; the next request reloads them
    pub async fn invalidate(&self, scope: InvalidateScope) -> usize {
        let mut dropped = 0;
        if matches!(scope, InvalidateScope::Listings | InvalidateScope::All) {
            dropped += self.listings.invalidate_all().await;
        }
        if matches!(scope, InvalidateScope::Areas | InvalidateScope::All) {
            dropped += self.areas.invalidate_all().await;
        }
        info!("Cache invalidated ({:?}): {} table(s) dropped", scope, dropped);
        dropped
    }
}
