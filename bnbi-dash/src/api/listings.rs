//! Listing table and filter option endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use bnbi_common::aggregate::{filter_options, investment_property_options, FilterOptions};
use bnbi_common::{ListingFilter, ListingRecord, PipelineWarning, PropertyGroup};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::AppState;

/// Which table `/api/listings` pages through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Cleaned and outlier-filtered (what the views use)
    #[default]
    Base,
    /// Cleaned only
    Cleaned,
}

/// Query parameters for listing browsing
#[derive(Debug, Deserialize)]
pub struct ListingsQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default)]
    pub stage: Stage,

    pub room_type: Option<String>,
    /// Property group name or "All"
    pub property_group: Option<String>,
    pub bedrooms: Option<f64>,
    pub neighbourhood: Option<String>,
}

fn default_page() -> usize {
    1
}

impl ListingsQuery {
    fn filter(&self) -> bnbi_common::Result<ListingFilter> {
        Ok(ListingFilter {
            room_type: self.room_type.clone(),
            property_group: PropertyGroup::parse_selection(self.property_group.as_deref())?,
            bedrooms: self.bedrooms,
            neighbourhood: self.neighbourhood.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub total_rows: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub amenity_columns: Vec<String>,
    pub rows: Vec<ListingRecord>,
    pub warnings: Vec<PipelineWarning>,
    pub loaded_at: DateTime<Utc>,
}

/// GET /api/listings
///
/// Filtered, paginated listing rows.
pub async fn get_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> ApiResult<Json<ListingsResponse>> {
    let filter = query.filter()?;
    let snapshot = state.dataset.listings().await?;
    let table = match query.stage {
        Stage::Base => &snapshot.base,
        Stage::Cleaned => &snapshot.cleaned,
    };

    let matching: Vec<&ListingRecord> = table.records.iter().filter(|r| filter.matches(r)).collect();
    let pagination = calculate_pagination(matching.len(), query.page);
    let rows = pagination.slice(&matching).iter().map(|r| (*r).clone()).collect();

    Ok(Json(ListingsResponse {
        total_rows: matching.len(),
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        amenity_columns: table.amenity_columns.clone(),
        rows,
        warnings: table.warnings.clone(),
        loaded_at: snapshot.loaded_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    #[serde(flatten)]
    pub options: FilterOptions,
    /// "All" followed by the property groups present
    pub investment_property_groups: Vec<String>,
    pub has_bedrooms: bool,
}

/// GET /api/options
///
/// Filter widget choices drawn from the base table.
pub async fn get_options(State(state): State<AppState>) -> ApiResult<Json<OptionsResponse>> {
    let snapshot = state.dataset.listings().await?;
    let records = &snapshot.base.records;
    Ok(Json(OptionsResponse {
        options: filter_options(records),
        investment_property_groups: investment_property_options(records),
        has_bedrooms: snapshot.base.has_bedrooms(),
    }))
}
