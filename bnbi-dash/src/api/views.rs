//! Dashboard view endpoints
//!
//! Single-view endpoints report an invalid selection as 400; the combined
//! dashboard isolates each view instead.

use axum::{
    extract::{Query, State},
    Json,
};
use bnbi_common::aggregate::{CategoryCount, RoomTypePivot};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiResult;
use crate::views::{
    self, AmenitiesView, DashboardQuery, DashboardView, InvestmentView, PriceDistributionView, PriceMapView,
    PropertyGroupsView, ViewOutcome,
};
use crate::AppState;

/// GET /api/views/room-types
pub async fn get_room_types(State(state): State<AppState>) -> ApiResult<Json<ViewOutcome<Vec<CategoryCount>>>> {
    let snapshot = state.dataset.listings().await?;
    Ok(Json(views::room_types(&snapshot.base)))
}

/// GET /api/views/property-groups
pub async fn get_property_groups(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<ViewOutcome<PropertyGroupsView>>> {
    let snapshot = state.dataset.listings().await?;
    Ok(Json(views::property_groups(&snapshot.base, &query)))
}

/// GET /api/views/neighbourhood-rooms
pub async fn get_neighbourhood_rooms(State(state): State<AppState>) -> ApiResult<Json<ViewOutcome<RoomTypePivot>>> {
    let snapshot = state.dataset.listings().await?;
    Ok(Json(views::neighbourhood_rooms(&snapshot.base)))
}

/// GET /api/views/price-map
pub async fn get_price_map(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<ViewOutcome<PriceMapView>>> {
    let snapshot = state.dataset.listings().await?;
    Ok(Json(views::price_map(&snapshot.base, &query)?))
}

/// GET /api/views/price-distribution
pub async fn get_price_distribution(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<ViewOutcome<PriceDistributionView>>> {
    let snapshot = state.dataset.listings().await?;
    Ok(Json(views::price_distribution(&snapshot.base, &query)?))
}

/// GET /api/views/investment
pub async fn get_investment(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<ViewOutcome<InvestmentView>>> {
    let snapshot = state.dataset.listings().await?;
    let areas = state.dataset.areas().await?;
    Ok(Json(views::investment(&snapshot.base, &areas, &query)?))
}

/// GET /api/views/amenities
pub async fn get_amenities(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<ViewOutcome<AmenitiesView>>> {
    let snapshot = state.dataset.listings().await?;
    Ok(Json(views::amenities(&snapshot.base, &query)?))
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub views: DashboardView,
    pub loaded_at: DateTime<Utc>,
}

/// GET /api/dashboard
///
/// Every view for one selection. Fails as a whole only when the listings
/// cannot be loaded.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardResponse>> {
    let snapshot = state.dataset.listings().await?;
    let areas = state.dataset.areas().await;
    let views = views::render_all(&snapshot.base, areas.as_deref(), &query);
    Ok(Json(DashboardResponse {
        views,
        loaded_at: snapshot.loaded_at,
    }))
}
