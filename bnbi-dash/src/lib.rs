//! bnbi-dash library - rental investment dashboard service
//!
//! Loads listings from the configured record source, cleans them, and
//! serves the dashboard views as JSON.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod pagination;
pub mod source;
pub mod views;

use loader::Dataset;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
}

impl AppState {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let views = Router::new()
        .route("/api/views/room-types", get(api::get_room_types))
        .route("/api/views/property-groups", get(api::get_property_groups))
        .route("/api/views/neighbourhood-rooms", get(api::get_neighbourhood_rooms))
        .route("/api/views/price-map", get(api::get_price_map))
        .route("/api/views/price-distribution", get(api::get_price_distribution))
        .route("/api/views/investment", get(api::get_investment))
        .route("/api/views/amenities", get(api::get_amenities))
        .route("/api/dashboard", get(api::get_dashboard));

    Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .route("/api/listings", get(api::get_listings))
        .route("/api/options", get(api::get_options))
        .route("/api/cache/invalidate", post(api::invalidate_cache))
        .merge(views)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
