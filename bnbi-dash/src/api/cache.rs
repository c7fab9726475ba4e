//! Cache control endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::loader::InvalidateScope;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InvalidateQuery {
    #[serde(default)]
    pub scope: InvalidateScope,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub scope: InvalidateScope,
    pub dropped: usize,
}

/// POST /api/cache/invalidate?scope=listings|areas|all
///
/// Drops cached tables so the next request refetches from the source.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Query(query): Query<InvalidateQuery>,
) -> Json<InvalidateResponse> {
    info!("Cache invalidation requested ({:?})", query.scope);
    let dropped = state.dataset.invalidate(query.scope).await;
    Json(InvalidateResponse {
        scope: query.scope,
        dropped,
    })
}
