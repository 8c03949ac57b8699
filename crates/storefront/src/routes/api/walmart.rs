//! Walmart passthrough endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use crate::error::Result;
use crate::retailers::WalmartResults;
use crate::routes::search::{SearchParams, breadcrumb};
use crate::state::AppState;

/// `GET /api/walmart/search?q&zip` → `{ items }`.
#[instrument(skip(state, params))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<WalmartResults>> {
    let request = params.to_request()?;
    breadcrumb("Walmart search", &request);

    Ok(Json(state.walmart().search_items(&request).await?))
}
