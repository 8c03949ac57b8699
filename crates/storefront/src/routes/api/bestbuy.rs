//! Best Buy passthrough endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use crate::error::Result;
use crate::retailers::BestBuyResults;
use crate::routes::search::{SearchParams, breadcrumb};
use crate::state::AppState;

/// `GET /api/bestbuy/search?q&zip&page` → `{ products, page }`.
///
/// With a zip the records are in-store matches near it, nearest store first
/// per SKU. Without one they come straight from keyword search.
#[instrument(skip(state, params))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<BestBuyResults>> {
    let request = params.to_request()?;
    breadcrumb("Best Buy search", &request);

    Ok(Json(state.bestbuy().search_products(&request).await?))
}
