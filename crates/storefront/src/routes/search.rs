//! Unified search route.

use axum::{
    Json,
    extract::{Query, State},
};
use localstock_core::{SearchRequest, SearchRequestError};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::retailers::AggregatedResults;
use crate::state::AppState;

/// Query parameters shared by every search endpoint.
///
/// Kept as raw strings so that validation produces our own 400 body rather
/// than the extractor's rejection text.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub zip: Option<String>,
    pub page: Option<String>,
}

impl SearchParams {
    /// Validate into a [`SearchRequest`].
    ///
    /// # Errors
    ///
    /// Returns an error when `q` is missing or `zip` is malformed.
    pub fn to_request(&self) -> std::result::Result<SearchRequest, SearchRequestError> {
        SearchRequest::from_params(
            self.q.as_deref(),
            self.zip.as_deref(),
            self.page.as_deref(),
        )
    }
}

/// Record the search in the Sentry trail.
pub(crate) fn breadcrumb(endpoint: &str, request: &SearchRequest) {
    let zip = request.postal_code().map_or("", |z| z.as_str());
    let page = request.page().to_string();
    add_breadcrumb(
        "search",
        endpoint,
        Some(&[("query", request.query()), ("zip", zip), ("page", page.as_str())]),
    );
}

/// `GET /api/search` (and `/search`): every retailer, merged and sorted.
#[instrument(skip(state, params))]
pub async fn unified(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<AggregatedResults>> {
    let request = params.to_request()?;
    breadcrumb("Unified search", &request);

    Ok(Json(state.aggregator().search(&request).await))
}
