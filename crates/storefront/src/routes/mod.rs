//! HTTP route handlers for the search service.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (shared store reachable)
//!
//! # Search
//! GET  /search                  - Unified search (alias of /api/search)
//! GET  /api/search              - Unified search: { products, errors }
//! GET  /api/bestbuy/search      - Best Buy records: { products, page }
//! GET  /api/walmart/search      - Walmart items: { items }
//!
//! # Outbound links
//! GET  /affiliate/redirect      - 302 to an http(s) purchase link
//! GET  /api/affiliate/redirect  - Same, under /api
//! ```

pub mod affiliate;
pub mod api;
pub mod health;
pub mod search;

use axum::{Router, routing::get};

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Create the `/api` routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search::unified))
        .route("/bestbuy/search", get(api::bestbuy::search))
        .route("/walmart/search", get(api::walmart::search))
        .route("/affiliate/redirect", get(affiliate::redirect))
}

/// Create all search and redirect routes.
///
/// When `limiter` is given it wraps every route here; health checks live
/// outside this router and are never limited.
pub fn routes(limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let router = Router::new()
        .route("/search", get(search::unified))
        .route("/affiliate/redirect", get(affiliate::redirect))
        .nest("/api", api_routes());

    match limiter {
        Some(layer) => router.layer(layer),
        None => router,
    }
}
