//! Middleware for the search service.

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::{ProxyIpKeyExtractor, RateLimiterLayer, search_rate_limiter};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
