//! Retailer data acquisition.
//!
//! Each retailer adapter runs its own multi-step query (keyword search,
//! candidate gathering, per-store lookup) on top of shared plumbing:
//!
//! - [`transport`] - one outbound HTTP exchange, swappable in tests
//! - [`retry`] - bounded retry with exponential backoff
//! - [`limiter`] - per-provider calls-per-second cap in the shared store
//! - [`cache`] - two-tier result cache
//! - [`signer`] - API keys and signed request headers
//! - [`store`] - the shared key-value store behind cache and limiter
//!
//! Adapters emit provider-native records ([`RawRecords`]); the
//! [`aggregator`] normalizes them into [`Product`]s.

pub mod aggregator;
pub mod bestbuy;
pub mod cache;
pub mod limiter;
pub mod retry;
pub mod signer;
pub mod store;
pub mod transport;
pub mod walmart;

use async_trait::async_trait;
use localstock_core::{Product, SearchRequest, Source};
use thiserror::Error;

pub use aggregator::{AggregatedResults, Aggregator};
pub use bestbuy::{BestBuyClient, BestBuyProduct, BestBuyResults};
pub use store::{KvStore, MemoryStore, RedisStore, StoreError, connect_store};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
pub use walmart::{WalmartClient, WalmartItem, WalmartResults};

/// Errors from a retailer adapter.
///
/// Display strings end up in user-facing diagnostics, so none of them carry
/// secret material.
#[derive(Debug, Error)]
pub enum RetailerError {
    /// Credentials missing or unusable. Carries the variable name only.
    #[error("{0} is not configured")]
    Configuration(&'static str),

    /// The retailer answered with a non-success status.
    #[error("upstream responded with status {status}")]
    Upstream { status: u16, body: String },

    /// Every attempt failed with a retryable status or transport error.
    #[error("upstream failed after {attempts} attempts: {last_error}")]
    UpstreamExhausted { attempts: u32, last_error: String },

    /// No outbound slot within the limiter's wait ceiling.
    #[error("rate limit slot for {provider} not available in time")]
    RateLimitExceeded { provider: &'static str },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The retailer answered 2xx with a body we could not read.
    #[error("malformed upstream response: {0}")]
    Parse(String),
}

impl RetailerError {
    /// Status to surface at the HTTP boundary for an upstream failure.
    #[must_use]
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Provider-native records from one search.
#[derive(Debug, Clone)]
pub enum RawRecords {
    BestBuy(Vec<BestBuyProduct>),
    Walmart(Vec<WalmartItem>),
}

impl RawRecords {
    /// Map into the unified schema, dropping records without a usable price.
    #[must_use]
    pub fn normalize(self) -> Vec<Product> {
        match self {
            Self::BestBuy(records) => records.iter().filter_map(bestbuy::normalize).collect(),
            Self::Walmart(records) => records.iter().filter_map(walmart::normalize).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::BestBuy(records) => records.len(),
            Self::Walmart(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One adapter's answer for one request.
#[derive(Debug, Clone)]
pub struct RetailerResults {
    pub records: RawRecords,
    pub page: u32,
}

/// A retailer the aggregator can fan out to.
///
/// Soft failures (no matches, a failed enrichment of one record) come back
/// as `Ok` with fewer records; only unrecoverable failures are `Err`.
#[async_trait]
pub trait Retailer: Send + Sync {
    fn source(&self) -> Source;

    async fn search(&self, request: &SearchRequest) -> Result<RetailerResults, RetailerError>;
}
