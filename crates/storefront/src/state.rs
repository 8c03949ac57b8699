//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::StorefrontConfig;
use crate::retailers::cache::ResultCache;
use crate::retailers::limiter::RateLimiter;
use crate::retailers::retry::{RetryExecutor, RetryPolicy};
use crate::retailers::{
    Aggregator, BestBuyClient, HttpTransport, KvStore, Retailer, ReqwestTransport,
    TransportError, WalmartClient, connect_store,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// retailer clients, the aggregator and the shared store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn KvStore>,
    bestbuy: Arc<BestBuyClient>,
    walmart: Arc<WalmartClient>,
    aggregator: Aggregator,
}

impl AppState {
    /// Build state for the running service: connect the shared store and
    /// create the production HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn build(config: StorefrontConfig) -> Result<Self, TransportError> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        let store = connect_store(config.redis_url.as_ref().map(ExposeSecret::expose_secret)).await;
        Ok(Self::from_parts(config, transport, store))
    }

    /// Wire state from explicit parts.
    ///
    /// The result cache only gets a shared tier when the store is an external
    /// service; an in-process store would just duplicate the local tier.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let executor = RetryExecutor::new(transport, RetryPolicy::default());
        let shared_tier = (store.kind() != "memory").then(|| Arc::clone(&store));

        let bestbuy = Arc::new(BestBuyClient::new(
            config.bestbuy.clone(),
            executor.clone(),
            RateLimiter::new(
                Arc::clone(&store),
                "bestbuy",
                config.bestbuy.rate_limit_per_sec,
            ),
            ResultCache::new(config.cache_ttl, shared_tier),
        ));
        let walmart = Arc::new(WalmartClient::new(
            config.walmart.clone(),
            executor,
            RateLimiter::new(
                Arc::clone(&store),
                "walmart",
                config.walmart.rate_limit_per_sec,
            ),
        ));

        let aggregator = Aggregator::new(vec![
            Arc::clone(&bestbuy) as Arc<dyn Retailer>,
            Arc::clone(&walmart) as Arc<dyn Retailer>,
        ]);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                bestbuy,
                walmart,
                aggregator,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the shared key-value store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.inner.store
    }

    /// Get a reference to the Best Buy client.
    #[must_use]
    pub fn bestbuy(&self) -> &BestBuyClient {
        &self.inner.bestbuy
    }

    /// Get a reference to the Walmart client.
    #[must_use]
    pub fn walmart(&self) -> &WalmartClient {
        &self.inner.walmart
    }

    /// Get a reference to the unified aggregator.
    #[must_use]
    pub fn aggregator(&self) -> &Aggregator {
        &self.inner.aggregator
    }
}
