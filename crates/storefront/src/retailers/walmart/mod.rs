//! Walmart affiliate API adapter.
//!
//! Every request carries RSA-signed headers (see [`SignatureSigner`]). A
//! search is one keyword call; when a postal code is given the first
//! [`LOOKUP_LIMIT`] items are enriched concurrently with per-item store
//! offers. A failed lookup only annotates its own item. Every outbound call,
//! lookups included, takes a rate-limiter slot first.

mod types;

use std::sync::LazyLock;

use async_trait::async_trait;
use localstock_core::{Product, ProductId, SearchRequest, Source, StockStatus, effective_price};
use regex::Regex;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::instrument;

pub use types::{ItemId, StoreOffers, WalmartItem, WalmartResults};

use super::limiter::RateLimiter;
use super::retry::RetryExecutor;
use super::signer::{SignatureSigner, timestamp_now};
use super::transport::OutboundRequest;
use super::{RawRecords, Retailer, RetailerError, RetailerResults};
use crate::config::WalmartConfig;

/// Items enriched with store offers per search.
pub const LOOKUP_LIMIT: usize = 6;

/// Body of a 403 that means the account lacks lookup permissions.
static NOT_AUTHORIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)youare|notauthorized").expect("Invalid regex"));

/// Walmart affiliate API client.
pub struct WalmartClient {
    config: WalmartConfig,
    executor: RetryExecutor,
    limiter: RateLimiter,
    /// Loaded on first use; missing credentials fail each search instead.
    signer: OnceCell<SignatureSigner>,
}

impl std::fmt::Debug for WalmartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalmartClient")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .field("signer_loaded", &self.signer.initialized())
            .finish_non_exhaustive()
    }
}

impl WalmartClient {
    #[must_use]
    pub fn new(config: WalmartConfig, executor: RetryExecutor, limiter: RateLimiter) -> Self {
        Self {
            config,
            executor,
            limiter,
            signer: OnceCell::new(),
        }
    }

    /// The request signer, loading the key on first call.
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::Configuration`] when credentials are missing
    /// or the key is unusable.
    pub async fn signer(&self) -> Result<&SignatureSigner, RetailerError> {
        self.signer
            .get_or_try_init(|| SignatureSigner::from_config(&self.config))
            .await
    }

    /// Signed headers for a request made now (or at the pinned timestamp).
    ///
    /// # Errors
    ///
    /// See [`Self::signer`].
    pub async fn signed_headers(&self) -> Result<Vec<(String, String)>, RetailerError> {
        let timestamp = self
            .config
            .fixed_timestamp
            .clone()
            .unwrap_or_else(timestamp_now);
        self.signer().await?.signed_headers(&timestamp)
    }

    fn search_url(&self, request: &SearchRequest) -> String {
        let mut url = format!(
            "{}/product/v2/search?query={}",
            self.config.base_url,
            urlencoding::encode(request.query())
        );
        if let Some(zip) = request.postal_code() {
            url.push_str("&postalCode=");
            url.push_str(zip.as_str());
        }
        url
    }

    fn lookup_urls(&self, item_id: &str, zip: &str) -> [String; 2] {
        let item_id = urlencoding::encode(item_id);
        [
            format!(
                "{}/affiliate-marketing-api/v1/product/lookup?itemId={item_id}&postalCode={zip}",
                self.config.base_url
            ),
            format!(
                "{}/product/v1/lookup?itemId={item_id}&postalCode={zip}",
                self.config.base_url
            ),
        ]
    }

    /// Search Walmart.
    ///
    /// # Errors
    ///
    /// - [`RetailerError::Configuration`] before any network call when
    ///   credentials are missing
    /// - [`RetailerError::Upstream`] with the status and body of a non-2xx
    ///   search response
    /// - [`RetailerError::Parse`] when the search body is not JSON
    #[instrument(
        skip(self, request),
        fields(query = %request.query(), zip = ?request.postal_code().map(|z| z.as_str()))
    )]
    pub async fn search_items(
        &self,
        request: &SearchRequest,
    ) -> Result<WalmartResults, RetailerError> {
        let headers = self.signed_headers().await?;

        self.take_slot().await;
        let outbound = OutboundRequest::get(self.search_url(request)).with_headers(&headers);
        let response = self.executor.execute(&outbound).await?;
        if !response.is_success() {
            tracing::error!(status = response.status.as_u16(), "Walmart search failed");
            return Err(RetailerError::Upstream {
                status: response.status.as_u16(),
                body: response.body_excerpt(1000),
            });
        }

        let parsed: types::SearchResponse = serde_json::from_str(&response.body)
            .map_err(|e| RetailerError::Parse(e.to_string()))?;
        let mut items = parsed.items;

        for item in &mut items {
            item.affiliate_url = item.purchase_url();
        }

        if let Some(zip) = request.postal_code() {
            self.attach_store_offers(&mut items, zip.as_str(), &headers)
                .await;
        }

        tracing::info!(count = items.len(), "Walmart search complete");
        Ok(WalmartResults { items })
    }

    /// Wait for a limiter slot; a timeout is logged and the call goes ahead.
    async fn take_slot(&self) {
        if let Err(e) = self.limiter.acquire().await {
            tracing::warn!(error = %e, "proceeding without a rate limiter slot");
        }
    }

    /// Look up store offers for the first items, concurrently.
    async fn attach_store_offers(
        &self,
        items: &mut [WalmartItem],
        zip: &str,
        headers: &[(String, String)],
    ) {
        let lookups = items
            .iter()
            .take(LOOKUP_LIMIT)
            .map(|item| {
                let id = item.native_id();
                async move {
                    match id {
                        Some(id) => Some(self.lookup_offers(&id, zip, headers).await),
                        None => None,
                    }
                }
            })
            .collect::<Vec<_>>();

        let offers = futures::future::join_all(lookups).await;
        for (item, offers) in items.iter_mut().zip(offers) {
            if offers.is_some() {
                item.store_offers = offers;
            }
        }
    }

    /// Try each lookup endpoint once, in order.
    ///
    /// A 403 that says the account is not authorized stops the search for
    /// this item; any other failure moves on to the next endpoint.
    async fn lookup_offers(&self, item_id: &str, zip: &str, headers: &[(String, String)]) -> StoreOffers {
        for url in self.lookup_urls(item_id, zip) {
            self.take_slot().await;
            let outbound = OutboundRequest::get(url).with_headers(headers);
            let response = match self.executor.transport().send(outbound).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(item_id, error = %e, "store lookup transport error, trying next endpoint");
                    continue;
                }
            };

            if response.is_success() {
                let data = serde_json::from_str::<Value>(&response.body)
                    .unwrap_or_else(|_| Value::String(response.body.clone()));
                return StoreOffers::from_lookup(data);
            }

            if response.status == StatusCode::FORBIDDEN && NOT_AUTHORIZED_RE.is_match(&response.body) {
                tracing::warn!(item_id, "not authorized for Walmart product lookup");
                return StoreOffers::not_authorized(response.body);
            }

            tracing::debug!(
                item_id,
                status = response.status.as_u16(),
                "store lookup failed, trying next endpoint"
            );
        }

        StoreOffers::no_data()
    }
}

#[async_trait]
impl Retailer for WalmartClient {
    fn source(&self) -> Source {
        Source::Walmart
    }

    async fn search(&self, request: &SearchRequest) -> Result<RetailerResults, RetailerError> {
        let results = self.search_items(request).await?;
        Ok(RetailerResults {
            records: RawRecords::Walmart(results.items),
            page: request.page(),
        })
    }
}

/// Map Walmart's free-text stock field.
fn stock_status(item: &WalmartItem) -> StockStatus {
    let stock = item.stock.as_deref().unwrap_or_default().to_lowercase();
    if stock == "available" || stock == "in stock" {
        StockStatus::InStock
    } else if stock.starts_with("limited") {
        StockStatus::LowStock
    } else if item.available_online == Some(true) {
        StockStatus::OnlineOnly
    } else {
        StockStatus::Unavailable
    }
}

/// Map a Walmart item into the unified schema.
#[must_use]
pub fn normalize(item: &WalmartItem) -> Option<Product> {
    let native_id = item.native_id()?;
    let price = effective_price(item.sale_price, item.msrp)?;
    let store_available = match &item.store_offers {
        Some(StoreOffers::Found(_)) => Some(true),
        _ => None,
    };

    Some(Product {
        id: ProductId::new(Source::Walmart, native_id),
        source: Source::Walmart,
        name: item.name.clone().unwrap_or_default(),
        price,
        stock_status: stock_status(item),
        image_url: item.image().map(str::to_owned),
        product_url: item.affiliate_url.clone().or_else(|| item.purchase_url()),
        store_distance: None,
        store_available,
    })
}
