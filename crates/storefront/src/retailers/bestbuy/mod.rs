//! Best Buy adapter.
//!
//! With a postal code the adapter runs the local-stock path:
//!
//! 1. Serve from the result cache when fresh.
//! 2. Gather up to [`PAGE_SIZE`] candidate SKUs from up to
//!    [`CANDIDATE_PAGES`] product-search pages, skipping warranty add-ons.
//! 3. Look the candidates up at stores near the postal code in one batched
//!    call, falling back to one call per SKU when the batch fails.
//! 4. Keep the nearest store sighting per SKU and cache the result.
//!
//! Without a postal code it runs one plain product search.
//!
//! Every call takes a rate-limiter slot first (a timeout is logged and the
//! call goes ahead anyway) and then runs through the retry executor.

mod types;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use localstock_core::{Product, ProductId, SearchRequest, Source, StockStatus, effective_price};
use secrecy::ExposeSecret;
use tracing::instrument;

pub use types::{BestBuyProduct, BestBuyResults, ProductHit, ProductSearchResponse, StoreSearchResponse};

use super::cache::{CacheKey, ResultCache};
use super::limiter::RateLimiter;
use super::retry::RetryExecutor;
use super::signer;
use super::transport::{OutboundRequest, TransportResponse};
use super::{RawRecords, Retailer, RetailerError, RetailerResults};
use crate::config::BestBuyConfig;

/// Candidates to gather, and the page size of every call.
pub const PAGE_SIZE: usize = 10;

/// Product-search pages scanned per requested page.
pub const CANDIDATE_PAGES: u32 = 3;

/// Pause between consecutive product-search pages.
const PAGE_DELAY: Duration = Duration::from_millis(250);

/// Lowercase name fragments of listings that are never what the user wants.
const DENYLIST: &[&str] = &["applecare", "apple care"];

/// Product fields requested from product search.
const SEARCH_FIELDS: &str = "sku,name,regularPrice,salePrice,image,url,addToCartUrl,inStoreAvailability,onlineAvailability";

/// Fields requested from the store lookup.
const STORE_FIELDS: &str = "storeId,name,distance,products.sku,products.name,products.regularPrice,products.salePrice,products.image,products.url,products.addToCartUrl,products.inStoreAvailability";

/// Best Buy products API client.
#[derive(Clone)]
pub struct BestBuyClient {
    config: BestBuyConfig,
    executor: RetryExecutor,
    limiter: RateLimiter,
    cache: ResultCache<Vec<BestBuyProduct>>,
}

impl std::fmt::Debug for BestBuyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BestBuyClient")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl BestBuyClient {
    #[must_use]
    pub fn new(
        config: BestBuyConfig,
        executor: RetryExecutor,
        limiter: RateLimiter,
        cache: ResultCache<Vec<BestBuyProduct>>,
    ) -> Self {
        Self {
            config,
            executor,
            limiter,
            cache,
        }
    }

    /// Search Best Buy.
    ///
    /// # Errors
    ///
    /// - [`RetailerError::Configuration`] when no API key is configured
    ///   (before any network call)
    /// - an upstream error when the first product-search page fails, or when
    ///   every store lookup fails
    #[instrument(
        skip(self, request),
        fields(query = %request.query(), zip = ?request.postal_code().map(|z| z.as_str()), page = request.page())
    )]
    pub async fn search_products(
        &self,
        request: &SearchRequest,
    ) -> Result<BestBuyResults, RetailerError> {
        let api_key = signer::api_key(self.config.api_key.as_ref(), "BESTBUY_API_KEY")?;
        let api_key = api_key.expose_secret();
        let page = request.page();

        let cache_key = CacheKey::for_search(Source::BestBuy.as_str(), request);
        if let Some(products) = self.cache.lookup(&cache_key).await {
            return Ok(BestBuyResults { products, page });
        }

        let products = match request.postal_code() {
            Some(zip) => {
                let skus = self.gather_candidates(api_key, request).await?;
                if skus.is_empty() {
                    tracing::info!("no matching SKUs for query");
                    return Ok(BestBuyResults {
                        products: Vec::new(),
                        page,
                    });
                }
                self.lookup_stores(api_key, zip.as_str(), &skus).await?
            }
            None => self.plain_search(api_key, request).await?,
        };

        tracing::info!(count = products.len(), "Best Buy search complete");
        self.cache.store(&cache_key, products.clone()).await;
        Ok(BestBuyResults { products, page })
    }

    fn product_search_url(&self, api_key: &str, query: &str, page: u32) -> String {
        format!(
            "{}/products((search={})&onSale=true&condition=new&inStoreAvailability=true)?apiKey={}&format=json&show={}&pageSize={PAGE_SIZE}&page={page}&sort=salePrice.desc",
            self.config.base_url,
            urlencoding::encode(query),
            urlencoding::encode(api_key),
            SEARCH_FIELDS,
        )
    }

    fn store_lookup_url(&self, api_key: &str, zip: &str, sku_filter: &str) -> String {
        format!(
            "{}/stores(area({zip},{}))+products({sku_filter})?apiKey={}&format=json&show={}&pageSize={PAGE_SIZE}",
            self.config.base_url,
            self.config.store_radius_miles,
            urlencoding::encode(api_key),
            STORE_FIELDS,
        )
    }

    /// Take a limiter slot, then run the call with retries.
    ///
    /// Non-success statuses the retry policy hands back become
    /// [`RetailerError::Upstream`].
    async fn call(&self, url: String) -> Result<TransportResponse, RetailerError> {
        if let Err(e) = self.limiter.acquire().await {
            tracing::warn!(error = %e, "proceeding without a rate limiter slot");
        }

        let response = self.executor.execute(&OutboundRequest::get(url)).await?;
        if !response.is_success() {
            return Err(RetailerError::Upstream {
                status: response.status.as_u16(),
                body: response.body_excerpt(1000),
            });
        }
        Ok(response)
    }

    /// Collect unique, non-denylisted SKUs from the candidate pages.
    ///
    /// The first page must succeed and parse; later failures end the scan
    /// with what has been gathered.
    async fn gather_candidates(
        &self,
        api_key: &str,
        request: &SearchRequest,
    ) -> Result<Vec<u64>, RetailerError> {
        let first_page = (request.page() - 1) * CANDIDATE_PAGES + 1;
        let mut skus: Vec<u64> = Vec::with_capacity(PAGE_SIZE);

        for (index, search_page) in (first_page..first_page + CANDIDATE_PAGES).enumerate() {
            if skus.len() >= PAGE_SIZE {
                break;
            }
            if index > 0 {
                tokio::time::sleep(PAGE_DELAY).await;
            }

            let url = self.product_search_url(api_key, request.query(), search_page);
            let response = match self.call(url).await {
                Ok(response) => response,
                Err(e) if index == 0 => {
                    tracing::error!(error = %e, "Best Buy product search failed");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, search_page, "later product-search page failed, using partial candidates");
                    break;
                }
            };

            let parsed: ProductSearchResponse = match serde_json::from_str(&response.body) {
                Ok(parsed) => parsed,
                Err(e) if index == 0 => {
                    tracing::error!(error = %e, "unreadable Best Buy product-search response");
                    return Err(RetailerError::Parse(e.to_string()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, search_page, "unreadable product-search page, using partial candidates");
                    break;
                }
            };

            // An empty page means the listing has run out even when
            // `totalPages` is missing.
            let last_page = parsed.products.is_empty()
                || parsed.total_pages.is_some_and(|total| search_page >= total);

            for sku in parsed
                .products
                .iter()
                .filter(|hit| !is_denylisted(hit.name.as_deref()))
                .filter_map(|hit| hit.sku)
            {
                if skus.len() >= PAGE_SIZE {
                    break;
                }
                if !skus.contains(&sku) {
                    skus.push(sku);
                }
            }

            if last_page {
                break;
            }
        }

        tracing::debug!(candidates = skus.len(), "gathered candidate SKUs");
        Ok(skus)
    }

    /// Per-store availability for the candidates, nearest sighting per SKU.
    async fn lookup_stores(
        &self,
        api_key: &str,
        zip: &str,
        skus: &[u64],
    ) -> Result<Vec<BestBuyProduct>, RetailerError> {
        let sku_list = skus
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let batched = self.store_lookup_url(api_key, zip, &format!("sku%20in({sku_list})"));

        match self.fetch_store_products(batched).await {
            Ok(products) => return Ok(dedup_nearest(products)),
            Err(e) => {
                tracing::warn!(error = %e, "batched store lookup failed, falling back to per-SKU lookups");
            }
        }

        let mut sightings = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;
        for sku in skus {
            let url = self.store_lookup_url(api_key, zip, &format!("sku={sku}"));
            match self.fetch_store_products(url).await {
                Ok(products) => {
                    succeeded += 1;
                    sightings.extend(products);
                }
                Err(e) => {
                    tracing::warn!(sku, error = %e, "store lookup failed for SKU");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(dedup_nearest(sightings)),
        }
    }

    async fn fetch_store_products(&self, url: String) -> Result<Vec<BestBuyProduct>, RetailerError> {
        let response = self.call(url).await?;
        let parsed: StoreSearchResponse = serde_json::from_str(&response.body)
            .map_err(|e| RetailerError::Parse(e.to_string()))?;

        Ok(parsed
            .stores
            .iter()
            .flat_map(|store| {
                store
                    .products
                    .iter()
                    .filter_map(|hit| BestBuyProduct::from_store_hit(hit, store.distance))
            })
            .collect())
    }

    /// One product-search page, no store context.
    async fn plain_search(
        &self,
        api_key: &str,
        request: &SearchRequest,
    ) -> Result<Vec<BestBuyProduct>, RetailerError> {
        let url = self.product_search_url(api_key, request.query(), request.page());
        let response = self.call(url).await?;
        let parsed: ProductSearchResponse = serde_json::from_str(&response.body)
            .map_err(|e| RetailerError::Parse(e.to_string()))?;

        Ok(parsed
            .products
            .iter()
            .filter(|hit| !is_denylisted(hit.name.as_deref()))
            .filter_map(BestBuyProduct::from_search_hit)
            .collect())
    }
}

#[async_trait]
impl Retailer for BestBuyClient {
    fn source(&self) -> Source {
        Source::BestBuy
    }

    async fn search(&self, request: &SearchRequest) -> Result<RetailerResults, RetailerError> {
        let results = self.search_products(request).await?;
        Ok(RetailerResults {
            records: RawRecords::BestBuy(results.products),
            page: results.page,
        })
    }
}

fn is_denylisted(name: Option<&str>) -> bool {
    let name = name.unwrap_or_default().to_lowercase();
    DENYLIST.iter().any(|word| name.contains(word))
}

/// One record per SKU, in first-seen order.
///
/// A duplicate replaces the kept record when it has a known distance and the
/// kept one doesn't, or when both are known and it is strictly nearer.
#[must_use]
pub fn dedup_nearest(records: impl IntoIterator<Item = BestBuyProduct>) -> Vec<BestBuyProduct> {
    let mut kept: Vec<BestBuyProduct> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();

    for record in records {
        match index.get(&record.sku) {
            None => {
                index.insert(record.sku, kept.len());
                kept.push(record);
            }
            Some(&at) => {
                let Some(current) = kept.get_mut(at) else {
                    continue;
                };
                let nearer = match (record.store_distance, current.store_distance) {
                    (Some(_), None) => true,
                    (Some(new), Some(old)) => new < old,
                    (None, _) => false,
                };
                if nearer {
                    *current = record;
                }
            }
        }
    }

    kept
}

/// Map a Best Buy record into the unified schema.
#[must_use]
pub fn normalize(record: &BestBuyProduct) -> Option<Product> {
    let price = effective_price(record.sale_price, record.regular_price)?;

    let stock_status = if record.in_store_availability {
        StockStatus::InStock
    } else if record.online_availability == Some(true) {
        StockStatus::OnlineOnly
    } else {
        StockStatus::Unavailable
    };

    Some(Product {
        id: ProductId::new(Source::BestBuy, record.sku),
        source: Source::BestBuy,
        name: record.name.clone(),
        price,
        stock_status,
        image_url: record.image.clone(),
        product_url: record.url.clone(),
        store_distance: Product::sanitize_distance(record.store_distance),
        store_available: Some(record.in_store_availability),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use localstock_core::PostalCode;
    use rust_decimal_macros::dec;
    use secrecy::SecretString;

    use super::*;
    use crate::retailers::cache::DEFAULT_TTL;
    use crate::retailers::retry::RetryPolicy;
    use crate::retailers::store::{KvStore, MemoryStore};
    use crate::retailers::transport::test_support::ScriptedTransport;

    const PRODUCT_SEARCH: &str = "/products((search=";
    const STORES: &str = "/stores(";

    fn client(transport: &Arc<ScriptedTransport>, api_key: Option<&str>) -> BestBuyClient {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let config = BestBuyConfig {
            api_key: api_key.map(SecretString::from),
            ..BestBuyConfig::default()
        };
        BestBuyClient::new(
            config,
            RetryExecutor::new(Arc::<ScriptedTransport>::clone(transport), RetryPolicy::default()),
            RateLimiter::new(store, "bestbuy", 5),
            ResultCache::new(DEFAULT_TTL, None),
        )
    }

    fn request(q: &str, zip: Option<&str>) -> SearchRequest {
        SearchRequest::new(q, zip.map(|z| PostalCode::parse(z).unwrap()), 1).unwrap()
    }

    fn search_page() -> String {
        serde_json::json!({
            "products": [
                {"sku": 1001, "name": "AirPods Pro", "salePrice": 199.0, "regularPrice": 249.0, "inStoreAvailability": true},
                {"sku": 1002, "name": "AirPods Max", "salePrice": 449.0, "regularPrice": 549.0, "inStoreAvailability": true},
                {"sku": 2000, "name": "AppleCare+ for AirPods", "salePrice": 29.0, "inStoreAvailability": true},
                {"sku": 1001, "name": "AirPods Pro", "salePrice": 199.0}
            ],
            "totalPages": 12
        })
        .to_string()
    }

    fn store_page() -> String {
        serde_json::json!({
            "stores": [
                {"storeId": 1, "name": "Far", "distance": 4.2, "products": [
                    {"sku": 1001, "name": "AirPods Pro", "salePrice": 199.0, "regularPrice": 249.0, "inStoreAvailability": true},
                    {"sku": 1002, "name": "AirPods Max", "salePrice": 449.0, "regularPrice": 549.0, "inStoreAvailability": false}
                ]},
                {"storeId": 2, "name": "Near", "distance": 1.1, "products": [
                    {"sku": 1001, "name": "AirPods Pro", "salePrice": 199.0, "regularPrice": 249.0, "inStoreAvailability": true}
                ]}
            ]
        })
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_search_keeps_nearest_store() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(200, &search_page())])
                .route(STORES, vec![ScriptedTransport::ok(200, &store_page())]),
        );
        let bestbuy = client(&transport, Some("key"));

        let results = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap();

        assert_eq!(results.page, 1);
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].sku, 1001);
        assert_eq!(results.products[0].store_distance, Some(1.1));

        // Fewer than PAGE_SIZE candidates per page: all three pages scanned
        assert_eq!(transport.calls_matching(PRODUCT_SEARCH), 3);
        assert_eq!(transport.calls_matching(STORES), 1);

        let store_call = transport
            .calls()
            .into_iter()
            .find(|c| c.url.contains(STORES))
            .unwrap();
        assert!(store_call.url.contains("sku%20in(1001,1002)"));
        assert!(store_call.url.contains("area(10001,5)"));
        assert!(!store_call.url.contains("2000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_candidate_pages_follow_requested_page() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(200, &search_page())])
                .route(STORES, vec![ScriptedTransport::ok(200, &store_page())]),
        );
        let bestbuy = client(&transport, Some("key"));
        let request = SearchRequest::new("AirPods", Some(PostalCode::parse("10001").unwrap()), 2).unwrap();

        let results = bestbuy.search_products(&request).await.unwrap();
        assert_eq!(results.page, 2);

        let pages: Vec<String> = transport
            .calls()
            .into_iter()
            .filter(|c| c.url.contains(PRODUCT_SEARCH))
            .map(|c| c.url)
            .collect();
        assert!(pages[0].contains("&page=4&"));
        assert!(pages[2].contains("&page=6&"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_request_is_served_from_cache() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(200, &search_page())])
                .route(STORES, vec![ScriptedTransport::ok(200, &store_page())]),
        );
        let bestbuy = client(&transport, Some("key"));

        let first = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap();
        let calls = transport.call_count();

        let second = bestbuy
            .search_products(&request("  airpods ", Some("10001")))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(transport.call_count(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_zip_skips_store_lookup() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(200, &search_page())]),
        );
        let bestbuy = client(&transport, Some("key"));

        let results = bestbuy
            .search_products(&request("AirPods", None))
            .await
            .unwrap();

        assert_eq!(transport.calls_matching(PRODUCT_SEARCH), 1);
        assert_eq!(transport.calls_matching(STORES), 0);
        // Denylisted add-on dropped; duplicates are kept as listed
        assert!(results.products.iter().all(|p| p.sku != 2000));
        assert_eq!(results.products.len(), 3);
        assert!(results.products.iter().all(|p| p.store_distance.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_failure_is_an_error() {
        let transport = Arc::new(
            ScriptedTransport::new().route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(500, "down")]),
        );
        let bestbuy = client(&transport, Some("key"));

        let err = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap_err();
        assert!(matches!(err, RetailerError::UpstreamExhausted { .. }));
        assert_eq!(transport.calls_matching(STORES), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_first_page_is_an_error() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(200, "<html>maintenance</html>")]),
        );
        let bestbuy = client(&transport, Some("key"));

        let err = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap_err();
        assert!(matches!(err, RetailerError::Parse(_)));
        assert_eq!(transport.calls_matching(PRODUCT_SEARCH), 1);
        assert_eq!(transport.calls_matching(STORES), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_later_page_uses_partial_candidates() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(
                    PRODUCT_SEARCH,
                    vec![
                        ScriptedTransport::ok(200, &search_page()),
                        ScriptedTransport::ok(200, "<html>maintenance</html>"),
                    ],
                )
                .route(STORES, vec![ScriptedTransport::ok(200, &store_page())]),
        );
        let bestbuy = client(&transport, Some("key"));

        let results = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap();
        assert_eq!(transport.calls_matching(PRODUCT_SEARCH), 2);
        assert_eq!(results.products.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_page_ends_candidate_scan() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(
                    PRODUCT_SEARCH,
                    vec![
                        ScriptedTransport::ok(200, r#"{"products": [{"sku": 1001, "name": "AirPods Pro", "salePrice": 199.0}]}"#),
                        ScriptedTransport::ok(200, r#"{"products": []}"#),
                    ],
                )
                .route(STORES, vec![ScriptedTransport::ok(200, &store_page())]),
        );
        let bestbuy = client(&transport, Some("key"));

        bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap();
        assert_eq!(transport.calls_matching(PRODUCT_SEARCH), 2);
        assert_eq!(transport.calls_matching(STORES), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_page_failure_uses_partial_candidates() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(
                    PRODUCT_SEARCH,
                    vec![
                        ScriptedTransport::ok(200, &search_page()),
                        ScriptedTransport::ok(400, "bad page"),
                    ],
                )
                .route(STORES, vec![ScriptedTransport::ok(200, &store_page())]),
        );
        let bestbuy = client(&transport, Some("key"));

        let results = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap();
        assert_eq!(transport.calls_matching(PRODUCT_SEARCH), 2);
        assert_eq!(results.products.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_failure_falls_back_per_sku() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(200, &search_page())])
                .route("sku%20in(", vec![ScriptedTransport::ok(400, "query too complex")])
                .route(
                    "products(sku=1001)",
                    vec![ScriptedTransport::ok(200, &store_page())],
                )
                .route("products(sku=1002)", vec![ScriptedTransport::ok(404, "gone")]),
        );
        let bestbuy = client(&transport, Some("key"));

        let results = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap();

        assert_eq!(transport.calls_matching("products(sku="), 2);
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].store_distance, Some(1.1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_store_lookups_failing_is_an_error() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(200, &search_page())])
                .route(STORES, vec![ScriptedTransport::ok(400, "nope")]),
        );
        let bestbuy = client(&transport, Some("key"));

        let err = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap_err();
        assert!(matches!(err, RetailerError::Upstream { status: 400, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_candidates_returns_empty() {
        let only_addons = serde_json::json!({
            "products": [{"sku": 2000, "name": "AppleCare+", "salePrice": 29.0}]
        })
        .to_string();
        let transport = Arc::new(
            ScriptedTransport::new().route(PRODUCT_SEARCH, vec![ScriptedTransport::ok(200, &only_addons)]),
        );
        let bestbuy = client(&transport, Some("key"));

        let results = bestbuy
            .search_products(&request("applecare", Some("10001")))
            .await
            .unwrap();
        assert!(results.products.is_empty());
        assert_eq!(transport.calls_matching(STORES), 0);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let bestbuy = client(&transport, None);

        let err = bestbuy
            .search_products(&request("AirPods", Some("10001")))
            .await
            .unwrap_err();
        assert!(matches!(err, RetailerError::Configuration("BESTBUY_API_KEY")));
        assert_eq!(transport.call_count(), 0);
    }

    fn record(sku: u64, distance: Option<f64>) -> BestBuyProduct {
        BestBuyProduct {
            sku,
            name: format!("sku {sku}"),
            regular_price: Some(dec!(10)),
            sale_price: Some(dec!(8)),
            image: None,
            in_store_availability: true,
            online_availability: None,
            store_distance: distance,
            url: None,
        }
    }

    #[test]
    fn test_dedup_prefers_known_then_nearest() {
        let kept = dedup_nearest([
            record(1, None),
            record(2, Some(3.0)),
            record(1, Some(5.0)),
            record(2, Some(1.0)),
            record(1, Some(2.0)),
            record(2, None),
            record(1, Some(2.0)),
        ]);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].sku, 1);
        assert_eq!(kept[0].store_distance, Some(2.0));
        assert_eq!(kept[1].sku, 2);
        assert_eq!(kept[1].store_distance, Some(1.0));
    }

    #[test]
    fn test_normalize() {
        let product = normalize(&record(42, Some(1.5))).unwrap();
        assert_eq!(product.id.as_str(), "bestbuy-42");
        assert_eq!(product.price, dec!(8));
        assert_eq!(product.stock_status, StockStatus::InStock);
        assert_eq!(product.store_available, Some(true));

        let online_only = BestBuyProduct {
            in_store_availability: false,
            online_availability: Some(true),
            ..record(43, None)
        };
        assert_eq!(normalize(&online_only).unwrap().stock_status, StockStatus::OnlineOnly);

        let unpriced = BestBuyProduct {
            regular_price: None,
            sale_price: None,
            ..record(44, None)
        };
        assert!(normalize(&unpriced).is_none());
    }

    #[test]
    fn test_denylist_is_case_insensitive() {
        assert!(is_denylisted(Some("AppleCare+ for iPhone")));
        assert!(is_denylisted(Some("Apple Care Protection")));
        assert!(!is_denylisted(Some("Apple AirPods")));
        assert!(!is_denylisted(None));
    }
}
