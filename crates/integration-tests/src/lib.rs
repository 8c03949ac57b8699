//! Integration tests for LocalStock.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p localstock-integration-tests
//! ```
//!
//! The service runs in-process: requests go through the real router and
//! retailer adapters, and only the outbound HTTP exchange is replaced by
//! [`MockTransport`]. Tests marked `#[ignore]` talk to the live retailer
//! APIs and need credentials in the environment.
//!
//! # Test Categories
//!
//! - `search_api` - Unified and per-retailer search endpoints
//! - `redirect` - Affiliate redirect
//! - `health` - Liveness and readiness

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use localstock_storefront::config::StorefrontConfig;
use localstock_storefront::retailers::transport::{OutboundRequest, TransportResponse};
use localstock_storefront::retailers::{HttpTransport, KvStore, MemoryStore, TransportError};
use localstock_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

/// Best Buy API root used by [`test_config`].
pub const BESTBUY_BASE: &str = "https://bestbuy.test/v1";

/// Walmart API root used by [`test_config`].
pub const WALMART_BASE: &str = "https://walmart.test/affil";

/// PKCS#8 key shared with the storefront unit tests.
pub const TEST_SIGNING_KEY: &str = include_str!("../../storefront/tests/fixtures/test_signing_key.pem");

// =============================================================================
// Mock Transport
// =============================================================================

/// Canned reply for one URL fragment.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    Unreachable,
}

impl Reply {
    /// 200 with a JSON body.
    #[must_use]
    pub fn json(body: &Value) -> Self {
        Self::Status(200, body.to_string())
    }
}

/// Outbound transport that answers by URL fragment and counts calls.
///
/// The first route whose fragment occurs in the request URL answers. Unrouted
/// URLs get a 404 so a missing fixture shows up as an upstream error rather
/// than a hang.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<(String, Reply)>>,
    calls: Mutex<Vec<OutboundRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer URLs containing `fragment` with `reply`.
    #[must_use]
    pub fn route(self, fragment: &str, reply: Reply) -> Self {
        lock(&self.routes).push((fragment.to_string(), reply));
        self
    }

    /// Every request seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<OutboundRequest> {
        lock(&self.calls).clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Requests whose URL contains `fragment`.
    #[must_use]
    pub fn calls_matching(&self, fragment: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let reply = lock(&self.routes)
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());
        lock(&self.calls).push(request);

        match reply {
            Some(Reply::Status(status, body)) => Ok(TransportResponse::new(
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body,
            )),
            Some(Reply::Unreachable) => Err(TransportError("connection refused".to_string())),
            None => Ok(TransportResponse::new(StatusCode::NOT_FOUND, "no route")),
        }
    }
}

// =============================================================================
// Test App
// =============================================================================

/// Configuration with both retailers credentialed and pointed at fake hosts.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    let mut config = StorefrontConfig::default();
    config.bestbuy.api_key = Some(SecretString::from("test-bestbuy-key"));
    config.bestbuy.base_url = BESTBUY_BASE.to_string();
    config.walmart.consumer_id = Some("test-consumer".to_string());
    config.walmart.private_key = Some(SecretString::from(TEST_SIGNING_KEY));
    config.walmart.fixed_timestamp = Some("1700000000000".to_string());
    config.walmart.base_url = WALMART_BASE.to_string();
    config
}

/// The service router wired to a mock transport and an in-process store.
pub struct TestApp {
    pub router: Router,
    pub transport: Arc<MockTransport>,
    pub state: AppState,
}

/// A finished response, body parsed as JSON when possible.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    /// Body as JSON, `Value::Null` when it isn't.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

impl TestApp {
    #[must_use]
    pub fn new(transport: MockTransport) -> Self {
        Self::with_config(test_config(), transport)
    }

    #[must_use]
    pub fn with_config(config: StorefrontConfig, transport: MockTransport) -> Self {
        let transport = Arc::new(transport);
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let state = AppState::from_parts(
            config,
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
            store,
        );
        let router = localstock_storefront::app(state.clone(), None);
        Self {
            router,
            transport,
            state,
        }
    }

    /// Send a GET through the router.
    ///
    /// # Panics
    ///
    /// Panics if the URI is invalid or the body cannot be read.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        TestResponse {
            status,
            headers,
            text: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
