//! Integration tests for health checks and request ids.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use localstock_integration_tests::{MockTransport, TestApp};

#[tokio::test]
async fn test_liveness() {
    let app = TestApp::new(MockTransport::new());

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "ok");
}

#[tokio::test]
async fn test_readiness_with_in_process_store() {
    let app = TestApp::new(MockTransport::new());

    let response = app.get("/health/ready").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.state.store().kind(), "memory");
}

#[tokio::test]
async fn test_every_response_carries_a_request_id() {
    let app = TestApp::new(MockTransport::new());

    for uri in ["/health", "/api/search", "/affiliate/redirect?target=javascript:alert(1)"] {
        let response = app.get(uri).await;
        let id = response.headers.get("x-request-id").unwrap().to_str().unwrap();
        assert!(!id.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new(MockTransport::new());
    assert_eq!(app.get("/products").await.status, StatusCode::NOT_FOUND);
}
