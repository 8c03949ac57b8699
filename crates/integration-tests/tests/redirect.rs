//! Integration tests for the affiliate redirect.

#![allow(clippy::unwrap_used)]

use axum::http::{StatusCode, header};
use localstock_integration_tests::{MockTransport, TestApp};

#[tokio::test]
async fn test_redirects_to_encoded_https_target() {
    let app = TestApp::new(MockTransport::new());

    for path in ["/affiliate/redirect", "/api/affiliate/redirect"] {
        let response = app.get(&format!("{path}?target=https%3A%2F%2Fexample.com")).await;
        assert_eq!(response.status, StatusCode::FOUND, "{path}");
        assert_eq!(response.headers[header::LOCATION], "https://example.com/");
    }
}

#[tokio::test]
async fn test_double_encoded_target_is_decoded() {
    let app = TestApp::new(MockTransport::new());

    let response = app
        .get("/affiliate/redirect?target=https%253A%252F%252Fwww.walmart.com%252Fip%252F111")
        .await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.headers[header::LOCATION], "https://www.walmart.com/ip/111");
}

#[tokio::test]
async fn test_target_escapes_survive_the_redirect() {
    let app = TestApp::new(MockTransport::new());

    let cases = [
        ("https%3A%2F%2Fexample.com%2F%3Fq%3D100%2525", "https://example.com/?q=100%25"),
        ("https%3A%2F%2Fexample.com%2Fa%252Fb", "https://example.com/a%2Fb"),
        ("https%3A%2F%2Fexample.com%2Fcaf%C3%A9", "https://example.com/caf%C3%A9"),
    ];
    for (target, expected) in cases {
        let response = app.get(&format!("/affiliate/redirect?target={target}")).await;
        assert_eq!(response.status, StatusCode::FOUND, "{target}");
        assert_eq!(response.headers[header::LOCATION], expected);
    }
}

#[tokio::test]
async fn test_rejects_non_http_targets() {
    let app = TestApp::new(MockTransport::new());

    for target in ["javascript:alert(1)", "ftp%3A%2F%2Fexample.com", "%2F%2Fevil.example", ""] {
        let response = app.get(&format!("/affiliate/redirect?target={target}")).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{target}");
        assert!(response.headers.get(header::LOCATION).is_none());
        assert!(response.json()["error"].is_string());
    }

    let response = app.get("/affiliate/redirect").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
