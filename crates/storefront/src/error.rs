//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Errors render as JSON: `{ "error": "...", "details": "..." }`, with
//! `details` omitted when there is nothing safe to add.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use localstock_core::SearchRequestError;
use serde::Serialize;
use thiserror::Error;

use crate::retailers::RetailerError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Retailer call failed.
    #[error("Retailer error: {0}")]
    Retailer(#[from] RetailerError),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SearchRequestError> for AppError {
    fn from(err: SearchRequestError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Retailer(err) => err
                .upstream_status()
                .and_then(|status| StatusCode::from_u16(status).ok())
                .filter(|status| status.is_client_error() || status.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            Self::BadRequest(message) => ErrorBody {
                error: message.clone(),
                details: None,
            },
            // Don't expose which credential is missing to clients
            Self::Retailer(RetailerError::Configuration(_)) => ErrorBody {
                error: "Retailer API credentials are not configured".to_string(),
                details: None,
            },
            Self::Retailer(RetailerError::Upstream { status, body }) => ErrorBody {
                error: format!("Upstream API responded with status {status}"),
                details: Some(body.clone()),
            },
            Self::Retailer(err) => ErrorBody {
                error: "Failed to fetch data from upstream API".to_string(),
                details: Some(err.to_string()),
            },
            Self::Internal(_) => ErrorBody {
                error: "Internal server error".to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("search", "Unified search", Some(&[("query", "airpods")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
