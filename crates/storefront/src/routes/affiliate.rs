//! Outbound purchase-link redirect.

use axum::{
    extract::Query,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::error::{AppError, Result};

/// Redirect query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectParams {
    pub target: Option<String>,
}

/// Absolute `http(s)` URL with a host.
fn parse_http(candidate: &str) -> Option<Url> {
    let parsed = Url::parse(candidate).ok()?;
    let allowed = matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some();
    allowed.then_some(parsed)
}

/// Vet a redirect target, returning its serialized form.
///
/// A value that is already an absolute `http(s)` URL is used as-is, escapes
/// included. Otherwise it may have been percent-encoded a second time by the
/// client, and is decoded once more before parsing.
fn vet_target(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    parse_http(raw).or_else(|| {
        let decoded = urlencoding::decode(raw).ok()?;
        parse_http(&decoded)
    })
}

/// `GET /affiliate/redirect?target=<url>` → 302 to `target`.
#[instrument(skip(params))]
pub async fn redirect(Query(params): Query<RedirectParams>) -> Result<Response> {
    let raw = params
        .target
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Query parameter \"target\" is required".into()))?;

    let Some(target) = vet_target(&raw) else {
        tracing::warn!(redirect_target = %raw, "rejected redirect target");
        return Err(AppError::BadRequest("Invalid redirect target".into()));
    };
    let location = HeaderValue::from_str(target.as_str())
        .map_err(|_| AppError::BadRequest("Invalid redirect target".into()))?;

    tracing::debug!(redirect_target = %target, "affiliate redirect");
    Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}
