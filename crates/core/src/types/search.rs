//! Validated search requests.
//!
//! A [`SearchRequest`] is built per incoming user request and discarded
//! once the response has been produced.

use serde::{Deserialize, Serialize};

use super::postal_code::{PostalCode, PostalCodeError};

/// Errors that can occur when building a [`SearchRequest`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchRequestError {
    /// The query is missing or blank.
    #[error("Query parameter \"q\" is required")]
    MissingQuery,
    /// The postal code is malformed.
    #[error("invalid postal code: {0}")]
    InvalidPostalCode(#[from] PostalCodeError),
}

/// A product search scoped to an optional location and a result page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    query: String,
    postal_code: Option<PostalCode>,
    page: u32,
}

impl SearchRequest {
    /// Default page when none (or an unusable one) is supplied.
    pub const DEFAULT_PAGE: u32 = 1;

    /// Build a request from already-typed parts.
    ///
    /// # Errors
    ///
    /// Returns [`SearchRequestError::MissingQuery`] if the trimmed query is empty.
    pub fn new(
        query: &str,
        postal_code: Option<PostalCode>,
        page: u32,
    ) -> Result<Self, SearchRequestError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchRequestError::MissingQuery);
        }

        Ok(Self {
            query: query.to_owned(),
            postal_code,
            page: page.max(Self::DEFAULT_PAGE),
        })
    }

    /// Build a request from raw query-string values.
    ///
    /// A blank `zip` counts as absent. `page` is parsed leniently: anything
    /// that is not a positive integer falls back to page 1.
    ///
    /// # Errors
    ///
    /// Returns an error if `q` is missing/blank or `zip` is malformed.
    pub fn from_params(
        q: Option<&str>,
        zip: Option<&str>,
        page: Option<&str>,
    ) -> Result<Self, SearchRequestError> {
        let query = q.ok_or(SearchRequestError::MissingQuery)?;
        let postal_code = zip
            .map(str::trim)
            .filter(|z| !z.is_empty())
            .map(PostalCode::parse)
            .transpose()?;

        Self::new(query, postal_code, parse_page(page))
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub const fn postal_code(&self) -> Option<&PostalCode> {
        self.postal_code.as_ref()
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Query text folded for cache keys: lowercased, inner whitespace collapsed.
    #[must_use]
    pub fn normalized_query(&self) -> String {
        self.query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(SearchRequest::DEFAULT_PAGE)
}
