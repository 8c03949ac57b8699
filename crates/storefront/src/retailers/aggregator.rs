//! Unified search across every configured retailer.
//!
//! All retailers are queried at once and the aggregator waits for every one
//! of them to settle. Successes are normalized, concatenated in retailer
//! order and sorted by price, highest first. Equal prices keep arrival order.
//! A failed retailer contributes one diagnostic line and no products.

use std::sync::Arc;

use futures::future::join_all;
use localstock_core::{Product, SearchRequest};
use serde::Serialize;
use tracing::instrument;

use super::Retailer;

/// Merged results plus one line per failed retailer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedResults {
    pub products: Vec<Product>,
    pub errors: Vec<String>,
}

/// Fans a search out to all retailers.
#[derive(Clone)]
pub struct Aggregator {
    retailers: Vec<Arc<dyn Retailer>>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.retailers.iter().map(|r| r.source()))
            .finish()
    }
}

impl Aggregator {
    /// Retailers are queried, and ties broken, in this order.
    #[must_use]
    pub fn new(retailers: Vec<Arc<dyn Retailer>>) -> Self {
        Self { retailers }
    }

    /// Search every retailer. Never fails as a whole.
    #[instrument(skip(self, request), fields(query = %request.query()))]
    pub async fn search(&self, request: &SearchRequest) -> AggregatedResults {
        let outcomes = join_all(self.retailers.iter().map(|retailer| async move {
            (retailer.source(), retailer.search(request).await)
        }))
        .await;

        let mut results = AggregatedResults::default();
        for (source, outcome) in outcomes {
            match outcome {
                Ok(found) => results.products.extend(found.records.normalize()),
                Err(e) => {
                    tracing::warn!(retailer = %source, error = %e, "retailer search failed");
                    results
                        .errors
                        .push(format!("{}: {e}", source.display_name()));
                }
            }
        }

        // Stable: equal prices stay in retailer order
        results.products.sort_by(|a, b| b.price.cmp(&a.price));

        tracing::info!(
            products = results.products.len(),
            failed = results.errors.len(),
            "aggregated search complete"
        );
        results
    }
}
