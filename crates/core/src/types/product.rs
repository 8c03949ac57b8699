//! Unified product model.
//!
//! Every retailer adapter normalizes its native records into [`Product`]
//! so that results from different providers can be merged and sorted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::status::{Source, StockStatus};

/// A single retailer listing in the unified schema.
///
/// ## Invariants
///
/// - `price` is never negative
/// - `id` is unique across retailers (see [`ProductId`])
/// - `store_distance`, when present, is a non-negative number of miles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub source: Source,
    pub name: String,
    /// Lower of sale and regular price.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    pub stock_status: StockStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// External purchase link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
    /// Distance to the nearest store carrying the item, in miles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_available: Option<bool>,
}

impl Product {
    /// Clamp an upstream distance to the non-negative, finite range.
    #[must_use]
    pub fn sanitize_distance(distance: Option<f64>) -> Option<f64> {
        distance.filter(|d| d.is_finite() && *d >= 0.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Product {
        Product {
            id: ProductId::new(Source::BestBuy, 6_447_382),
            source: Source::BestBuy,
            name: "AirPods Pro".to_string(),
            price: dec!(199.99),
            stock_status: StockStatus::InStock,
            image_url: None,
            product_url: Some("https://www.bestbuy.com/site/6447382.p".to_string()),
            store_distance: Some(1.8),
            store_available: Some(true),
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], "bestbuy-6447382");
        assert_eq!(json["source"], "bestbuy");
        assert_eq!(json["price"], "199.99");
        assert_eq!(json["stockStatus"], "IN_STOCK");
        assert_eq!(json["storeDistance"], 1.8);
        assert!(json.get("imageUrl").is_none());
    }

    #[test]
    fn test_sanitize_distance() {
        assert_eq!(Product::sanitize_distance(Some(2.5)), Some(2.5));
        assert_eq!(Product::sanitize_distance(Some(-1.0)), None);
        assert_eq!(Product::sanitize_distance(Some(f64::NAN)), None);
        assert_eq!(Product::sanitize_distance(None), None);
    }
}
