//! Best Buy API response shapes and the adapter's output record.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `GET /products(...)` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchResponse {
    #[serde(default)]
    pub products: Vec<ProductHit>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// A product as returned by product search and inside store results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductHit {
    #[serde(default)]
    pub sku: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub regular_price: Option<Decimal>,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub add_to_cart_url: Option<String>,
    #[serde(default)]
    pub in_store_availability: Option<bool>,
    #[serde(default)]
    pub online_availability: Option<bool>,
}

/// `GET /stores(...)+products(...)` response.
#[derive(Debug, Deserialize)]
pub struct StoreSearchResponse {
    #[serde(default)]
    pub stores: Vec<StoreHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreHit {
    #[serde(default)]
    pub store_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    /// Miles from the searched postal code.
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub products: Vec<ProductHit>,
}

/// One Best Buy product, as the adapter returns it.
///
/// With a postal code, `store_distance` is the nearest store that has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestBuyProduct {
    pub sku: u64,
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub regular_price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub image: Option<String>,
    pub in_store_availability: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_availability: Option<bool>,
    #[serde(default)]
    pub store_distance: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl BestBuyProduct {
    /// Build from a product-search hit (no store context).
    #[must_use]
    pub fn from_search_hit(hit: &ProductHit) -> Option<Self> {
        Some(Self {
            sku: hit.sku?,
            name: hit.name.clone().unwrap_or_default(),
            regular_price: hit.regular_price,
            sale_price: hit.sale_price.or(hit.regular_price),
            image: hit.image.clone(),
            in_store_availability: hit.in_store_availability.unwrap_or(false),
            online_availability: hit.online_availability,
            store_distance: None,
            url: hit.url.clone().or_else(|| hit.add_to_cart_url.clone()),
        })
    }

    /// Build from a product seen at a store. Items the store doesn't stock
    /// are skipped.
    #[must_use]
    pub fn from_store_hit(hit: &ProductHit, distance: Option<f64>) -> Option<Self> {
        if hit.in_store_availability != Some(true) {
            return None;
        }
        let mut product = Self::from_search_hit(hit)?;
        product.store_distance = distance.filter(|d| d.is_finite() && *d >= 0.0);
        Some(product)
    }
}

/// Adapter result for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestBuyResults {
    pub products: Vec<BestBuyProduct>,
    pub page: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_store_response_parses() {
        let body = r#"{
            "stores": [{
                "storeId": 1234,
                "name": "Union Square",
                "distance": 1.4,
                "products": [{
                    "sku": 6447382,
                    "name": "AirPods Pro",
                    "regularPrice": 249.99,
                    "salePrice": 199,
                    "image": "https://img/1.jpg",
                    "inStoreAvailability": true
                }]
            }]
        }"#;

        let parsed: StoreSearchResponse = serde_json::from_str(body).unwrap();
        let store = &parsed.stores[0];
        assert_eq!(store.distance, Some(1.4));
        let hit = &store.products[0];
        assert_eq!(hit.sale_price, Some(dec!(199)));
        assert_eq!(hit.regular_price, Some(dec!(249.99)));
    }

    #[test]
    fn test_sale_price_falls_back_to_regular() {
        let hit = ProductHit {
            sku: Some(1),
            name: Some("Cable".into()),
            regular_price: Some(dec!(19.99)),
            sale_price: None,
            image: None,
            url: None,
            add_to_cart_url: Some("https://cart/1".into()),
            in_store_availability: Some(true),
            online_availability: None,
        };
        let product = BestBuyProduct::from_store_hit(&hit, Some(2.0)).unwrap();
        assert_eq!(product.sale_price, Some(dec!(19.99)));
        assert_eq!(product.url.as_deref(), Some("https://cart/1"));
        assert_eq!(product.store_distance, Some(2.0));
    }

    #[test]
    fn test_store_hit_requires_in_store_availability() {
        let hit = ProductHit {
            sku: Some(1),
            name: None,
            regular_price: None,
            sale_price: None,
            image: None,
            url: None,
            add_to_cart_url: None,
            in_store_availability: Some(false),
            online_availability: Some(true),
        };
        assert!(BestBuyProduct::from_store_hit(&hit, Some(1.0)).is_none());
        assert!(BestBuyProduct::from_search_hit(&hit).is_some());
    }

    #[test]
    fn test_product_serializes_prices_as_numbers() {
        let product = BestBuyProduct {
            sku: 1,
            name: "TV".into(),
            regular_price: Some(dec!(499.99)),
            sale_price: Some(dec!(449.99)),
            image: None,
            in_store_availability: true,
            online_availability: None,
            store_distance: Some(3.5),
            url: None,
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["salePrice"], serde_json::json!(449.99));
        assert_eq!(json["storeDistance"], serde_json::json!(3.5));
        assert_eq!(json["inStoreAvailability"], serde_json::json!(true));

        let back: BestBuyProduct = serde_json::from_value(json).unwrap();
        assert_eq!(back, product);
    }
}
