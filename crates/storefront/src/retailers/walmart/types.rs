//! Walmart affiliate API shapes.
//!
//! Items are kept close to what the API returns: known fields are typed,
//! everything else rides along in `extra` so `/api/walmart/search` can pass
//! it through.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `GET /product/v2/search` response.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<WalmartItem>,
}

/// Walmart item ids arrive as numbers or strings depending on endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Result of the per-item store lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreOffers {
    /// The lookup produced nothing usable for this item.
    Unavailable {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    /// Stores or offers as returned by the lookup endpoint.
    Found(Value),
}

impl StoreOffers {
    pub const NOT_AUTHORIZED: &'static str =
        "Not authorized for product lookup (affiliate permissions required)";
    pub const NO_DATA: &'static str = "No lookup data available";

    #[must_use]
    pub fn not_authorized(details: String) -> Self {
        Self::Unavailable {
            error: Self::NOT_AUTHORIZED.to_string(),
            details: Some(details),
        }
    }

    #[must_use]
    pub fn no_data() -> Self {
        Self::Unavailable {
            error: Self::NO_DATA.to_string(),
            details: None,
        }
    }

    /// Pull `stores`, else `offers`, else the whole payload.
    #[must_use]
    pub fn from_lookup(data: Value) -> Self {
        if data.is_null() {
            return Self::no_data();
        }
        let picked = ["stores", "offers"]
            .iter()
            .find_map(|field| data.get(field).filter(|v| !v.is_null()).cloned());
        Self::Found(picked.unwrap_or(data))
    }
}

/// One Walmart item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalmartItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub sale_price: Option<Decimal>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub msrp: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
    /// "Available", "Limited Supply", "Not available", ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_online: Option<bool>,
    /// Best-effort purchase link, set by the adapter.
    #[serde(default)]
    pub affiliate_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_offers: Option<StoreOffers>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WalmartItem {
    fn extra_str(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Native id, from `itemId` or the older `item_id`/`id`/`sku` spellings.
    #[must_use]
    pub fn native_id(&self) -> Option<String> {
        self.item_id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| ["item_id", "id", "sku"].iter().find_map(|k| self.extra_str(k)))
    }

    /// Purchase link from whichever URL field is populated.
    #[must_use]
    pub fn purchase_url(&self) -> Option<String> {
        self.product_url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| self.extra_str("product_url"))
            .or_else(|| self.extra_str("detailUrl"))
    }

    /// Largest available image.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.large_image
            .as_deref()
            .or(self.medium_image.as_deref())
            .or(self.thumbnail_image.as_deref())
    }
}

/// Adapter result for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalmartResults {
    pub items: Vec<WalmartItem>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_item_parses_and_keeps_unknown_fields() {
        let item: WalmartItem = serde_json::from_value(json!({
            "itemId": 123456,
            "name": "AirPods Pro",
            "salePrice": 189.0,
            "msrp": 249,
            "upc": "190199246850",
            "productUrl": "https://www.walmart.com/ip/123456",
            "stock": "Available",
            "availableOnline": true
        }))
        .unwrap();

        assert_eq!(item.native_id().as_deref(), Some("123456"));
        assert_eq!(item.sale_price, Some(dec!(189)));
        assert_eq!(item.msrp, Some(dec!(249)));
        assert_eq!(item.extra.get("upc"), Some(&json!("190199246850")));

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["upc"], json!("190199246850"));
        assert_eq!(back["itemId"], json!(123456));
    }

    #[test]
    fn test_id_and_url_fallbacks() {
        let item: WalmartItem = serde_json::from_value(json!({
            "item_id": "abc",
            "detailUrl": "https://www.walmart.com/ip/abc"
        }))
        .unwrap();
        assert_eq!(item.native_id().as_deref(), Some("abc"));
        assert_eq!(
            item.purchase_url().as_deref(),
            Some("https://www.walmart.com/ip/abc")
        );

        let bare: WalmartItem = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(bare.native_id(), None);
        assert_eq!(bare.purchase_url(), None);
    }

    #[test]
    fn test_store_offers_prefers_stores_then_offers() {
        assert_eq!(
            StoreOffers::from_lookup(json!({"stores": [1], "offers": [2]})),
            StoreOffers::Found(json!([1]))
        );
        assert_eq!(
            StoreOffers::from_lookup(json!({"stores": null, "offers": [2]})),
            StoreOffers::Found(json!([2]))
        );
        assert_eq!(
            StoreOffers::from_lookup(json!({"itemId": 1})),
            StoreOffers::Found(json!({"itemId": 1}))
        );
        assert_eq!(StoreOffers::from_lookup(Value::Null), StoreOffers::no_data());
    }

    #[test]
    fn test_unavailable_offers_serialize_as_error_object() {
        let value = serde_json::to_value(StoreOffers::not_authorized("YouAreNotAuthorized".into())).unwrap();
        assert_eq!(
            value,
            json!({"error": StoreOffers::NOT_AUTHORIZED, "details": "YouAreNotAuthorized"})
        );
        assert_eq!(
            serde_json::to_value(StoreOffers::no_data()).unwrap(),
            json!({"error": "No lookup data available"})
        );
    }
}
