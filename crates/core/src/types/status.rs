//! Status enums and retailer identifiers.

use serde::{Deserialize, Serialize};

/// Retailer a product listing was sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Big-box electronics retailer (API-key authenticated).
    BestBuy,
    /// General-merchandise retailer (signed-header authenticated).
    Walmart,
}

impl Source {
    /// Short identifier used for product id prefixes, cache namespaces and
    /// rate-limiter buckets.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BestBuy => "bestbuy",
            Self::Walmart => "walmart",
        }
    }

    /// Human-readable retailer name for diagnostics.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::BestBuy => "Best Buy",
            Self::Walmart => "Walmart",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bestbuy" => Ok(Self::BestBuy),
            "walmart" => Ok(Self::Walmart),
            _ => Err(format!("invalid retailer: {s}")),
        }
    }
}

/// Best-effort stock status of a listing.
///
/// Retailer data may be stale; this is never an inventory guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    LowStock,
    #[default]
    Unavailable,
    OnlineOnly,
}

impl StockStatus {
    /// Label shown next to a listing (e.g. "IN STOCK").
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InStock => "IN STOCK",
            Self::LowStock => "LOW STOCK",
            Self::Unavailable => "UNAVAILABLE",
            Self::OnlineOnly => "ONLINE ONLY",
        }
    }
}
