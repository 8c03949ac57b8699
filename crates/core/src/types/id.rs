//! Provider-prefixed product identifiers.
//!
//! Native ids are only unique within one retailer. Prefixing them with the
//! retailer identifier makes a [`ProductId`] globally unique by construction.

use serde::{Deserialize, Serialize};

use super::status::Source;

/// Globally unique product identifier of the form `<retailer>-<native id>`.
///
/// ```
/// # use localstock_core::{ProductId, Source};
/// let id = ProductId::new(Source::BestBuy, "6447382");
/// assert_eq!(id.as_str(), "bestbuy-6447382");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Build an id from a retailer and its native identifier.
    #[must_use]
    pub fn new(source: Source, native_id: impl std::fmt::Display) -> Self {
        Self(format!("{}-{native_id}", source.as_str()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the retailer-native part of the id.
    #[must_use]
    pub fn native_id(&self) -> &str {
        self.0.split_once('-').map_or("", |(_, native)| native)
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_differ_across_retailers() {
        let a = ProductId::new(Source::BestBuy, 42);
        let b = ProductId::new(Source::Walmart, 42);
        assert_ne!(a, b);
        assert_eq!(a.native_id(), "42");
        assert_eq!(b.native_id(), "42");
    }

    #[test]
    fn test_native_id_keeps_dashes() {
        let id = ProductId::new(Source::Walmart, "abc-123");
        assert_eq!(id.native_id(), "abc-123");
    }
}
