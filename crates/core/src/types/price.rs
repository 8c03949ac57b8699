//! Price selection using decimal arithmetic.

use rust_decimal::Decimal;

/// Pick the price shown for a listing: the lower of sale and regular price.
///
/// Negative amounts are treated as missing. Returns `None` when neither
/// price is usable.
#[must_use]
pub fn effective_price(sale: Option<Decimal>, regular: Option<Decimal>) -> Option<Decimal> {
    let sale = sale.filter(|p| !p.is_sign_negative());
    let regular = regular.filter(|p| !p.is_sign_negative());

    match (sale, regular) {
        (Some(s), Some(r)) => Some(s.min(r)),
        (Some(p), None) | (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_lower_of_sale_and_regular() {
        assert_eq!(
            effective_price(Some(dec!(199.99)), Some(dec!(249.99))),
            Some(dec!(199.99))
        );
        // A "sale" above regular still yields the lower amount
        assert_eq!(
            effective_price(Some(dec!(300)), Some(dec!(250))),
            Some(dec!(250))
        );
    }

    #[test]
    fn test_single_price() {
        assert_eq!(effective_price(None, Some(dec!(10))), Some(dec!(10)));
        assert_eq!(effective_price(Some(dec!(5)), None), Some(dec!(5)));
    }

    #[test]
    fn test_negative_is_ignored() {
        assert_eq!(effective_price(Some(dec!(-1)), Some(dec!(3))), Some(dec!(3)));
        assert_eq!(effective_price(Some(dec!(-1)), None), None);
        assert_eq!(effective_price(None, None), None);
    }
}
