//! Crossing detection
//!
//! A limit taker stops walking the contra book at the first level its own
//! limit cannot accept. The boundary is inclusive: a book price equal to
//! the taker's limit is acceptable.

use types::numeric::Price;
use types::order::Side;

/// Can a taker with this limit trade at the given book price?
pub fn limit_crosses(taker_side: Side, limit: Price, book_price: Price) -> bool {
    match taker_side {
        Side::Buy => book_price <= limit,
        Side::Sell => book_price >= limit,
    }
}

/// Price acceptability for any taker
///
/// `limit == None` is a market-style taker, which accepts every price.
pub fn accepts(taker_side: Side, limit: Option<Price>, book_price: Price) -> bool {
    match limit {
        Some(limit) => limit_crosses(taker_side, limit, book_price),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_accepts_at_or_below_limit() {
        let limit = Price::from_u64(100);
        assert!(limit_crosses(Side::Buy, limit, Price::from_u64(99)));
        assert!(limit_crosses(Side::Buy, limit, Price::from_u64(100)));
        assert!(!limit_crosses(Side::Buy, limit, Price::from_u64(101)));
    }

    #[test]
    fn test_sell_accepts_at_or_above_limit() {
        let limit = Price::from_u64(100);
        assert!(limit_crosses(Side::Sell, limit, Price::from_u64(101)));
        assert!(limit_crosses(Side::Sell, limit, Price::from_u64(100)));
        assert!(!limit_crosses(Side::Sell, limit, Price::from_u64(99)));
    }

    #[test]
    fn test_market_taker_accepts_everything() {
        assert!(accepts(Side::Buy, None, Price::from_u64(1)));
        assert!(accepts(Side::Sell, None, Price::from_u64(u64::MAX / 2)));
    }
}
