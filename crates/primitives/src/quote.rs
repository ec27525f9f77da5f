//! Oracle price quotes in Pyth wire shape.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Exponents outside this band indicate a corrupt feed rather than a real
/// asset price.
const EXPONENT_RANGE: core::ops::RangeInclusive<i32> = -30..=12;

/// A single price observation: integer mantissa, confidence band in the same
/// exponent, and the publish time that drives staleness decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub id: B256,
    /// Price mantissa; `price * 10^expo` is the mid value.
    pub price: i64,
    /// Confidence mantissa, same exponent as `price`.
    pub conf: u64,
    /// Power-of-ten scale, typically negative.
    pub expo: i32,
    /// Seconds timestamp the feed published this observation.
    pub publish_time: u64,
}

impl PriceQuote {
    /// Validates raw feed data at the parse boundary. Negative prices and
    /// out-of-range exponents are malformed input, not market data.
    pub fn validated(self) -> Result<Self, ParseError> {
        if self.price < 0 {
            return Err(ParseError::NegativePrice(self.id));
        }
        if !EXPONENT_RANGE.contains(&self.expo) {
            return Err(ParseError::ExponentOutOfRange(self.id, self.expo));
        }
        Ok(self)
    }

    /// Age of the quote at `now`, saturating at zero for clock skew.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.publish_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> PriceQuote {
        PriceQuote {
            id: B256::repeat_byte(7),
            price: 6_245_000_000,
            conf: 3_100_000,
            expo: -8,
            publish_time: 1_700_000_000,
        }
    }

    #[test]
    fn accepts_sane_quotes() {
        assert!(quote().validated().is_ok());
    }

    #[test]
    fn rejects_negative_prices() {
        let q = PriceQuote { price: -1, ..quote() };
        assert_eq!(q.validated(), Err(ParseError::NegativePrice(q.id)));
    }

    #[test]
    fn rejects_wild_exponents() {
        let q = PriceQuote { expo: -31, ..quote() };
        assert!(matches!(q.validated(), Err(ParseError::ExponentOutOfRange(_, -31))));
    }

    #[test]
    fn age_saturates_on_clock_skew() {
        let q = quote();
        assert_eq!(q.age(q.publish_time - 5), 0);
        assert_eq!(q.age(q.publish_time + 5), 5);
    }
}
