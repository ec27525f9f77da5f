//! Conservative price bounds from noisy quotes.
//!
//! The confidence band biases every valuation against the user: assets they
//! own are valued at the low bound, assets they owe at the high bound, so
//! price uncertainty can only understate borrow capacity.

use alloy::primitives::U256;
use meridian_math::{pow10, MathError};
use meridian_primitives::PriceQuote;

use crate::OracleError;

/// High/low price bounds as mantissas sharing the quote's exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBounds {
    pub low: U256,
    pub high: U256,
    pub expo: i32,
}

/// Derives bounds from a quote, refusing quotes older than `max_age_secs`.
///
/// Staleness is fatal for capacity decisions: callers must fetch a fresh
/// quote rather than retry with the same data.
pub fn resolve_bounds(
    quote: &PriceQuote,
    now: u64,
    max_age_secs: u64,
) -> Result<PriceBounds, OracleError> {
    let age_secs = quote.age(now);
    if age_secs > max_age_secs {
        return Err(OracleError::StalePrice {
            id: quote.id,
            age_secs,
            max_age_secs,
        });
    }

    let quote = quote.validated()?;
    let mid = quote.price as u64;
    let low = U256::from(mid.saturating_sub(quote.conf));
    let high = U256::from(mid as u128 + quote.conf as u128);

    Ok(PriceBounds {
        low,
        high,
        expo: quote.expo,
    })
}

impl PriceBounds {
    /// Values `amount` (native base units of a token with `decimals`) at the
    /// low bound, in WAD-scaled USD.
    pub fn value_at_low(&self, amount: U256, decimals: u8) -> Result<U256, MathError> {
        value_in_usd_wad(self.low, self.expo, amount, decimals)
    }

    /// Values `amount` at the high bound, in WAD-scaled USD.
    pub fn value_at_high(&self, amount: U256, decimals: u8) -> Result<U256, MathError> {
        value_in_usd_wad(self.high, self.expo, amount, decimals)
    }

    /// Converts a WAD-scaled USD value into token base units at the high
    /// bound — the conservative direction for sizing a borrow.
    pub fn units_at_high(&self, usd_wad: U256, decimals: u8) -> Result<U256, MathError> {
        units_for_usd_wad(self.high, self.expo, usd_wad, decimals)
    }
}

/// `amount * mantissa * 10^expo`, rescaled from token decimals to WAD USD.
fn value_in_usd_wad(mantissa: U256, expo: i32, amount: U256, decimals: u8) -> Result<U256, MathError> {
    let scale = 18 + expo as i64;
    // Split the power of ten between numerator and denominator so the
    // product is computed before any division.
    let (num_exp, den_exp) = if scale >= 0 {
        (scale as u32, 0u32)
    } else {
        (0u32, (-scale) as u32)
    };
    let numerator = amount
        .checked_mul(mantissa)
        .and_then(|v| v.checked_mul(pow10(num_exp).ok()?))
        .ok_or(MathError::Overflow)?;
    let denominator = pow10(decimals as u32)?
        .checked_mul(pow10(den_exp)?)
        .ok_or(MathError::Overflow)?;
    Ok(numerator / denominator)
}

/// Inverse of [`value_in_usd_wad`]: how many base units a WAD USD value buys
/// at the given mantissa.
fn units_for_usd_wad(mantissa: U256, expo: i32, usd_wad: U256, decimals: u8) -> Result<U256, MathError> {
    if mantissa.is_zero() {
        return Err(MathError::DivideByZero);
    }
    let scale = 18 + expo as i64;
    let (den_exp, num_exp) = if scale >= 0 {
        (scale as u32, 0u32)
    } else {
        (0u32, (-scale) as u32)
    };
    let numerator = usd_wad
        .checked_mul(pow10(decimals as u32)?)
        .and_then(|v| v.checked_mul(pow10(num_exp).ok()?))
        .ok_or(MathError::Overflow)?;
    let denominator = mantissa
        .checked_mul(pow10(den_exp)?)
        .ok_or(MathError::Overflow)?;
    Ok(numerator / denominator)
}
