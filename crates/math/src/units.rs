//! Decimal-string conversions between human amounts and native base units.
//!
//! These parse and format without ever passing through floating point, so a
//! value survives the round trip bit-for-bit for any supported decimals.

use alloy::primitives::U256;

use crate::{mul_div, pow10, MathError, Result, RAY};

/// Parses a decimal string (`"12.5"`) into base units for a token with the
/// given number of decimals.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(MathError::InvalidAmount(amount.to_string()));
    }

    let (integer, fraction) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return Err(MathError::InvalidAmount(amount.to_string()));
    }
    if !integer.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(MathError::InvalidAmount(amount.to_string()));
    }
    if fraction.len() > decimals as usize {
        return Err(MathError::TooManyDecimals { max: decimals });
    }

    let scale = pow10(decimals as u32)?;
    let integer_part = parse_digits(integer)?
        .checked_mul(scale)
        .ok_or(MathError::Overflow)?;

    let fraction_part = if fraction.is_empty() {
        U256::ZERO
    } else {
        let padding = pow10((decimals as usize - fraction.len()) as u32)?;
        parse_digits(fraction)?
            .checked_mul(padding)
            .ok_or(MathError::Overflow)?
    };

    integer_part
        .checked_add(fraction_part)
        .ok_or(MathError::Overflow)
}

/// Formats base units as a decimal string, trimming trailing zeros.
pub fn from_base_units(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    // 10^decimals fits easily for any u8 a token would declare.
    let scale = pow10(decimals as u32).expect("decimal scale fits in U256");
    let integer = value / scale;
    let fraction = value % scale;
    if fraction.is_zero() {
        return integer.to_string();
    }
    let mut fraction = fraction.to_string();
    while fraction.len() < decimals as usize {
        fraction.insert(0, '0');
    }
    format!("{integer}.{}", fraction.trim_end_matches('0'))
}

/// Formats a RAY-scaled annual rate as a percentage with two decimals,
/// e.g. `"4.20%"`.
pub fn format_ray_percent(rate: U256) -> String {
    let basis_points = mul_div(rate, U256::from(10_000u64), RAY).unwrap_or(U256::ZERO);
    let bps: u128 = basis_points.try_into().unwrap_or(u128::MAX);
    format!("{}.{:02}%", bps / 100, bps % 100)
}

fn parse_digits(digits: &str) -> Result<U256> {
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).map_err(|_| MathError::InvalidAmount(digits.to_string()))
}
