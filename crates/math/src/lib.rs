//! Fixed-point interest mathematics for the Meridian client.
//!
//! This crate replicates the settlement contracts' integer-only accrual
//! model so the client can display live-accruing balances between confirmed
//! on-chain updates. All intermediate arithmetic stays in [`U256`]; floats
//! never appear before the final human-readable conversion.

pub mod accrual;
pub mod rate;
pub mod units;

pub use accrual::{extrapolate, scaled_to_value, value_to_scaled, AccrualInputs, ExtrapolatedIndices};
pub use rate::{utilization, InterestRateModel};
pub use units::{format_ray_percent, from_base_units, to_base_units};

use alloy::primitives::{uint, U256};

/// Fixed-point scale for index and rate values: 10^27.
pub const RAY: U256 = uint!(1_000_000_000_000_000_000_000_000_000_U256);

/// Fixed-point scale for fractions (utilization, kink, LTV): 10^18.
pub const WAD: U256 = uint!(1_000_000_000_000_000_000_U256);

/// Accrual time base, 365 days in seconds.
pub const SECONDS_PER_YEAR: U256 = uint!(31_536_000_U256);

/// Errors produced by fixed-point operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivideByZero,

    #[error("invalid decimal amount: {0}")]
    InvalidAmount(String),

    #[error("amount has more than {max} decimal places")]
    TooManyDecimals { max: u8 },

    #[error("exponent {0} out of supported range")]
    ExponentOutOfRange(i32),
}

/// Result type alias for fixed-point operations.
pub type Result<T> = core::result::Result<T, MathError>;

/// Computes `a * b / denominator` with an overflow-checked product.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256> {
    if denominator.is_zero() {
        return Err(MathError::DivideByZero);
    }
    a.checked_mul(b)
        .map(|product| product / denominator)
        .ok_or(MathError::Overflow)
}

/// Returns `10^exp` as a [`U256`].
pub fn pow10(exp: u32) -> Result<U256> {
    U256::from(10u64)
        .checked_pow(U256::from(exp))
        .ok_or(MathError::ExponentOutOfRange(exp as i32))
}
