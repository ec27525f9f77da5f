//! Index extrapolation between confirmed on-chain updates.
//!
//! A reserve snapshot is stale the moment it is fetched. These functions
//! extend the stored liquidity and borrow indexes to the current wall-clock
//! time without mutating the snapshot, using the same linear per-step
//! accrual the settlement layer applies: compounding emerges from repeated
//! settlement updates, not from this layer.

use alloy::primitives::U256;

use crate::{mul_div, rate::utilization, InterestRateModel, MathError, Result, RAY, SECONDS_PER_YEAR};

/// The index-bearing slice of a reserve snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualInputs {
    /// Stored liquidity index, RAY. Zero means never accrued (1 RAY).
    pub liquidity_index: U256,
    /// Stored borrow index, RAY. Zero means never accrued (1 RAY).
    pub borrow_index: U256,
    /// Total supply in index-scaled units.
    pub total_scaled_supply: U256,
    /// Total borrows in index-scaled units.
    pub total_borrows_scaled: U256,
    /// Timestamp (seconds) of the last settlement-layer accrual.
    pub last_update_timestamp: u64,
}

/// Indexes extended to `now`, plus the rates they were extended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrapolatedIndices {
    pub liquidity_index: U256,
    pub borrow_index: U256,
    /// WAD utilization at the snapshot basis.
    pub utilization: U256,
    /// RAY annual borrow rate used for the extension.
    pub borrow_rate: U256,
    /// RAY annual supply rate used for the extension.
    pub supply_rate: U256,
}

/// Converts an index-scaled balance into its live value: `scaled * index / RAY`.
pub fn scaled_to_value(scaled: U256, index: U256) -> Result<U256> {
    mul_div(scaled, index, RAY)
}

/// Converts a live value into index-scaled units: `value * RAY / index`.
pub fn value_to_scaled(value: U256, index: U256) -> Result<U256> {
    mul_div(value, RAY, index)
}

/// An index stored as zero has never been touched by the settlement layer's
/// lazy initialization and means exactly 1 RAY, not "no debt".
fn normalize_index(index: U256) -> U256 {
    if index.is_zero() {
        RAY
    } else {
        index
    }
}

/// Linear accrual of an index over `elapsed` seconds at an annual RAY rate.
fn accrue(index: U256, annual_rate: U256, elapsed: u64) -> Result<U256> {
    let accrued = mul_div(annual_rate, U256::from(elapsed), SECONDS_PER_YEAR)?;
    let growth = RAY.checked_add(accrued).ok_or(MathError::Overflow)?;
    mul_div(index, growth, RAY)
}

/// Extends the snapshot's indexes to `now`.
///
/// The utilization basis is the totals valued at the *stored* indexes — the
/// same basis the settlement layer used at `last_update_timestamp` —
/// otherwise the replica would drift from the model it mirrors. With no
/// deposits nothing is earning, so the liquidity index stays frozen.
pub fn extrapolate(
    inputs: &AccrualInputs,
    model: &InterestRateModel,
    now: u64,
) -> Result<ExtrapolatedIndices> {
    let liquidity_index = normalize_index(inputs.liquidity_index);
    let borrow_index = normalize_index(inputs.borrow_index);

    let total_deposits = scaled_to_value(inputs.total_scaled_supply, liquidity_index)?;
    let total_borrows = scaled_to_value(inputs.total_borrows_scaled, borrow_index)?;

    let utilization = utilization(total_deposits, total_borrows)?;
    let borrow_rate = model.borrow_rate(utilization)?;
    let supply_rate = model.supply_rate(utilization)?;

    let elapsed = now.saturating_sub(inputs.last_update_timestamp);
    if elapsed == 0 {
        return Ok(ExtrapolatedIndices {
            liquidity_index,
            borrow_index,
            utilization,
            borrow_rate,
            supply_rate,
        });
    }

    let liquidity_index = if total_deposits.is_zero() {
        liquidity_index
    } else {
        accrue(liquidity_index, supply_rate, elapsed)?
    };
    let borrow_index = accrue(borrow_index, borrow_rate, elapsed)?;

    Ok(ExtrapolatedIndices {
        liquidity_index,
        borrow_index,
        utilization,
        borrow_rate,
        supply_rate,
    })
}
