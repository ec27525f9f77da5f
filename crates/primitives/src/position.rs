//! Per-user, per-asset balances in index-scaled units.

use alloy::primitives::{B256, U256};
use meridian_math::{scaled_to_value, ExtrapolatedIndices, MathError};

/// A user's scaled deposit and debt for one asset.
///
/// Scaled balances are stored independent of accrued interest; never compare
/// them across time without re-deriving live value through the current
/// index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub token_id: B256,
    pub deposit_scaled: U256,
    pub borrow_scaled: U256,
}

impl Position {
    /// Live deposited value at the given extrapolated indexes.
    pub fn live_deposit(&self, indices: &ExtrapolatedIndices) -> Result<U256, MathError> {
        scaled_to_value(self.deposit_scaled, indices.liquidity_index)
    }

    /// Live owed value at the given extrapolated indexes.
    pub fn live_borrow(&self, indices: &ExtrapolatedIndices) -> Result<U256, MathError> {
        scaled_to_value(self.borrow_scaled, indices.borrow_index)
    }

    /// True when the user has neither deposits nor debt in this asset.
    pub fn is_empty(&self) -> bool {
        self.deposit_scaled.is_zero() && self.borrow_scaled.is_zero()
    }
}
