//! Typed reserve snapshots.

use alloy::primitives::{Address, B256, U256};
use meridian_contracts::IDepositManager;
use meridian_math::{AccrualInputs, InterestRateModel, RAY, WAD};

use crate::ParseError;

/// One supported asset's reserve state as read from the settlement layer.
///
/// A snapshot is read-only and stale the instant it is fetched; the accrual
/// engine extends its indexes forward in time without mutating it. The
/// borrow index lives in a different contract than the rest of the asset
/// data and is stitched in at the parse boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveState {
    pub token_id: B256,
    pub token: Address,
    pub symbol: String,
    pub decimals: u8,
    pub is_active: bool,
    /// Cumulative deposit-side index, RAY. Zero means never accrued.
    pub liquidity_index: U256,
    /// Cumulative debt-side index, RAY. Zero means never accrued.
    pub borrow_index: U256,
    /// Seconds timestamp of the last settlement-layer accrual.
    pub last_update_timestamp: u64,
    pub total_scaled_supply: U256,
    pub total_borrows_scaled: U256,
    pub base_rate: U256,
    pub slope1: U256,
    pub slope2: U256,
    pub kink: U256,
    pub reserve_factor: U256,
}

impl ReserveState {
    /// Validates and converts a raw `getAsset` read plus the separately
    /// fetched borrow index into a typed snapshot.
    pub fn from_raw(
        token_id: B256,
        raw: IDepositManager::Asset,
        borrow_index: U256,
    ) -> Result<Self, ParseError> {
        if raw.symbol.trim().is_empty() {
            return Err(ParseError::EmptySymbol(token_id));
        }
        if raw.decimals > 30 {
            return Err(ParseError::DecimalsOutOfRange(token_id, raw.decimals));
        }
        if raw.reserveFactor > RAY {
            return Err(ParseError::ReserveFactorOutOfRange(token_id));
        }
        if raw.kink.is_zero() || raw.kink > WAD {
            return Err(ParseError::KinkOutOfRange(token_id));
        }

        Ok(Self {
            token_id,
            token: raw.token,
            symbol: raw.symbol,
            decimals: raw.decimals,
            is_active: raw.isActive,
            liquidity_index: raw.liquidityIndex,
            borrow_index,
            last_update_timestamp: raw.lastUpdateTimestamp.saturating_to(),
            total_scaled_supply: raw.totalScaledSupply,
            total_borrows_scaled: raw.totalBorrowsScaled,
            base_rate: raw.baseRate,
            slope1: raw.slope1,
            slope2: raw.slope2,
            kink: raw.kink,
            reserve_factor: raw.reserveFactor,
        })
    }

    /// The reserve's interest rate curve parameters.
    pub fn rate_model(&self) -> InterestRateModel {
        InterestRateModel {
            base_rate: self.base_rate,
            slope1: self.slope1,
            slope2: self.slope2,
            kink: self.kink,
            reserve_factor: self.reserve_factor,
        }
    }

    /// The index-bearing slice of the snapshot, as the accrual engine
    /// consumes it.
    pub fn accrual_inputs(&self) -> AccrualInputs {
        AccrualInputs {
            liquidity_index: self.liquidity_index,
            borrow_index: self.borrow_index,
            total_scaled_supply: self.total_scaled_supply,
            total_borrows_scaled: self.total_borrows_scaled,
            last_update_timestamp: self.last_update_timestamp,
        }
    }

    /// True when this reserve is the chain's native asset entry, which has
    /// no ERC20 contract and therefore no approval step.
    pub fn is_native(&self) -> bool {
        self.token == Address::ZERO
    }
}
