//! Oracle-bounded borrow capacity.
//!
//! Collateral is valued at each quote's low bound, outstanding debt at its
//! high bound, so price uncertainty always understates what a user may
//! borrow. A pure function of the latest snapshots — nothing here caches
//! or mutates.

use alloy::primitives::U256;
use meridian_math::{extrapolate, mul_div, WAD};
use meridian_oracle::{resolve_bounds, OracleError, PriceBounds};
use meridian_primitives::{Position, PriceQuote, ReserveState};
use tracing::debug;

use crate::{EngineError, UnknownReason};

/// Available borrow capacity, or an explicit statement that it cannot be
/// computed. `Unknown` is never folded into a numeric zero: zero would
/// falsely block legitimate borrows, while any substituted number could
/// allow unsafe ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capacity {
    /// WAD-scaled USD (or token base units after [`capacity_in_units`]).
    Available(U256),
    Unknown(UnknownReason),
}

/// One asset's inputs to the capacity calculation.
#[derive(Debug, Clone)]
pub struct MarketView {
    pub reserve: ReserveState,
    pub position: Position,
    pub quote: Option<PriceQuote>,
}

#[derive(Debug, Clone)]
pub struct CapacityParams {
    /// Wall-clock seconds the calculation runs at.
    pub now: u64,
    /// Quotes older than this are unusable.
    pub max_quote_age_secs: u64,
    /// Loan-to-value haircut applied to collateral, WAD fraction.
    pub loan_to_value: U256,
}

/// Capacity with the valuations it was derived from, for account summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapacitySummary {
    Known {
        /// Collateral valued at low bounds, WAD USD.
        collateral_value: U256,
        /// Debt valued at high bounds, WAD USD.
        debt_value: U256,
        /// Collateral after the LTV haircut.
        max_borrow_value: U256,
        /// `max_borrow_value - debt_value`, floored at zero.
        available: U256,
    },
    Unknown(UnknownReason),
}

/// Computes `availableToBorrow` in WAD-scaled USD across all of a user's
/// positions.
///
/// Every asset the user holds or owes needs a fresh quote; one missing or
/// stale quote makes the whole figure [`Capacity::Unknown`] rather than a
/// partial sum that silently ignores the asset.
pub fn available_to_borrow(
    markets: &[MarketView],
    params: &CapacityParams,
) -> Result<Capacity, EngineError> {
    Ok(match capacity_summary(markets, params)? {
        CapacitySummary::Known { available, .. } => Capacity::Available(available),
        CapacitySummary::Unknown(reason) => Capacity::Unknown(reason),
    })
}

/// As [`available_to_borrow`], but keeps the intermediate valuations.
pub fn capacity_summary(
    markets: &[MarketView],
    params: &CapacityParams,
) -> Result<CapacitySummary, EngineError> {
    let mut collateral_value = U256::ZERO;
    let mut debt_value = U256::ZERO;

    for market in markets {
        if market.position.is_empty() {
            continue;
        }

        let quote = match &market.quote {
            Some(quote) => quote,
            None => {
                return Ok(CapacitySummary::Unknown(UnknownReason::MissingQuote(
                    market.reserve.token_id,
                )))
            }
        };
        let bounds = match resolve_bounds(quote, params.now, params.max_quote_age_secs) {
            Ok(bounds) => bounds,
            Err(OracleError::StalePrice {
                id,
                age_secs,
                max_age_secs,
            }) => {
                return Ok(CapacitySummary::Unknown(UnknownReason::StaleQuote {
                    id,
                    age_secs,
                    max_age_secs,
                }))
            }
            Err(err) => return Err(err.into()),
        };

        let indices = extrapolate(
            &market.reserve.accrual_inputs(),
            &market.reserve.rate_model(),
            params.now,
        )?;

        let deposit = market.position.live_deposit(&indices)?;
        if !deposit.is_zero() {
            let value = bounds.value_at_low(deposit, market.reserve.decimals)?;
            collateral_value = collateral_value
                .checked_add(value)
                .ok_or(meridian_math::MathError::Overflow)?;
        }

        let borrow = market.position.live_borrow(&indices)?;
        if !borrow.is_zero() {
            let value = bounds.value_at_high(borrow, market.reserve.decimals)?;
            debt_value = debt_value
                .checked_add(value)
                .ok_or(meridian_math::MathError::Overflow)?;
        }
    }

    let max_borrow_value = mul_div(collateral_value, params.loan_to_value, WAD)?;
    let available = max_borrow_value.saturating_sub(debt_value);
    debug!(%collateral_value, %debt_value, %available, "computed borrow capacity");
    Ok(CapacitySummary::Known {
        collateral_value,
        debt_value,
        max_borrow_value,
        available,
    })
}

/// Converts a USD capacity into base units of the asset about to be
/// borrowed, priced at the asset's high bound so uncertainty still biases
/// toward refusal.
pub fn capacity_in_units(
    capacity: &Capacity,
    bounds: &PriceBounds,
    decimals: u8,
) -> Result<Capacity, EngineError> {
    match capacity {
        Capacity::Available(usd_wad) => Ok(Capacity::Available(
            bounds.units_at_high(*usd_wad, decimals)?,
        )),
        Capacity::Unknown(reason) => Ok(Capacity::Unknown(reason.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256};
    use meridian_math::RAY;

    const NOW: u64 = 1_700_000_000;

    fn reserve(token_id: u8, decimals: u8) -> ReserveState {
        ReserveState {
            token_id: B256::repeat_byte(token_id),
            token: Address::repeat_byte(token_id),
            symbol: format!("TOK{token_id}"),
            decimals,
            is_active: true,
            liquidity_index: RAY,
            borrow_index: RAY,
            last_update_timestamp: NOW,
            total_scaled_supply: U256::from(10_000_000u64),
            total_borrows_scaled: U256::from(1_000_000u64),
            base_rate: RAY / U256::from(100),
            slope1: RAY / U256::from(25),
            slope2: RAY / U256::from(2),
            kink: WAD * U256::from(8) / U256::from(10),
            reserve_factor: RAY / U256::from(10),
        }
    }

    fn quote(token_id: u8, price: i64, conf: u64) -> PriceQuote {
        PriceQuote {
            id: B256::repeat_byte(token_id),
            price,
            conf,
            expo: -8,
            publish_time: NOW,
        }
    }

    fn params() -> CapacityParams {
        CapacityParams {
            now: NOW,
            max_quote_age_secs: 60,
            // 75% LTV
            loan_to_value: WAD * U256::from(75) / U256::from(100),
        }
    }

    fn market(token_id: u8, deposit: u64, borrow: u64, quote: Option<PriceQuote>) -> MarketView {
        MarketView {
            reserve: reserve(token_id, 6),
            position: Position {
                token_id: B256::repeat_byte(token_id),
                deposit_scaled: U256::from(deposit),
                borrow_scaled: U256::from(borrow),
            },
            quote,
        }
    }

    #[test]
    fn values_collateral_low_and_debt_high() {
        // $1.00 ± $0.02 quote; 100 tokens deposited, 10 borrowed elsewhere.
        let markets = vec![
            market(1, 100_000_000, 0, Some(quote(1, 100_000_000, 2_000_000))),
            market(2, 0, 10_000_000, Some(quote(2, 100_000_000, 2_000_000))),
        ];
        let capacity = available_to_borrow(&markets, &params()).unwrap();

        // collateral: 100 * $0.98 = $98; max borrow = 73.5; debt: 10 * $1.02
        // = $10.20; available = $63.30
        let expected = WAD * U256::from(6330) / U256::from(100);
        assert_eq!(capacity, Capacity::Available(expected));
    }

    #[test]
    fn capacity_is_floored_at_zero() {
        let markets = vec![
            market(1, 10_000_000, 0, Some(quote(1, 100_000_000, 0))),
            market(2, 0, 50_000_000, Some(quote(2, 100_000_000, 0))),
        ];
        let capacity = available_to_borrow(&markets, &params()).unwrap();
        assert_eq!(capacity, Capacity::Available(U256::ZERO));
    }

    #[test]
    fn one_stale_quote_makes_capacity_unknown() {
        let stale = PriceQuote {
            publish_time: NOW - 120,
            ..quote(2, 100_000_000, 0)
        };
        let markets = vec![
            market(1, 100_000_000, 0, Some(quote(1, 100_000_000, 0))),
            market(2, 50_000_000, 0, Some(stale)),
            market(3, 25_000_000, 0, Some(quote(3, 100_000_000, 0))),
        ];
        let capacity = available_to_borrow(&markets, &params()).unwrap();
        assert!(matches!(
            capacity,
            Capacity::Unknown(UnknownReason::StaleQuote { age_secs: 120, .. })
        ));
    }

    #[test]
    fn missing_quote_makes_capacity_unknown() {
        let markets = vec![market(1, 100_000_000, 0, None)];
        let capacity = available_to_borrow(&markets, &params()).unwrap();
        assert_eq!(
            capacity,
            Capacity::Unknown(UnknownReason::MissingQuote(B256::repeat_byte(1)))
        );
    }

    #[test]
    fn empty_positions_need_no_quote() {
        let markets = vec![market(1, 0, 0, None)];
        let capacity = available_to_borrow(&markets, &params()).unwrap();
        assert_eq!(capacity, Capacity::Available(U256::ZERO));
    }

    #[test]
    fn worse_collateral_quote_never_increases_capacity() {
        let base = vec![market(1, 100_000_000, 0, Some(quote(1, 100_000_000, 0)))];
        let worse = vec![market(1, 100_000_000, 0, Some(quote(1, 90_000_000, 0)))];

        let Capacity::Available(base_cap) = available_to_borrow(&base, &params()).unwrap() else {
            panic!("expected available capacity");
        };
        let Capacity::Available(worse_cap) = available_to_borrow(&worse, &params()).unwrap() else {
            panic!("expected available capacity");
        };
        assert!(worse_cap <= base_cap);
    }

    #[test]
    fn higher_debt_quote_never_increases_capacity() {
        let make = |debt_price: i64| {
            vec![
                market(1, 100_000_000, 0, Some(quote(1, 100_000_000, 0))),
                market(2, 0, 10_000_000, Some(quote(2, debt_price, 0))),
            ]
        };
        let Capacity::Available(base_cap) =
            available_to_borrow(&make(100_000_000), &params()).unwrap()
        else {
            panic!("expected available capacity");
        };
        let Capacity::Available(higher_cap) =
            available_to_borrow(&make(110_000_000), &params()).unwrap()
        else {
            panic!("expected available capacity");
        };
        assert!(higher_cap <= base_cap);
    }

    #[test]
    fn unit_conversion_preserves_unknown() {
        let bounds = resolve_bounds(&quote(1, 100_000_000, 0), NOW, 60).unwrap();
        let unknown = Capacity::Unknown(UnknownReason::MissingQuote(B256::repeat_byte(9)));
        assert_eq!(
            capacity_in_units(&unknown, &bounds, 6).unwrap(),
            unknown.clone()
        );

        let available = Capacity::Available(WAD * U256::from(50));
        // $50 at a $1.00 high bound buys 50 tokens of 6 decimals.
        assert_eq!(
            capacity_in_units(&available, &bounds, 6).unwrap(),
            Capacity::Available(U256::from(50_000_000u64))
        );
    }
}
