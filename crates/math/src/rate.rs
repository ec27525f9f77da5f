//! Two-segment interest rate curve.
//!
//! Rates are RAY-scaled annual fractions; utilization and the kink point are
//! WAD-scaled fractions. Below the kink the borrow rate climbs linearly to
//! `base_rate + slope1`; past it the steeper `slope2` segment takes over,
//! modeling a liquidity-crunch penalty.

use alloy::primitives::U256;

use crate::{mul_div, MathError, Result, RAY, WAD};

/// Parameters of a reserve's interest rate curve.
///
/// `base_rate`, `slope1`, `slope2` and `reserve_factor` are RAY-scaled;
/// `kink` is a WAD-scaled utilization fraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterestRateModel {
    pub base_rate: U256,
    pub slope1: U256,
    pub slope2: U256,
    pub kink: U256,
    pub reserve_factor: U256,
}

/// Fraction of deposited liquidity currently borrowed, WAD-scaled.
///
/// Defined as `borrows / (deposits + borrows)`; a zero denominator means no
/// liquidity at all, which carries no rate pressure and yields 0.
pub fn utilization(total_deposits: U256, total_borrows: U256) -> Result<U256> {
    let denominator = total_deposits
        .checked_add(total_borrows)
        .ok_or(MathError::Overflow)?;
    if denominator.is_zero() {
        return Ok(U256::ZERO);
    }
    mul_div(total_borrows, WAD, denominator)
}

impl InterestRateModel {
    /// Annual borrow rate (RAY) at the given WAD utilization.
    pub fn borrow_rate(&self, utilization: U256) -> Result<U256> {
        if utilization <= self.kink || self.kink >= WAD {
            // First segment. A zero kink contributes nothing from slope1;
            // the parse boundary rejects that configuration upstream.
            let ramp = if self.kink.is_zero() {
                U256::ZERO
            } else {
                mul_div(self.slope1, utilization.min(self.kink), self.kink)?
            };
            self.base_rate.checked_add(ramp).ok_or(MathError::Overflow)
        } else {
            let excess = utilization - self.kink;
            let span = WAD - self.kink;
            let penalty = mul_div(self.slope2, excess, span)?;
            self.base_rate
                .checked_add(self.slope1)
                .and_then(|rate| rate.checked_add(penalty))
                .ok_or(MathError::Overflow)
        }
    }

    /// Annual supply rate (RAY): the borrow rate minus the protocol's cut.
    pub fn supply_rate(&self, utilization: U256) -> Result<U256> {
        let passed_through = RAY
            .checked_sub(self.reserve_factor)
            .ok_or(MathError::Overflow)?;
        mul_div(self.borrow_rate(utilization)?, passed_through, RAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::uint;

    fn model() -> InterestRateModel {
        InterestRateModel {
            // 1% base, 4% slope1, 60% slope2, 80% kink, 10% reserve factor
            base_rate: RAY / U256::from(100),
            slope1: RAY * U256::from(4) / U256::from(100),
            slope2: RAY * U256::from(60) / U256::from(100),
            kink: WAD * U256::from(80) / U256::from(100),
            reserve_factor: RAY / U256::from(10),
        }
    }

    #[test]
    fn utilization_is_zero_without_liquidity() {
        assert_eq!(utilization(U256::ZERO, U256::ZERO).unwrap(), U256::ZERO);
    }

    #[test]
    fn utilization_is_borrow_share_of_total() {
        // 25 borrowed against 75 deposited -> 25% of (75 + 25)
        let u = utilization(U256::from(75), U256::from(25)).unwrap();
        assert_eq!(u, WAD / U256::from(4));
    }

    #[test]
    fn borrow_rate_is_base_at_zero_utilization() {
        let m = model();
        assert_eq!(m.borrow_rate(U256::ZERO).unwrap(), m.base_rate);
    }

    #[test]
    fn borrow_rate_reaches_full_slope1_at_kink() {
        let m = model();
        let at_kink = m.borrow_rate(m.kink).unwrap();
        assert_eq!(at_kink, m.base_rate + m.slope1);
    }

    #[test]
    fn borrow_rate_adds_penalty_above_kink() {
        let m = model();
        // Halfway between kink (80%) and 100%: half of slope2 applies.
        let u = WAD * U256::from(90) / U256::from(100);
        let rate = m.borrow_rate(u).unwrap();
        assert_eq!(rate, m.base_rate + m.slope1 + m.slope2 / U256::from(2));
    }

    #[test]
    fn borrow_rate_is_monotone_across_the_kink() {
        let m = model();
        let mut previous = U256::ZERO;
        for percent in 0..=100u64 {
            let u = WAD * U256::from(percent) / U256::from(100);
            let rate = m.borrow_rate(u).unwrap();
            assert!(rate >= previous, "rate dipped at {percent}%");
            previous = rate;
        }
    }

    #[test]
    fn supply_rate_withholds_reserve_factor() {
        let m = model();
        let u = WAD / U256::from(2);
        let borrow = m.borrow_rate(u).unwrap();
        let supply = m.supply_rate(u).unwrap();
        assert_eq!(supply, borrow * U256::from(9) / U256::from(10));
        assert!(supply < borrow);
    }

    #[test]
    fn degenerate_kink_still_yields_a_rate() {
        let m = InterestRateModel {
            kink: U256::ZERO,
            ..model()
        };
        let rate = m.borrow_rate(WAD / U256::from(2)).unwrap();
        assert_eq!(rate, m.base_rate + m.slope1 + m.slope2 * uint!(5_U256) / uint!(10_U256));
    }
}
