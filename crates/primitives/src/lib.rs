//! Core domain types for the Meridian client.
//!
//! Raw contract reads cross a strict parse/validate boundary here before
//! they reach any computation: malformed or out-of-range data is rejected
//! at the edge, so downstream components only ever see well-formed
//! [`ReserveState`]s, [`Position`]s and [`PriceQuote`]s.

mod intent;
mod position;
mod quote;
mod reserve;

pub use intent::{Action, TransactionIntent};
pub use position::Position;
pub use quote::PriceQuote;
pub use reserve::ReserveState;

use alloy::primitives::B256;

/// Rejection reasons at the parse/validate boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("reserve {0}: token decimals {1} exceed the supported maximum of 30")]
    DecimalsOutOfRange(B256, u8),

    #[error("reserve {0}: reserve factor exceeds RAY")]
    ReserveFactorOutOfRange(B256),

    #[error("reserve {0}: kink must lie in (0, WAD]")]
    KinkOutOfRange(B256),

    #[error("reserve {0}: empty symbol")]
    EmptySymbol(B256),

    #[error("quote {0}: negative price")]
    NegativePrice(B256),

    #[error("quote {0}: exponent {1} out of supported range")]
    ExponentOutOfRange(B256, i32),
}
