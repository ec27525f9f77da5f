//! Engine error taxonomy.
//!
//! Validation failures are ordinary return values that never reach the
//! network; unknown capacity is distinct from zero capacity; everything
//! else wraps a collaborator's error and flows through the classifier
//! before a user sees it.

use alloy::primitives::{B256, U256};
use meridian_math::MathError;
use meridian_oracle::OracleError;
use meridian_primitives::Action;

use crate::settlement::SettlementError;

/// Local pre-flight rejections. These block submission outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("{action} amount {amount} exceeds the available bound {bound}")]
    ExceedsBound {
        action: Action,
        amount: U256,
        bound: U256,
    },

    #[error("no price feed configured for token {0}")]
    MissingFeedId(B256),

    #[error("a {action} for this asset is already in flight")]
    OverlappingRun { token_id: B256, action: Action },
}

/// Why capacity could not be computed. Never conflated with zero.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnknownReason {
    #[error("no quote available for {0}")]
    MissingQuote(B256),

    #[error("quote for {id} is stale ({age_secs}s old, window {max_age_secs}s)")]
    StaleQuote {
        id: B256,
        age_secs: u64,
        max_age_secs: u64,
    },
}

/// Top-level engine error.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("borrow capacity is unknown: {0}")]
    UnknownCapacity(UnknownReason),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Math(#[from] MathError),
}
