//! Price-oracle plumbing for the Meridian client.
//!
//! Raw quotes carry a declared uncertainty band; everything downstream
//! consumes conservative bounds derived here, never the mid price. Update
//! payloads come from the Hermes HTTP API in production and from an
//! on-chain mock in test environments.

pub mod bounds;
pub mod hermes;
mod pyth;

pub use bounds::{resolve_bounds, PriceBounds};
pub use hermes::HermesClient;
pub use pyth::{MockFeed, MockPythConfig, PythClient};

use alloy::primitives::{Bytes, B256, U256};
use async_trait::async_trait;
use meridian_math::MathError;
use meridian_primitives::{ParseError, PriceQuote};

/// A fresh oracle update: the binary payloads to submit on-chain and the
/// parsed quotes they certify, index-aligned with the requested feed ids.
#[derive(Debug, Clone)]
pub struct PriceUpdate {
    pub data: Vec<Bytes>,
    pub quotes: Vec<PriceQuote>,
}

/// The oracle collaborator as the orchestration layer consumes it.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Fetches (or synthesizes, in test environments) the latest signed
    /// update for the given feed ids.
    async fn latest_update(&self, feed_ids: &[B256]) -> Result<PriceUpdate, OracleError>;

    /// Quotes the fee required to submit the given update payloads.
    async fn update_fee(&self, data: &[Bytes]) -> Result<U256, OracleError>;
}

/// Failures in oracle plumbing.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("no feed ids requested")]
    EmptyFeedSet,

    #[error("quote {id} is stale: {age_secs}s old, window is {max_age_secs}s")]
    StalePrice { id: B256, age_secs: u64, max_age_secs: u64 },

    #[error("no quote returned for feed {0}")]
    MissingQuote(B256),

    #[error("feed {0} is not seeded in the mock oracle")]
    UnseededMockFeed(B256),

    #[error("oracle http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("oracle contract call failed: {0}")]
    Contract(String),

    #[error(transparent)]
    Math(#[from] MathError),
}
