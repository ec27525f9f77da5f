//! Production oracle client: Hermes for payloads, the on-chain Pyth
//! contract for fee quotes, and an optional mock path for test
//! environments where no live feeds exist.

use std::collections::HashMap;

use alloy::{
    eips::BlockId,
    primitives::{Address, Bytes, B256, U256},
    providers::Provider,
};
use async_trait::async_trait;
use meridian_contracts::{IMockPyth, IPyth};
use meridian_primitives::PriceQuote;
use tracing::{debug, instrument};

use crate::{HermesClient, OracleError, PriceOracle, PriceUpdate};

/// Seed data for one mock feed; price and confidence share `expo`.
#[derive(Debug, Clone, Copy)]
pub struct MockFeed {
    pub price: i64,
    pub conf: u64,
    pub expo: i32,
}

/// Mock oracle wiring for test environments.
#[derive(Debug, Clone)]
pub struct MockPythConfig {
    pub address: Address,
    pub feeds: HashMap<B256, MockFeed>,
}

/// Oracle client backed by Hermes and the Pyth contract.
pub struct PythClient<P> {
    provider: P,
    pyth: Address,
    hermes: HermesClient,
    mock: Option<MockPythConfig>,
}

impl<P> PythClient<P> {
    pub fn new(provider: P, pyth: Address, hermes: HermesClient) -> Self {
        Self {
            provider,
            pyth,
            hermes,
            mock: None,
        }
    }

    /// Routes update synthesis through the mock oracle instead of Hermes.
    /// Only test environments should configure this.
    pub fn with_mock(mut self, mock: MockPythConfig) -> Self {
        self.mock = Some(mock);
        self
    }
}

impl<P: Provider + Clone> PythClient<P> {
    /// Synthesizes update payloads through the mock contract, stamping them
    /// with the latest block timestamp so they are fresh relative to the
    /// chain the write will land on.
    async fn synthesize_mock_update(
        &self,
        mock: &MockPythConfig,
        feed_ids: &[B256],
    ) -> Result<PriceUpdate, OracleError> {
        let block = self
            .provider
            .get_block(BlockId::latest())
            .await
            .map_err(|e| OracleError::Contract(e.to_string()))?
            .ok_or_else(|| OracleError::MalformedResponse("no latest block".into()))?;
        let publish_time = block.header.timestamp;

        let contract = IMockPyth::new(mock.address, self.provider.clone());
        let mut data = Vec::with_capacity(feed_ids.len());
        let mut quotes = Vec::with_capacity(feed_ids.len());

        for id in feed_ids {
            let feed = mock
                .feeds
                .get(id)
                .copied()
                .ok_or(OracleError::UnseededMockFeed(*id))?;

            let payload = contract
                .createPriceFeedUpdateData(
                    *id,
                    feed.price,
                    feed.conf,
                    feed.expo,
                    feed.price,
                    feed.conf,
                    publish_time,
                    publish_time.saturating_sub(60),
                )
                .call()
                .await
                .map_err(|e| OracleError::Contract(e.to_string()))?;

            data.push(payload);
            quotes.push(
                PriceQuote {
                    id: *id,
                    price: feed.price,
                    conf: feed.conf,
                    expo: feed.expo,
                    publish_time,
                }
                .validated()?,
            );
        }

        debug!(feeds = feed_ids.len(), %publish_time, "synthesized mock price update");
        Ok(PriceUpdate { data, quotes })
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> PriceOracle for PythClient<P> {
    #[instrument(skip(self), fields(feeds = feed_ids.len()))]
    async fn latest_update(&self, feed_ids: &[B256]) -> Result<PriceUpdate, OracleError> {
        if feed_ids.is_empty() {
            return Err(OracleError::EmptyFeedSet);
        }
        match &self.mock {
            Some(mock) => self.synthesize_mock_update(mock, feed_ids).await,
            None => self.hermes.latest_update(feed_ids).await,
        }
    }

    async fn update_fee(&self, data: &[Bytes]) -> Result<U256, OracleError> {
        if data.is_empty() {
            return Ok(U256::ZERO);
        }
        let pyth = IPyth::new(self.pyth, self.provider.clone());
        pyth.getUpdateFee(data.to_vec())
            .call()
            .await
            .map_err(|e| OracleError::Contract(e.to_string()))
    }
}
