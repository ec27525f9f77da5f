//! Client configuration.

use std::{collections::HashMap, path::Path, path::PathBuf};

use alloy::primitives::{Address, B256, U256};
use eyre::{Context, OptionExt};
use meridian_oracle::MockFeed;
use serde::{Deserialize, Serialize};

fn default_hermes_url() -> String {
    "https://hermes.pyth.network".to_string()
}

fn default_max_quote_age_secs() -> u64 {
    60
}

fn default_loan_to_value_bps() -> u64 {
    7_500
}

/// TOML configuration for the Meridian client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// RPC URL of the chain the settlement contracts live on
    pub rpc_url: Option<String>,

    /// Hermes price service endpoint
    #[serde(default = "default_hermes_url")]
    pub hermes_url: String,

    pub deposit_manager: Address,
    pub borrow_manager: Address,

    /// Pyth oracle contract consulted for update fees
    pub pyth: Address,

    /// Mock oracle used instead of Hermes when `test_mode` is set
    pub mock_pyth: Option<Address>,

    /// Test mode: permits mock update synthesis and the empty-payload fee
    /// fallback. Never enable against a production deployment.
    #[serde(default)]
    pub test_mode: bool,

    /// Quotes older than this are unusable for capacity decisions
    #[serde(default = "default_max_quote_age_secs")]
    pub max_quote_age_secs: u64,

    /// Loan-to-value haircut applied to collateral, in basis points
    #[serde(default = "default_loan_to_value_bps")]
    pub loan_to_value_bps: u64,

    /// Path to the signing key file
    pub key_path: Option<PathBuf>,

    /// Additional spenders the deposit path must approve (e.g. a bridge
    /// router), beyond the deposit manager itself
    #[serde(default)]
    pub extra_deposit_spenders: Vec<Address>,

    /// Supported assets keyed by symbol
    #[serde(default)]
    pub assets: HashMap<String, AssetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Settlement-layer token id
    pub token_id: B256,

    /// Pyth price feed id
    pub feed_id: B256,

    /// Seed data for the mock oracle in test environments
    pub mock_price: Option<MockFeedConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MockFeedConfig {
    pub price: i64,
    pub conf: u64,
    pub expo: i32,
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .wrap_err_with(|| format!("failed to read config {}", path.as_ref().display()))?;
        let config: Self = toml::from_str(&contents).wrap_err("failed to parse config")?;
        Ok(config)
    }

    /// The configured LTV haircut as a WAD fraction.
    pub fn loan_to_value_wad(&self) -> U256 {
        meridian_math::WAD * U256::from(self.loan_to_value_bps) / U256::from(10_000u64)
    }

    /// Token id to feed id mapping across all configured assets.
    pub fn feed_ids(&self) -> HashMap<B256, B256> {
        self.assets
            .values()
            .map(|asset| (asset.token_id, asset.feed_id))
            .collect()
    }

    /// Mock feed seeds keyed by feed id, for test environments.
    pub fn mock_feeds(&self) -> HashMap<B256, MockFeed> {
        self.assets
            .values()
            .filter_map(|asset| {
                asset.mock_price.map(|mock| {
                    (
                        asset.feed_id,
                        MockFeed {
                            price: mock.price,
                            conf: mock.conf,
                            expo: mock.expo,
                        },
                    )
                })
            })
            .collect()
    }

    pub fn asset(&self, symbol: &str) -> eyre::Result<&AssetConfig> {
        self.assets
            .get(symbol)
            .ok_or_eyre(format!("asset {symbol} is not configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        rpc_url = "http://localhost:8545"
        deposit_manager = "0x1111111111111111111111111111111111111111"
        borrow_manager = "0x2222222222222222222222222222222222222222"
        pyth = "0x3333333333333333333333333333333333333333"
        mock_pyth = "0x4444444444444444444444444444444444444444"
        test_mode = true

        [assets.WETH]
        token_id = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
        feed_id = "0xff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace"

        [assets.WETH.mock_price]
        price = 123_00000000
        conf = 100
        expo = -8

        [assets.USDC]
        token_id = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
        feed_id = "0xeaa020c61cc479712813461ce153894a96a6c00b21ed0cfc2798d1f9a9e9c94a"
    "#;

    #[test]
    fn parses_a_full_config() {
        let config: ClientConfig = toml::from_str(CONFIG).unwrap();
        assert!(config.test_mode);
        assert_eq!(config.assets.len(), 2);
        assert_eq!(config.max_quote_age_secs, 60);
        assert_eq!(config.hermes_url, "https://hermes.pyth.network");
        assert!(config.assets["WETH"].mock_price.is_some());
        assert!(config.assets["USDC"].mock_price.is_none());
    }

    #[test]
    fn derived_maps_cover_all_assets() {
        let config: ClientConfig = toml::from_str(CONFIG).unwrap();
        assert_eq!(config.feed_ids().len(), 2);
        // Only the seeded asset contributes a mock feed.
        assert_eq!(config.mock_feeds().len(), 1);
    }

    #[test]
    fn ltv_defaults_to_75_percent() {
        let config: ClientConfig = toml::from_str(CONFIG).unwrap();
        assert_eq!(
            config.loan_to_value_wad(),
            meridian_math::WAD * U256::from(75) / U256::from(100)
        );
    }
}
