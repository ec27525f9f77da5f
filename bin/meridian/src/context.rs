//! Shared wiring between subcommands.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use eyre::{ensure, Context, OptionExt};
use meridian_engine::{ContractSettlement, MarketView, Orchestrator, OrchestratorConfig, Settlement};
use meridian_oracle::{HermesClient, MockPythConfig, PriceOracle, PythClient};
use meridian_primitives::{Action, Position, PriceQuote};
use tracing::{debug, info};
use url::Url;

use crate::{config::ClientConfig, opts::GlobalArgs};

pub type AppSettlement = ContractSettlement<DynProvider>;
pub type AppOracle = PythClient<DynProvider>;
pub type AppOrchestrator = Orchestrator<AppSettlement, AppOracle>;

/// Loads the config file and applies CLI overrides.
pub fn load_config(global: &GlobalArgs) -> eyre::Result<ClientConfig> {
    let mut config = ClientConfig::load(&global.config)?;
    if let Some(rpc_url) = &global.rpc_url {
        config.rpc_url = Some(rpc_url.clone());
    }
    if let Some(key_path) = &global.key_path {
        config.key_path = Some(key_path.clone());
    }
    Ok(config)
}

fn rpc_url(config: &ClientConfig) -> eyre::Result<String> {
    config
        .rpc_url
        .clone()
        .ok_or_eyre("no RPC URL configured; set rpc_url in the config or pass --rpc-url")
}

fn read_signer(config: &ClientConfig) -> eyre::Result<PrivateKeySigner> {
    let key_path = config
        .key_path
        .as_ref()
        .ok_or_eyre("no key path configured; set key_path in the config or pass --key-path")?;
    let key_hex = std::fs::read_to_string(key_path)
        .wrap_err_with(|| format!("failed to read key file {}", key_path.display()))?
        .trim()
        .to_string();
    key_hex.parse().wrap_err("invalid private key")
}

/// Read-only provider for queries; no signing key required.
pub async fn connect_read_only(config: &ClientConfig) -> eyre::Result<DynProvider> {
    let provider = ProviderBuilder::new()
        .connect(&rpc_url(config)?)
        .await
        .wrap_err("failed to connect to RPC")?;
    Ok(provider.erased())
}

/// Wallet-backed provider for writes; returns the signer address alongside.
pub async fn connect_signing(config: &ClientConfig) -> eyre::Result<(DynProvider, Address)> {
    let signer = read_signer(config)?;
    let signer_address = signer.address();
    let wallet = EthereumWallet::from(signer);
    let provider = ProviderBuilder::new()
        .wallet(wallet)
        .connect(&rpc_url(config)?)
        .await
        .wrap_err("failed to connect to RPC")?;
    Ok((provider.erased(), signer_address))
}

pub fn settlement(provider: DynProvider, config: &ClientConfig, signer: Address) -> AppSettlement {
    ContractSettlement::new(
        provider,
        config.deposit_manager,
        config.borrow_manager,
        signer,
    )
}

pub fn oracle(provider: DynProvider, config: &ClientConfig) -> eyre::Result<AppOracle> {
    let hermes = HermesClient::new(Url::parse(&config.hermes_url).wrap_err("invalid hermes URL")?);
    let mut client = PythClient::new(provider, config.pyth, hermes);
    if config.test_mode {
        let mock_pyth = config
            .mock_pyth
            .ok_or_eyre("test_mode requires a mock_pyth address")?;
        client = client.with_mock(MockPythConfig {
            address: mock_pyth,
            feeds: config.mock_feeds(),
        });
    }
    Ok(client)
}

pub fn orchestrator(
    settlement: AppSettlement,
    oracle: AppOracle,
    config: &ClientConfig,
) -> AppOrchestrator {
    let mut deposit_spenders = vec![config.deposit_manager];
    deposit_spenders.extend(config.extra_deposit_spenders.iter().copied());

    Orchestrator::new(
        settlement,
        oracle,
        OrchestratorConfig {
            deposit_spenders,
            repay_spenders: vec![config.borrow_manager],
            oracle_actions: vec![Action::Borrow, Action::Repay],
            feed_ids: config.feed_ids(),
            test_mode: config.test_mode,
        },
    )
}

/// Aborts if the settlement layer's RAY constant disagrees with ours; every
/// index computation would be silently wrong otherwise.
pub async fn check_ray(settlement: &AppSettlement) -> eyre::Result<()> {
    let ray = settlement.ray().await?;
    ensure!(
        ray == meridian_math::RAY,
        "settlement RAY constant {ray} does not match client constant {}",
        meridian_math::RAY
    );
    debug!("RAY constant cross-check passed");
    Ok(())
}

/// Fetches every supported reserve, the owner's positions in them, and one
/// fresh quote per configured feed — the full input set for capacity and
/// portfolio derivations. Pure pull: call again after a refresh signal.
pub async fn fetch_markets(
    settlement: &AppSettlement,
    oracle: &AppOracle,
    config: &ClientConfig,
    owner: Address,
) -> eyre::Result<Vec<MarketView>> {
    let token_ids = settlement.supported_tokens().await?;
    info!(count = token_ids.len(), "fetching reserves");

    let feed_ids = config.feed_ids();
    let requested: Vec<B256> = token_ids
        .iter()
        .filter_map(|token_id| feed_ids.get(token_id).copied())
        .collect();
    let quotes: HashMap<B256, PriceQuote> = if requested.is_empty() {
        HashMap::new()
    } else {
        let update = oracle.latest_update(&requested).await?;
        update.quotes.into_iter().map(|q| (q.id, q)).collect()
    };

    let mut markets = Vec::with_capacity(token_ids.len());
    for token_id in token_ids {
        let reserve = settlement.reserve(token_id).await?;
        let position = Position {
            token_id,
            deposit_scaled: settlement.deposited_scaled(token_id, owner).await?,
            borrow_scaled: settlement.borrow_scaled(token_id, owner).await?,
        };
        let quote = feed_ids
            .get(&token_id)
            .and_then(|feed_id| quotes.get(feed_id))
            .copied();
        debug!(%token_id, symbol = %reserve.symbol, has_quote = quote.is_some(), "fetched market");
        markets.push(MarketView {
            reserve,
            position,
            quote,
        });
    }
    Ok(markets)
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}
