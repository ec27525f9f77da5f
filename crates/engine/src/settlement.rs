//! The settlement collaborator: a trait for the orchestrator to drive and
//! the alloy-backed production implementation.

use std::time::Duration;

use alloy::{
    network::ReceiptResponse,
    primitives::{Address, Bytes, B256, U256},
    providers::Provider,
};
use async_trait::async_trait;
use meridian_contracts::{IBorrowManager, IDepositManager, IERC20};
use meridian_primitives::{ParseError, ReserveState};
use tracing::{debug, instrument};

/// Failures while reading from or writing to the settlement contracts.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("rpc transport failed: {0}")]
    Transport(#[from] alloy::transports::TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("transaction {0} reverted")]
    Reverted(B256),
}

/// Read and write operations the settlement contracts expose, abstracted so
/// orchestration tests can run against an in-process double.
///
/// Writes are split into submit (returns the transaction hash) and confirm
/// (waits for inclusion) so the orchestrator can report each as its own
/// phase and remain dismissible between them.
#[async_trait]
pub trait Settlement: Send + Sync {
    /// Address whose balances and allowances the client acts for.
    fn signer_address(&self) -> Address;

    async fn wallet_balance(&self, token: Address, owner: Address) -> Result<U256, SettlementError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, SettlementError>;

    async fn submit_approval(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<B256, SettlementError>;

    async fn submit_deposit(&self, token_id: B256, amount: U256) -> Result<B256, SettlementError>;

    async fn submit_withdraw(&self, token_id: B256, amount: U256) -> Result<B256, SettlementError>;

    async fn submit_borrow(
        &self,
        token_id: B256,
        amount: U256,
        update_data: Vec<Bytes>,
        price_ids: Vec<B256>,
        fee: U256,
    ) -> Result<B256, SettlementError>;

    async fn submit_repay(
        &self,
        token_id: B256,
        amount: U256,
        update_data: Vec<Bytes>,
        price_ids: Vec<B256>,
        fee: U256,
    ) -> Result<B256, SettlementError>;

    /// Waits until `hash` is included and succeeded.
    async fn confirm(&self, hash: B256) -> Result<(), SettlementError>;

    async fn supported_tokens(&self) -> Result<Vec<B256>, SettlementError>;

    async fn reserve(&self, token_id: B256) -> Result<ReserveState, SettlementError>;

    async fn deposited_scaled(
        &self,
        token_id: B256,
        owner: Address,
    ) -> Result<U256, SettlementError>;

    async fn borrow_scaled(&self, token_id: B256, owner: Address)
        -> Result<U256, SettlementError>;

    /// The settlement layer's RAY constant, for the startup cross-check.
    async fn ray(&self) -> Result<U256, SettlementError>;
}

/// Production settlement client over the DepositManager and BorrowManager
/// contracts.
#[derive(Debug, Clone)]
pub struct ContractSettlement<P> {
    provider: P,
    deposit_manager: Address,
    borrow_manager: Address,
    signer: Address,
    confirm_poll: Duration,
}

impl<P> ContractSettlement<P> {
    pub fn new(provider: P, deposit_manager: Address, borrow_manager: Address, signer: Address) -> Self {
        Self {
            provider,
            deposit_manager,
            borrow_manager,
            signer,
            confirm_poll: Duration::from_millis(500),
        }
    }
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync> Settlement for ContractSettlement<P> {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn wallet_balance(&self, token: Address, owner: Address) -> Result<U256, SettlementError> {
        Ok(IERC20::new(token, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await?)
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, SettlementError> {
        Ok(IERC20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await?)
    }

    #[instrument(skip(self))]
    async fn submit_approval(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<B256, SettlementError> {
        let pending = IERC20::new(token, self.provider.clone())
            .approve(spender, amount)
            .send()
            .await?;
        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self))]
    async fn submit_deposit(&self, token_id: B256, amount: U256) -> Result<B256, SettlementError> {
        let pending = IDepositManager::new(self.deposit_manager, self.provider.clone())
            .deposit(token_id, amount)
            .send()
            .await?;
        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self))]
    async fn submit_withdraw(&self, token_id: B256, amount: U256) -> Result<B256, SettlementError> {
        let pending = IDepositManager::new(self.deposit_manager, self.provider.clone())
            .withdraw(token_id, amount)
            .send()
            .await?;
        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self, update_data, price_ids))]
    async fn submit_borrow(
        &self,
        token_id: B256,
        amount: U256,
        update_data: Vec<Bytes>,
        price_ids: Vec<B256>,
        fee: U256,
    ) -> Result<B256, SettlementError> {
        let pending = IBorrowManager::new(self.borrow_manager, self.provider.clone())
            .borrow(token_id, amount, update_data, price_ids)
            .value(fee)
            .send()
            .await?;
        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self, update_data, price_ids))]
    async fn submit_repay(
        &self,
        token_id: B256,
        amount: U256,
        update_data: Vec<Bytes>,
        price_ids: Vec<B256>,
        fee: U256,
    ) -> Result<B256, SettlementError> {
        let pending = IBorrowManager::new(self.borrow_manager, self.provider.clone())
            .repay(token_id, amount, update_data, price_ids)
            .value(fee)
            .send()
            .await?;
        Ok(*pending.tx_hash())
    }

    async fn confirm(&self, hash: B256) -> Result<(), SettlementError> {
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(hash).await? {
                debug!(%hash, block = ?receipt.block_number(), "transaction included");
                if receipt.status() {
                    return Ok(());
                }
                return Err(SettlementError::Reverted(hash));
            }
            tokio::time::sleep(self.confirm_poll).await;
        }
    }

    async fn supported_tokens(&self) -> Result<Vec<B256>, SettlementError> {
        Ok(IDepositManager::new(self.deposit_manager, self.provider.clone())
            .getSupportedTokens()
            .call()
            .await?)
    }

    async fn reserve(&self, token_id: B256) -> Result<ReserveState, SettlementError> {
        let raw = IDepositManager::new(self.deposit_manager, self.provider.clone())
            .getAsset(token_id)
            .call()
            .await?;
        let borrow_index = IBorrowManager::new(self.borrow_manager, self.provider.clone())
            .borrowIndex(token_id)
            .call()
            .await?;
        Ok(ReserveState::from_raw(token_id, raw, borrow_index)?)
    }

    async fn deposited_scaled(
        &self,
        token_id: B256,
        owner: Address,
    ) -> Result<U256, SettlementError> {
        Ok(IDepositManager::new(self.deposit_manager, self.provider.clone())
            .balanceOf(token_id, owner)
            .call()
            .await?)
    }

    async fn borrow_scaled(
        &self,
        token_id: B256,
        owner: Address,
    ) -> Result<U256, SettlementError> {
        Ok(IBorrowManager::new(self.borrow_manager, self.provider.clone())
            .userBorrowScaled(token_id, owner)
            .call()
            .await?)
    }

    async fn ray(&self) -> Result<U256, SettlementError> {
        Ok(IDepositManager::new(self.deposit_manager, self.provider.clone())
            .RAY()
            .call()
            .await?)
    }
}
