//! User intent handed to the orchestrator.

use alloy::primitives::{Address, B256, U256};

/// The four settlement writes a user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Borrow => "borrow",
            Self::Repay => "repay",
        };
        f.write_str(name)
    }
}

/// One submitted form: an action, the asset it targets, and the amount in
/// the asset's native base units. Created when the user submits, discarded
/// once its orchestration run reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    pub action: Action,
    pub token_id: B256,
    pub token: Address,
    pub amount: U256,
}
