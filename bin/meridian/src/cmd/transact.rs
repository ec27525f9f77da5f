use alloy::{
    primitives::U256,
    providers::Provider,
};
use clap::Args;
use eyre::eyre;
use meridian_engine::{
    available_to_borrow, capacity_in_units, Capacity, CapacityParams, IntentBounds, Phase,
    Settlement, UnknownReason,
};
use meridian_math::{extrapolate, scaled_to_value, to_base_units};
use meridian_oracle::{resolve_bounds, OracleError};
use meridian_primitives::{Action, TransactionIntent};
use tracing::info;

use crate::{context, opts::GlobalArgs};

#[derive(Args, Debug)]
pub struct TransactCommon {
    /// Asset symbol as configured, e.g. WETH
    pub symbol: String,

    /// Amount in human units, e.g. 1.5
    pub amount: String,
}

macro_rules! transact_command {
    ($name:ident, $action:expr) => {
        #[derive(Args, Debug)]
        pub struct $name {
            #[command(flatten)]
            pub common: TransactCommon,
        }

        impl $name {
            pub async fn run(self, global: &GlobalArgs) -> eyre::Result<()> {
                run_transact($action, self.common, global).await
            }
        }
    };
}

transact_command!(DepositArgs, Action::Deposit);
transact_command!(WithdrawArgs, Action::Withdraw);
transact_command!(BorrowArgs, Action::Borrow);
transact_command!(RepayArgs, Action::Repay);

async fn run_transact(
    action: Action,
    common: TransactCommon,
    global: &GlobalArgs,
) -> eyre::Result<()> {
    let config = context::load_config(global)?;
    let asset = config.asset(&common.symbol)?.clone();

    let (provider, owner) = context::connect_signing(&config).await?;
    let settlement = context::settlement(provider.clone(), &config, owner);
    context::check_ray(&settlement).await?;
    let oracle = context::oracle(provider.clone(), &config)?;

    let reserve = settlement.reserve(asset.token_id).await?;
    let amount = to_base_units(&common.amount, reserve.decimals)?;
    let now = context::unix_now();
    let indices = extrapolate(&reserve.accrual_inputs(), &reserve.rate_model(), now)?;

    let wallet_balance = if reserve.is_native() {
        provider.get_balance(owner).await?
    } else {
        settlement.wallet_balance(reserve.token, owner).await?
    };
    let deposited = scaled_to_value(
        settlement.deposited_scaled(asset.token_id, owner).await?,
        indices.liquidity_index,
    )?;
    let owed = scaled_to_value(
        settlement.borrow_scaled(asset.token_id, owner).await?,
        indices.borrow_index,
    )?;

    // The capacity bound is only consulted for borrows; skip the full
    // market sweep otherwise.
    let borrowable = if action == Action::Borrow {
        let markets = context::fetch_markets(&settlement, &oracle, &config, owner).await?;
        let capacity = available_to_borrow(
            &markets,
            &CapacityParams {
                now,
                max_quote_age_secs: config.max_quote_age_secs,
                loan_to_value: config.loan_to_value_wad(),
            },
        )?;

        let target_quote = markets
            .iter()
            .find(|market| market.reserve.token_id == asset.token_id)
            .and_then(|market| market.quote);
        match target_quote {
            None => Capacity::Unknown(UnknownReason::MissingQuote(asset.token_id)),
            Some(quote) => match resolve_bounds(&quote, now, config.max_quote_age_secs) {
                Ok(bounds) => capacity_in_units(&capacity, &bounds, reserve.decimals)?,
                Err(OracleError::StalePrice {
                    id,
                    age_secs,
                    max_age_secs,
                }) => Capacity::Unknown(UnknownReason::StaleQuote {
                    id,
                    age_secs,
                    max_age_secs,
                }),
                Err(err) => return Err(err.into()),
            },
        }
    } else {
        Capacity::Available(U256::ZERO)
    };

    let orchestrator = context::orchestrator(settlement, oracle, &config);
    let intent = TransactionIntent {
        action,
        token_id: asset.token_id,
        token: reserve.token,
        amount,
    };
    info!(%action, symbol = %common.symbol, %amount, "submitting intent");
    let report = orchestrator
        .execute(
            intent,
            IntentBounds {
                wallet_balance,
                deposited,
                owed,
                borrowable,
            },
        )
        .await;

    for hash in &report.approval_hashes {
        println!("approval confirmed: {hash}");
    }
    match report.phase {
        Phase::Confirmed { hash } => {
            println!("{action} confirmed: {hash}");
            Ok(())
        }
        _ => {
            let message = report
                .error
                .map(|err| err.message)
                .unwrap_or_else(|| "Transaction failed. Please try again.".to_string());
            Err(eyre!("{action} did not complete: {message}"))
        }
    }
}
