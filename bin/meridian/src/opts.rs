use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cmd::{
    markets::MarketsArgs,
    portfolio::PortfolioArgs,
    transact::{BorrowArgs, DepositArgs, RepayArgs, WithdrawArgs},
};

#[derive(Parser, Debug)]
#[command(version, about = "Client for the Meridian lending protocol", long_about = None)]
pub struct Meridian {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: MeridianSubcommand,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Path to the client config file
    #[arg(short, long, default_value = "meridian.toml")]
    pub config: PathBuf,

    /// RPC URL (overrides config)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Path to a private key file for signing (overrides config)
    #[arg(long)]
    pub key_path: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum MeridianSubcommand {
    /// List supported markets with live rates and utilization
    Markets(MarketsArgs),
    /// Show an account's live balances, debt and borrow capacity
    Portfolio(PortfolioArgs),
    /// Deposit collateral into a reserve
    Deposit(DepositArgs),
    /// Withdraw deposited collateral
    Withdraw(WithdrawArgs),
    /// Borrow against deposited collateral
    Borrow(BorrowArgs),
    /// Repay outstanding debt
    Repay(RepayArgs),
}
