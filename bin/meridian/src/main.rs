use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::opts::{Meridian, MeridianSubcommand};

mod cmd;
mod config;
mod context;
mod opts;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Meridian::parse();

    match args.cmd {
        MeridianSubcommand::Markets(cmd) => cmd.run(&args.global).await,
        MeridianSubcommand::Portfolio(cmd) => cmd.run(&args.global).await,
        MeridianSubcommand::Deposit(cmd) => cmd.run(&args.global).await,
        MeridianSubcommand::Withdraw(cmd) => cmd.run(&args.global).await,
        MeridianSubcommand::Borrow(cmd) => cmd.run(&args.global).await,
        MeridianSubcommand::Repay(cmd) => cmd.run(&args.global).await,
    }
}
