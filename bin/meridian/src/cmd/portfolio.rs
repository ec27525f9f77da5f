use alloy::primitives::{Address, U256};
use clap::Args;
use meridian_engine::{capacity_summary, CapacityParams, CapacitySummary};
use meridian_math::{extrapolate, format_ray_percent, from_base_units, WAD};

use crate::{context, opts::GlobalArgs};

#[derive(Args, Debug)]
pub struct PortfolioArgs {
    /// Account to inspect; defaults to the configured signing key's address
    #[arg(long)]
    pub address: Option<Address>,
}

impl PortfolioArgs {
    pub async fn run(self, global: &GlobalArgs) -> eyre::Result<()> {
        let config = context::load_config(global)?;

        let owner = match self.address {
            Some(address) => address,
            None => context::connect_signing(&config).await?.1,
        };

        let provider = context::connect_read_only(&config).await?;
        let settlement = context::settlement(provider.clone(), &config, owner);
        context::check_ray(&settlement).await?;
        let oracle = context::oracle(provider, &config)?;

        let markets = context::fetch_markets(&settlement, &oracle, &config, owner).await?;
        let now = context::unix_now();

        println!("Portfolio for {owner}\n");
        println!(
            "{:<8} {:>16} {:>16} {:>12} {:>12}",
            "ASSET", "DEPOSITED", "BORROWED", "SUPPLY APY", "BORROW APY"
        );
        for market in &markets {
            if market.position.is_empty() {
                continue;
            }
            let reserve = &market.reserve;
            let indices = extrapolate(&reserve.accrual_inputs(), &reserve.rate_model(), now)?;
            println!(
                "{:<8} {:>16} {:>16} {:>12} {:>12}",
                reserve.symbol,
                from_base_units(market.position.live_deposit(&indices)?, reserve.decimals),
                from_base_units(market.position.live_borrow(&indices)?, reserve.decimals),
                format_ray_percent(indices.supply_rate),
                format_ray_percent(indices.borrow_rate),
            );
        }

        let summary = capacity_summary(
            &markets,
            &CapacityParams {
                now,
                max_quote_age_secs: config.max_quote_age_secs,
                loan_to_value: config.loan_to_value_wad(),
            },
        )?;
        match summary {
            CapacitySummary::Known {
                collateral_value,
                debt_value,
                available,
                ..
            } => {
                println!("\nTotal collateral:    ${}", format_usd(collateral_value));
                println!("Total debt:          ${}", format_usd(debt_value));
                println!("Available to borrow: ${}", format_usd(available));
            }
            CapacitySummary::Unknown(reason) => {
                // Unknown is not zero: borrowing stays disabled until the
                // quotes resolve, but nothing is overstated either way.
                println!("\nAvailable to borrow: unknown ({reason})");
            }
        }
        Ok(())
    }
}

fn format_usd(usd_wad: U256) -> String {
    let cents = usd_wad * U256::from(100u64) / WAD;
    let cents: u128 = cents.try_into().unwrap_or(u128::MAX);
    format!("{}.{:02}", cents / 100, cents % 100)
}
