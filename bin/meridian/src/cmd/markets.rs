use alloy::primitives::Address;
use clap::Args;
use meridian_math::{extrapolate, format_ray_percent, from_base_units, scaled_to_value};

use crate::{context, opts::GlobalArgs};

#[derive(Args, Debug)]
pub struct MarketsArgs {}

impl MarketsArgs {
    pub async fn run(self, global: &GlobalArgs) -> eyre::Result<()> {
        let config = context::load_config(global)?;
        let provider = context::connect_read_only(&config).await?;
        let settlement = context::settlement(provider.clone(), &config, Address::ZERO);
        context::check_ray(&settlement).await?;
        let oracle = context::oracle(provider, &config)?;
        let markets =
            context::fetch_markets(&settlement, &oracle, &config, Address::ZERO).await?;
        let now = context::unix_now();

        println!(
            "{:<8} {:>14} {:>14} {:>12} {:>12} {:>12} {:>8}",
            "ASSET", "DEPOSITS", "BORROWS", "UTILIZATION", "SUPPLY APY", "BORROW APY", "ACTIVE"
        );
        for market in &markets {
            let reserve = &market.reserve;
            let indices = extrapolate(&reserve.accrual_inputs(), &reserve.rate_model(), now)?;
            let deposits =
                scaled_to_value(reserve.total_scaled_supply, indices.liquidity_index)?;
            let borrows = scaled_to_value(reserve.total_borrows_scaled, indices.borrow_index)?;

            println!(
                "{:<8} {:>14} {:>14} {:>12} {:>12} {:>12} {:>8}",
                reserve.symbol,
                from_base_units(deposits, reserve.decimals),
                from_base_units(borrows, reserve.decimals),
                format_wad_percent(indices.utilization),
                format_ray_percent(indices.supply_rate),
                format_ray_percent(indices.borrow_rate),
                if reserve.is_active { "yes" } else { "no" },
            );
        }
        Ok(())
    }
}

fn format_wad_percent(fraction: alloy::primitives::U256) -> String {
    let bps = fraction * alloy::primitives::U256::from(10_000u64) / meridian_math::WAD;
    let bps: u128 = bps.try_into().unwrap_or(u128::MAX);
    format!("{}.{:02}%", bps / 100, bps % 100)
}
