//! Offline position sizing.

use clap::Args;
use regime_options_core::{AppConfig, StrategyType};
use regime_options_manager::RiskManager;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub struct SizeArgs {
    /// Portfolio value in dollars
    #[arg(long)]
    pub portfolio: Decimal,

    /// Structure, e.g. IRON_CONDOR
    #[arg(long)]
    pub strategy: StrategyType,

    /// Dollar risk of one contract (defaults to the configured estimate)
    #[arg(long)]
    pub max_risk: Option<Decimal>,
}

pub fn size(config: &AppConfig, args: &SizeArgs) -> u32 {
    let risk = RiskManager::new(config.risk.clone());
    match args.max_risk {
        Some(max_risk) => risk.calculate_position_size(args.portfolio, args.strategy, max_risk),
        None => risk.contracts_for(args.portfolio, args.strategy),
    }
}

pub fn run_size(config: &AppConfig, args: &SizeArgs) {
    let fraction = config.risk.kelly.risk_fraction();
    println!("Risk fraction: {fraction}");
    println!("Contracts: {}", size(config, args));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_risk_table() {
        let args = SizeArgs {
            portfolio: dec!(100000),
            strategy: StrategyType::IronCondor,
            max_risk: None,
        };
        assert_eq!(size(&AppConfig::default(), &args), 4);
    }

    #[test]
    fn explicit_max_risk() {
        let args = SizeArgs {
            portfolio: dec!(100000),
            strategy: StrategyType::IronCondor,
            max_risk: Some(dec!(1000)),
        };
        assert_eq!(size(&AppConfig::default(), &args), 2);
    }
}
