//! Offline regime classification.

use clap::Args;
use regime_options_core::{AppConfig, StrategyType};
use regime_options_manager::RegimeClassifier;

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Latest VIX close
    #[arg(long)]
    pub vix_now: Option<f64>,

    /// Previous VIX close
    #[arg(long)]
    pub vix_prev: Option<f64>,

    /// Momentum signal (-0.6, 0 or 0.6 from RSI)
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub momentum: f64,
}

pub fn classify(config: &AppConfig, args: &ClassifyArgs) -> StrategyType {
    RegimeClassifier::from_config(&config.strategy).classify_values(
        args.vix_now,
        args.vix_prev,
        args.momentum,
    )
}

pub fn run_classify(config: &AppConfig, args: &ClassifyArgs) {
    println!("{}", classify(config, args));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(now: Option<f64>, prev: Option<f64>, momentum: f64) -> ClassifyArgs {
        ClassifyArgs {
            vix_now: now,
            vix_prev: prev,
            momentum,
        }
    }

    #[test]
    fn uses_configured_thresholds() {
        let mut config = AppConfig::default();
        assert_eq!(
            classify(&config, &args(Some(19.0), Some(18.0), 0.0)),
            StrategyType::IronCondor
        );
        config.strategy.high_vol_threshold = 20.0;
        assert_eq!(
            classify(&config, &args(Some(19.0), Some(18.0), 0.0)),
            StrategyType::IronButterfly
        );
    }

    #[test]
    fn missing_value_is_no_trade() {
        let config = AppConfig::default();
        assert_eq!(
            classify(&config, &args(Some(16.0), None, 0.0)),
            StrategyType::NoTrade
        );
    }
}
