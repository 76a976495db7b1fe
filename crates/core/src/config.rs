use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::kelly::KellyParams;
use crate::types::PerStrategy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    pub schedule: ScheduleConfig,
    pub risk: RiskConfig,
    pub exits: ExitConfig,
    pub ledger: LedgerConfig,
    pub alpaca: AlpacaSettings,
}

/// Regime inputs and structure geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub underlying: String,
    pub vix_symbol: String,
    pub low_vol_threshold: f64,
    pub high_vol_threshold: f64,
    /// Daily return at which trading stops for the day (0.005 = 0.5%).
    pub target_daily_return: Decimal,
    pub wing_width: Decimal,
    /// Strike tolerance when pairing the butterfly's ATM put with its ATM call.
    pub butterfly_strike_tolerance: Decimal,
    pub diagonal_back_month_days: i64,
    pub vix_history_days: u32,
    pub momentum_lookback_days: i64,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    /// Magnitude of the momentum signal emitted on an RSI extreme.
    pub momentum_signal: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            underlying: "SPY".to_string(),
            vix_symbol: "^VIX".to_string(),
            low_vol_threshold: 17.0,
            high_vol_threshold: 18.0,
            target_daily_return: Decimal::new(5, 3),
            wing_width: Decimal::from(5),
            butterfly_strike_tolerance: Decimal::new(5, 2),
            diagonal_back_month_days: 7,
            vix_history_days: 5,
            momentum_lookback_days: 5,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            momentum_signal: 0.6,
        }
    }
}

/// Loop cadence and exchange session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub active_interval_secs: u64,
    pub closed_interval_secs: u64,
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
    pub timezone: Tz,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            active_interval_secs: 300,
            closed_interval_secs: 600,
            market_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            market_close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            timezone: chrono_tz::US::Eastern,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub max_trades_per_day: u32,
    pub max_daily_loss: Decimal,
    pub kelly: KellyParams,
    pub min_contracts: u32,
    pub max_contracts: u32,
    /// Scales the risk budget for each structure's relative margin needs.
    pub strategy_multipliers: PerStrategy<Decimal>,
    /// Estimated dollar risk of one contract of each structure, used for sizing.
    pub max_risk_per_contract: PerStrategy<Decimal>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_trades_per_day: 3,
            max_daily_loss: Decimal::new(3, 2),
            kelly: KellyParams::default(),
            min_contracts: 1,
            max_contracts: 10,
            strategy_multipliers: PerStrategy {
                iron_condor: Decimal::ONE,
                iron_butterfly: Decimal::new(12, 1),
                put_credit_spread: Decimal::new(8, 1),
                call_credit_spread: Decimal::new(8, 1),
                diagonal: Decimal::new(6, 1),
            },
            max_risk_per_contract: PerStrategy {
                iron_condor: Decimal::from(450),
                iron_butterfly: Decimal::from(220),
                put_credit_spread: Decimal::from(270),
                call_credit_spread: Decimal::from(270),
                diagonal: Decimal::from(150),
            },
        }
    }
}

/// Per-structure exit thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Fraction of max profit at which the position is taken off.
    pub profit_targets: PerStrategy<Decimal>,
    /// Multiple of entry credit lost at which the position is stopped out.
    pub stop_multiples: PerStrategy<Decimal>,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            profit_targets: PerStrategy {
                iron_condor: Decimal::new(5, 1),
                iron_butterfly: Decimal::new(6, 1),
                put_credit_spread: Decimal::new(4, 1),
                call_credit_spread: Decimal::new(4, 1),
                diagonal: Decimal::new(3, 1),
            },
            stop_multiples: PerStrategy {
                iron_condor: Decimal::from(2),
                iron_butterfly: Decimal::new(25, 1),
                put_credit_spread: Decimal::from(2),
                call_credit_spread: Decimal::from(2),
                diagonal: Decimal::new(15, 1),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: "logs/positions.json".to_string(),
        }
    }
}

/// Non-secret Alpaca connection settings. Keys come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlpacaSettings {
    pub paper: bool,
    pub trading_url: Option<String>,
    pub data_url: Option<String>,
    pub vix_url: Option<String>,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

impl Default for AlpacaSettings {
    fn default() -> Self {
        Self {
            paper: true,
            trading_url: None,
            data_url: None,
            vix_url: None,
            requests_per_minute: 180,
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_the_reference_parameters() {
        let config = AppConfig::default();
        assert_eq!(config.strategy.underlying, "SPY");
        assert!((config.strategy.low_vol_threshold - 17.0).abs() < f64::EPSILON);
        assert!((config.strategy.high_vol_threshold - 18.0).abs() < f64::EPSILON);
        assert_eq!(config.strategy.wing_width, dec!(5));
        assert_eq!(config.strategy.target_daily_return, dec!(0.005));
        assert_eq!(config.risk.max_trades_per_day, 3);
        assert_eq!(config.risk.max_daily_loss, dec!(0.03));
        assert_eq!(config.risk.strategy_multipliers.iron_butterfly, dec!(1.2));
        assert_eq!(config.exits.stop_multiples.iron_butterfly, dec!(2.5));
        assert_eq!(config.schedule.active_interval_secs, 300);
        assert_eq!(config.schedule.timezone, chrono_tz::US::Eastern);
        assert_eq!(
            config.schedule.market_open,
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
    }
}
