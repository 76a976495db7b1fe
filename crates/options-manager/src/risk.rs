//! Daily trade gate and fractional-Kelly position sizing.

use chrono::NaiveDate;
use regime_options_core::{RiskConfig, StrategyType};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Per-day counters, reset when the trading date changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub trading_day: Option<NaiveDate>,
    /// Portfolio value minus the day's first observed value.
    pub daily_pnl: Decimal,
    pub trades_today: u32,
    pub day_start_value: Option<Decimal>,
    /// Latched once the daily return target is hit.
    pub target_reached: bool,
}

/// Owns the daily [`RiskState`] and applies the configured limits to it.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    state: RiskState,
}

impl RiskManager {
    #[must_use]
    pub fn new(config: RiskConfig) -> Self {
        Self {
            config,
            state: RiskState::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Clears the daily counters for `day`.
    pub fn reset_daily(&mut self, day: NaiveDate) {
        info!(%day, previous = ?self.state.trading_day, "Resetting daily risk counters");
        self.state = RiskState {
            trading_day: Some(day),
            ..RiskState::default()
        };
    }

    /// Records the current portfolio value: the first observation of the day
    /// becomes the start value, and the daily P&L is measured against it.
    /// Returns the daily return (zero while the start value is not positive).
    pub fn observe_portfolio(&mut self, portfolio_value: Decimal) -> Decimal {
        let start = *self.state.day_start_value.get_or_insert(portfolio_value);
        self.state.daily_pnl = portfolio_value - start;
        if start > Decimal::ZERO {
            self.state.daily_pnl / start
        } else {
            Decimal::ZERO
        }
    }

    pub fn set_daily_pnl(&mut self, daily_pnl: Decimal) {
        self.state.daily_pnl = daily_pnl;
    }

    /// True once `daily_return` has reached `target`; stays true until the reset.
    pub fn check_daily_target(&mut self, daily_return: Decimal, target: Decimal) -> bool {
        if !self.state.target_reached && daily_return >= target {
            info!(daily_return = %daily_return, target = %target, "Daily target reached");
            self.state.target_reached = true;
        }
        self.state.target_reached
    }

    /// Whether a new trade is allowed. Read-only; callers record trades themselves.
    #[must_use]
    pub fn can_trade(&self, portfolio_value: Decimal) -> bool {
        if self.state.trades_today >= self.config.max_trades_per_day {
            info!(
                trades_today = self.state.trades_today,
                max = self.config.max_trades_per_day,
                "Max trades per day hit"
            );
            return false;
        }
        let loss_limit = -self.config.max_daily_loss * portfolio_value;
        if self.state.daily_pnl <= loss_limit {
            info!(
                daily_pnl = %self.state.daily_pnl,
                limit = %loss_limit,
                "Max daily loss hit"
            );
            return false;
        }
        true
    }

    pub fn record_trade(&mut self) {
        self.state.trades_today += 1;
        debug!(trades_today = self.state.trades_today, "Trade recorded");
    }

    /// Contract count for `strategy` using the configured per-contract risk estimate.
    #[must_use]
    pub fn contracts_for(&self, portfolio_value: Decimal, strategy: StrategyType) -> u32 {
        let max_risk = self
            .config
            .max_risk_per_contract
            .get(strategy)
            .copied()
            .unwrap_or(Decimal::ZERO);
        self.calculate_position_size(portfolio_value, strategy, max_risk)
    }

    /// `floor(portfolio × risk fraction × strategy multiplier / max_risk_per_contract)`,
    /// clamped to `[min_contracts, max_contracts]`.
    ///
    /// The clamp can size above the budget: a quotient below one still buys
    /// `min_contracts`.
    #[must_use]
    pub fn calculate_position_size(
        &self,
        portfolio_value: Decimal,
        strategy: StrategyType,
        max_risk_per_contract: Decimal,
    ) -> u32 {
        let floor = self.config.min_contracts.max(1);
        let ceiling = self.config.max_contracts.max(floor);

        let Some(multiplier) = self.config.strategy_multipliers.get(strategy) else {
            return floor;
        };
        if max_risk_per_contract <= Decimal::ZERO {
            return floor;
        }

        let budget = portfolio_value * self.config.kelly.risk_fraction() * multiplier;
        let raw = (budget / max_risk_per_contract).floor();
        let contracts = if raw <= Decimal::ZERO {
            0
        } else {
            raw.to_u32().unwrap_or(u32::MAX)
        };

        let sized = contracts.clamp(floor, ceiling);
        debug!(
            strategy = %strategy,
            budget = %budget,
            max_risk_per_contract = %max_risk_per_contract,
            raw = %raw,
            contracts = sized,
            "Position sized"
        );
        sized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn manager() -> RiskManager {
        RiskManager::new(RiskConfig::default())
    }

    // ==================== Gate ====================

    #[test]
    fn fresh_day_can_trade() {
        assert!(manager().can_trade(dec!(100000)));
    }

    #[test]
    fn trade_count_limit_closes_gate() {
        let mut risk = manager();
        for _ in 0..3 {
            assert!(risk.can_trade(dec!(100000)));
            risk.record_trade();
        }
        assert!(!risk.can_trade(dec!(100000)));
    }

    #[test]
    fn daily_loss_beyond_limit_closes_gate() {
        let mut risk = manager();
        // -3.1% against a 3% limit
        risk.set_daily_pnl(dec!(-3100));
        assert!(!risk.can_trade(dec!(100000)));
    }

    #[test]
    fn daily_loss_exactly_at_limit_closes_gate() {
        let mut risk = manager();
        risk.set_daily_pnl(dec!(-3000));
        assert!(!risk.can_trade(dec!(100000)));
        risk.set_daily_pnl(dec!(-2999.99));
        assert!(risk.can_trade(dec!(100000)));
    }

    #[test]
    fn reset_clears_counters() {
        let mut risk = manager();
        risk.record_trade();
        risk.set_daily_pnl(dec!(-5000));
        risk.check_daily_target(dec!(0.01), dec!(0.005));
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        risk.reset_daily(day);
        assert_eq!(risk.state().trades_today, 0);
        assert_eq!(risk.state().daily_pnl, Decimal::ZERO);
        assert_eq!(risk.state().day_start_value, None);
        assert!(!risk.state().target_reached);
        assert_eq!(risk.state().trading_day, Some(day));
    }

    // ==================== Daily P&L ====================

    #[test]
    fn first_observation_sets_day_start() {
        let mut risk = manager();
        assert_eq!(risk.observe_portfolio(dec!(100000)), Decimal::ZERO);
        let ret = risk.observe_portfolio(dec!(100600));
        assert_eq!(risk.state().day_start_value, Some(dec!(100000)));
        assert_eq!(risk.state().daily_pnl, dec!(600));
        assert_eq!(ret, dec!(0.006));
    }

    #[test]
    fn daily_target_latches() {
        let mut risk = manager();
        assert!(!risk.check_daily_target(dec!(0.004), dec!(0.005)));
        assert!(risk.check_daily_target(dec!(0.005), dec!(0.005)));
        // a later pullback does not reopen the day
        assert!(risk.check_daily_target(dec!(0.001), dec!(0.005)));
    }

    // ==================== Sizing ====================

    #[test]
    fn sizing_uses_capped_kelly_and_multiplier() {
        let risk = manager();
        // 100k * 0.02 * 1.0 = 2000 budget; / 450 = 4.44 -> 4
        assert_eq!(
            risk.calculate_position_size(dec!(100000), StrategyType::IronCondor, dec!(450)),
            4
        );
        // butterfly: 2000 * 1.2 = 2400; / 220 = 10.9 -> clamped to 10
        assert_eq!(
            risk.calculate_position_size(dec!(100000), StrategyType::IronButterfly, dec!(220)),
            10
        );
        // diagonal: 2000 * 0.6 = 1200; / 150 = 8
        assert_eq!(risk.contracts_for(dec!(100000), StrategyType::Diagonal), 8);
    }

    #[test]
    fn sizing_never_below_one() {
        let risk = manager();
        // 10k * 0.02 * 0.8 = 160 budget < 270 risk: floor is 0, clamped to 1
        assert_eq!(
            risk.calculate_position_size(dec!(10000), StrategyType::PutCreditSpread, dec!(270)),
            1
        );
        assert_eq!(
            risk.calculate_position_size(dec!(100000), StrategyType::IronCondor, Decimal::ZERO),
            1
        );
        assert_eq!(
            risk.calculate_position_size(dec!(100000), StrategyType::NoTrade, dec!(100)),
            1
        );
    }

    #[test]
    fn sizing_stays_within_clamp_for_many_inputs() {
        let risk = manager();
        for pv in [dec!(1), dec!(500), dec!(25000), dec!(1000000), dec!(1000000000)] {
            for max_risk in [dec!(0.01), dec!(1), dec!(150), dec!(450), dec!(100000)] {
                for strategy in StrategyType::TRADEABLE {
                    let n = risk.calculate_position_size(pv, strategy, max_risk);
                    assert!((1..=10).contains(&n), "{pv} {max_risk} {strategy} -> {n}");
                }
            }
        }
    }
}
