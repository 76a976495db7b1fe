//! Types for regime detection and spread position management.

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regime_options_core::{parse_occ_symbol, OrderLeg, StrategyType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Contract multiplier for equity options.
pub const CONTRACT_MULTIPLIER: i64 = 100;

/// Market inputs gathered at the start of a cycle. Any field may be missing
/// when the feed could not supply it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub current_vix: Option<f64>,
    pub previous_vix: Option<f64>,
    pub spot_price: Option<Decimal>,
    /// RSI-derived signal: -0.6 overbought, 0.6 oversold, 0 otherwise.
    pub momentum: f64,
}

/// The regime chosen for a cycle and the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeDecision {
    pub strategy: StrategyType,
    pub snapshot: MarketSnapshot,
}

/// An open spread recorded in the ledger.
///
/// Money fields are dollars for the whole position (per-share premium × 100 ×
/// contracts). `entry_value` is signed: positive when the spread was opened for
/// a credit, negative for a debit. `entry_credit` and `max_profit` hold the
/// premium magnitude so that exit thresholds scale correctly for debit spreads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: String,
    pub strategy_type: StrategyType,
    pub underlying: String,
    pub entry_time: DateTime<Utc>,
    pub contracts: u32,
    pub entry_credit: Decimal,
    pub max_profit: Decimal,
    pub max_risk: Decimal,
    pub entry_value: Decimal,
    pub current_value: Option<Decimal>,
    pub current_pnl: Option<Decimal>,
    pub last_check: Option<DateTime<Utc>>,
    /// Entry order legs; closing submits the same legs with sides flipped.
    pub legs: Vec<OrderLeg>,
    pub order_id: String,
}

impl Position {
    /// `{STRATEGY}_{YYYYMMDD_HHMMSS}` from the entry time, in whatever zone
    /// `entry_time` carries. The loop passes exchange time.
    #[must_use]
    pub fn make_id<Tz>(strategy: StrategyType, entry_time: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format!("{}_{}", strategy, entry_time.format("%Y%m%d_%H%M%S"))
    }

    /// Latest expiration across the legs. `None` when a leg is not an OCC
    /// option symbol or there are no legs.
    #[must_use]
    pub fn last_expiration(&self) -> Option<NaiveDate> {
        self.legs
            .iter()
            .map(|leg| parse_occ_symbol(&leg.symbol).ok().map(|occ| occ.expiration))
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .max()
    }

    /// Whether `symbol` is one of this position's legs.
    #[must_use]
    pub fn owns_symbol(&self, symbol: &str) -> bool {
        self.legs.iter().any(|leg| leg.symbol == symbol)
    }
}

/// Partial update merged into a [`Position`]. `None` fields are left as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionUpdate {
    pub current_value: Option<Decimal>,
    pub current_pnl: Option<Decimal>,
    pub last_check: Option<DateTime<Utc>>,
}

impl PositionUpdate {
    pub(crate) fn apply(&self, position: &mut Position) {
        if let Some(value) = self.current_value {
            position.current_value = Some(value);
        }
        if let Some(pnl) = self.current_pnl {
            position.current_pnl = Some(pnl);
        }
        if let Some(at) = self.last_check {
            position.last_check = Some(at);
        }
    }
}

/// Reason for closing a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    ProfitTarget,
    StopLoss,
    /// Every leg expired before the current trading date.
    Expired,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProfitTarget => write!(f, "profit_target"),
            Self::StopLoss => write!(f, "stop_loss"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regime_options_core::{OrderSide, ScheduleConfig};
    use rust_decimal_macros::dec;

    #[test]
    fn position_id_uses_strategy_and_entry_time() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 14, 5, 9).unwrap();
        assert_eq!(
            Position::make_id(StrategyType::IronCondor, &at),
            "IRON_CONDOR_20261016_140509"
        );
    }

    #[test]
    fn position_id_in_exchange_time_keeps_the_trading_date() {
        // 01:30 UTC Saturday is still Friday evening in New York
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 1, 30, 0).unwrap();
        let exchange = ScheduleConfig::default().timezone;
        assert_eq!(
            Position::make_id(StrategyType::Diagonal, &at.with_timezone(&exchange)),
            "DIAGONAL_20261016_213000"
        );
    }

    fn with_legs(symbols: &[&str]) -> Position {
        Position {
            position_id: "P".to_string(),
            strategy_type: StrategyType::Diagonal,
            underlying: "SPY".to_string(),
            entry_time: Utc::now(),
            contracts: 1,
            entry_credit: dec!(185),
            max_profit: dec!(185),
            max_risk: dec!(185),
            entry_value: dec!(-185),
            current_value: None,
            current_pnl: None,
            last_check: None,
            legs: symbols
                .iter()
                .map(|s| OrderLeg::new(*s, OrderSide::Buy))
                .collect(),
            order_id: "o-1".to_string(),
        }
    }

    #[test]
    fn last_expiration_is_the_latest_leg() {
        let position = with_legs(&["SPY261023C00412000", "SPY261016C00412000"]);
        assert_eq!(
            position.last_expiration(),
            NaiveDate::from_ymd_opt(2026, 10, 23)
        );
    }

    #[test]
    fn last_expiration_needs_every_leg_parsed() {
        assert_eq!(with_legs(&["SPY261016C00412000", "SPY"]).last_expiration(), None);
        assert_eq!(with_legs(&[]).last_expiration(), None);
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut position = Position {
            position_id: "P".to_string(),
            strategy_type: StrategyType::PutCreditSpread,
            underlying: "SPY".to_string(),
            entry_time: Utc::now(),
            contracts: 1,
            entry_credit: dec!(80),
            max_profit: dec!(80),
            max_risk: dec!(420),
            entry_value: dec!(80),
            current_value: Some(dec!(50)),
            current_pnl: None,
            last_check: None,
            legs: vec![OrderLeg::new("A", OrderSide::Sell)],
            order_id: "o-1".to_string(),
        };
        PositionUpdate {
            current_pnl: Some(dec!(30)),
            ..PositionUpdate::default()
        }
        .apply(&mut position);
        assert_eq!(position.current_value, Some(dec!(50)));
        assert_eq!(position.current_pnl, Some(dec!(30)));
        assert!(position.owns_symbol("A"));
        assert!(!position.owns_symbol("B"));
    }
}
