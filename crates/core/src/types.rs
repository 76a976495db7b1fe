//! Domain types shared by the gateway, the feed and the options manager.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{TradeError, TradeResult};

/// Option structure selected for a regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    IronCondor,
    IronButterfly,
    PutCreditSpread,
    CallCreditSpread,
    Diagonal,
    NoTrade,
}

impl StrategyType {
    /// Every structure that produces an order.
    pub const TRADEABLE: [StrategyType; 5] = [
        Self::IronCondor,
        Self::IronButterfly,
        Self::PutCreditSpread,
        Self::CallCreditSpread,
        Self::Diagonal,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IronCondor => "IRON_CONDOR",
            Self::IronButterfly => "IRON_BUTTERFLY",
            Self::PutCreditSpread => "PUT_CREDIT_SPREAD",
            Self::CallCreditSpread => "CALL_CREDIT_SPREAD",
            Self::Diagonal => "DIAGONAL",
            Self::NoTrade => "NO_TRADE",
        }
    }

    #[must_use]
    pub const fn is_tradeable(&self) -> bool {
        !matches!(self, Self::NoTrade)
    }

    /// Number of legs in the structure's multi-leg order.
    #[must_use]
    pub const fn leg_count(&self) -> usize {
        match self {
            Self::IronCondor | Self::IronButterfly => 4,
            Self::PutCreditSpread | Self::CallCreditSpread | Self::Diagonal => 2,
            Self::NoTrade => 0,
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IRON_CONDOR" => Ok(Self::IronCondor),
            "IRON_BUTTERFLY" => Ok(Self::IronButterfly),
            "PUT_CREDIT_SPREAD" => Ok(Self::PutCreditSpread),
            "CALL_CREDIT_SPREAD" => Ok(Self::CallCreditSpread),
            "DIAGONAL" => Ok(Self::Diagonal),
            "NO_TRADE" => Ok(Self::NoTrade),
            other => Err(TradeError::UnknownStrategyType(other.to_string())),
        }
    }
}

/// One value per tradeable strategy type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerStrategy<T> {
    pub iron_condor: T,
    pub iron_butterfly: T,
    pub put_credit_spread: T,
    pub call_credit_spread: T,
    pub diagonal: T,
}

impl<T> PerStrategy<T> {
    /// Value for `strategy`; `None` for [`StrategyType::NoTrade`].
    #[must_use]
    pub fn get(&self, strategy: StrategyType) -> Option<&T> {
        match strategy {
            StrategyType::IronCondor => Some(&self.iron_condor),
            StrategyType::IronButterfly => Some(&self.iron_butterfly),
            StrategyType::PutCreditSpread => Some(&self.put_credit_spread),
            StrategyType::CallCreditSpread => Some(&self.call_credit_spread),
            StrategyType::Diagonal => Some(&self.diagonal),
            StrategyType::NoTrade => None,
        }
    }
}

/// Option contract right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Single-letter code used in OCC symbols.
    #[must_use]
    pub const fn code(&self) -> char {
        match self {
            Self::Call => 'C',
            Self::Put => 'P',
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// A listed option contract as returned by the brokerage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContractRef {
    pub symbol: String,
    pub underlying: String,
    pub strike_price: Decimal,
    pub option_type: OptionType,
    pub expiration_date: NaiveDate,
}

impl OptionContractRef {
    /// Human-readable description (e.g., "SPY 415 call 2026-10-17").
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {} {} {}",
            self.underlying, self.strike_price, self.option_type, self.expiration_date
        )
    }
}

/// Latest top-of-book quote for an option. Either side may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub symbol: String,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    #[default]
    Day,
}

/// One constituent of a multi-leg order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLeg {
    pub symbol: String,
    pub side: OrderSide,
    pub ratio_qty: u32,
}

impl OrderLeg {
    #[must_use]
    pub fn new(symbol: impl Into<String>, side: OrderSide) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            ratio_qty: 1,
        }
    }
}

/// A 2- or 4-leg market order submitted atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLegOrder {
    legs: Vec<OrderLeg>,
    qty: u32,
    time_in_force: TimeInForce,
}

impl MultiLegOrder {
    /// Builds a day market order.
    ///
    /// # Errors
    /// Returns [`TradeError::InvalidOrder`] unless there are 2 or 4 legs, every
    /// ratio is at least 1 and `qty` is positive.
    pub fn new(legs: Vec<OrderLeg>, qty: u32) -> TradeResult<Self> {
        if legs.len() != 2 && legs.len() != 4 {
            return Err(TradeError::InvalidOrder(format!(
                "multi-leg order needs 2 or 4 legs, got {}",
                legs.len()
            )));
        }
        if legs.iter().any(|leg| leg.ratio_qty == 0) {
            return Err(TradeError::InvalidOrder("leg ratio must be at least 1".to_string()));
        }
        if qty == 0 {
            return Err(TradeError::InvalidOrder("order quantity must be positive".to_string()));
        }
        Ok(Self {
            legs,
            qty,
            time_in_force: TimeInForce::Day,
        })
    }

    #[must_use]
    pub fn legs(&self) -> &[OrderLeg] {
        &self.legs
    }

    #[must_use]
    pub const fn qty(&self) -> u32 {
        self.qty
    }

    #[must_use]
    pub const fn time_in_force(&self) -> TimeInForce {
        self.time_in_force
    }

    /// The same structure with every side flipped, used to unwind a position.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            legs: self
                .legs
                .iter()
                .map(|leg| OrderLeg {
                    symbol: leg.symbol.clone(),
                    side: leg.side.opposite(),
                    ratio_qty: leg.ratio_qty,
                })
                .collect(),
            qty: self.qty,
            time_in_force: self.time_in_force,
        }
    }
}

/// A plain single-contract market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleLegOrder {
    pub symbol: String,
    pub side: OrderSide,
    pub qty: u32,
    pub time_in_force: TimeInForce,
}

/// Anything the brokerage accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderRequest {
    MultiLeg(MultiLegOrder),
    SingleLeg(SingleLegOrder),
}

/// Brokerage acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub portfolio_value: Decimal,
}

/// A position as the brokerage reports it (one per contract symbol).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: String,
    /// Signed quantity, negative when short.
    pub qty: Decimal,
    pub market_value: Option<Decimal>,
}

/// A historical price bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    Minute,
    Hour,
    Day,
}

impl Timeframe {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "1Min",
            Self::Hour => "1Hour",
            Self::Day => "1Day",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_type_round_trips_through_its_wire_name() {
        for strategy in StrategyType::TRADEABLE {
            assert_eq!(strategy.as_str().parse::<StrategyType>().unwrap(), strategy);
        }
        let json = serde_json::to_string(&StrategyType::PutCreditSpread).unwrap();
        assert_eq!(json, "\"PUT_CREDIT_SPREAD\"");
    }

    #[test]
    fn unknown_strategy_name_is_rejected() {
        let err = "STRADDLE".parse::<StrategyType>().unwrap_err();
        assert!(matches!(err, TradeError::UnknownStrategyType(ref s) if s == "STRADDLE"));
        assert!(err.is_fatal());
    }

    #[test]
    fn per_strategy_has_nothing_for_no_trade() {
        let table = PerStrategy {
            iron_condor: 1,
            iron_butterfly: 2,
            put_credit_spread: 3,
            call_credit_spread: 4,
            diagonal: 5,
        };
        assert_eq!(table.get(StrategyType::IronButterfly), Some(&2));
        assert_eq!(table.get(StrategyType::Diagonal), Some(&5));
        assert_eq!(table.get(StrategyType::NoTrade), None);
    }

    #[test]
    fn multi_leg_order_rejects_odd_leg_counts() {
        let legs = vec![
            OrderLeg::new("A", OrderSide::Sell),
            OrderLeg::new("B", OrderSide::Buy),
            OrderLeg::new("C", OrderSide::Sell),
        ];
        assert!(matches!(
            MultiLegOrder::new(legs, 1),
            Err(TradeError::InvalidOrder(_))
        ));
    }

    #[test]
    fn multi_leg_order_rejects_zero_quantity() {
        let legs = vec![
            OrderLeg::new("A", OrderSide::Sell),
            OrderLeg::new("B", OrderSide::Buy),
        ];
        assert!(MultiLegOrder::new(legs, 0).is_err());
    }

    #[test]
    fn reversed_order_flips_every_side() {
        let order = MultiLegOrder::new(
            vec![
                OrderLeg::new("SC", OrderSide::Sell),
                OrderLeg::new("LC", OrderSide::Buy),
            ],
            3,
        )
        .unwrap();
        let closing = order.reversed();
        assert_eq!(closing.qty(), 3);
        assert_eq!(closing.legs()[0].side, OrderSide::Buy);
        assert_eq!(closing.legs()[1].side, OrderSide::Sell);
        assert_eq!(closing.legs()[0].symbol, "SC");
    }
}
