//! Strike selection and leg building for each spread structure.
//!
//! Candidates are ordered by distance to spot, ties going to the lower strike.
//! Wing strikes must match `short ± wing_width` exactly; only the butterfly's
//! second ATM leg is matched within `butterfly_strike_tolerance`.

use std::collections::HashMap;

use regime_options_core::{
    MultiLegOrder, OptionContractRef, OptionQuote, OptionType, OrderLeg, OrderSide,
    StrategyConfig, StrategyType, TradeError, TradeResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a leg does inside its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegRole {
    ShortCall,
    LongCall,
    ShortPut,
    LongPut,
}

impl LegRole {
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        match self {
            Self::ShortCall | Self::ShortPut => OrderSide::Sell,
            Self::LongCall | Self::LongPut => OrderSide::Buy,
        }
    }
}

/// A chosen contract with its role and order side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedLeg {
    pub role: LegRole,
    pub contract: OptionContractRef,
    pub side: OrderSide,
}

impl SelectedLeg {
    fn new(role: LegRole, contract: &OptionContractRef) -> Self {
        Self {
            role,
            contract: contract.clone(),
            side: role.side(),
        }
    }
}

/// The legs of one structure, in order-submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadPlan {
    pub strategy: StrategyType,
    pub legs: Vec<SelectedLeg>,
}

impl SpreadPlan {
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.legs.iter().map(|leg| leg.contract.symbol.clone()).collect()
    }

    #[must_use]
    pub fn order_legs(&self) -> Vec<OrderLeg> {
        self.legs
            .iter()
            .map(|leg| OrderLeg::new(leg.contract.symbol.clone(), leg.side))
            .collect()
    }

    /// One atomic day market order for `contracts` units of the structure.
    ///
    /// # Errors
    /// [`TradeError::InvalidOrder`] if `contracts` is zero or the legs do not
    /// make up the whole structure.
    pub fn to_order(&self, contracts: u32) -> TradeResult<MultiLegOrder> {
        let expected = self.strategy.leg_count();
        if self.legs.len() != expected {
            return Err(TradeError::InvalidOrder(format!(
                "{} needs {expected} legs, plan has {}",
                self.strategy,
                self.legs.len()
            )));
        }
        MultiLegOrder::new(self.order_legs(), contracts)
    }

    /// Per-share premium to open: positive for a credit, negative for a debit.
    ///
    /// # Errors
    /// [`TradeError::DataUnavailable`] if a needed bid or ask is missing.
    pub fn entry_premium(&self, quotes: &HashMap<String, OptionQuote>) -> TradeResult<Decimal> {
        entry_premium(&self.order_legs(), quotes)
    }
}

/// Sells filled at the bid, buys at the ask.
///
/// # Errors
/// [`TradeError::DataUnavailable`] if a needed bid or ask is missing.
pub fn entry_premium(legs: &[OrderLeg], quotes: &HashMap<String, OptionQuote>) -> TradeResult<Decimal> {
    legs.iter().try_fold(Decimal::ZERO, |total, leg| {
        Ok(match leg.side {
            OrderSide::Sell => total + quote_side(quotes, &leg.symbol, QuoteSide::Bid)?,
            OrderSide::Buy => total - quote_side(quotes, &leg.symbol, QuoteSide::Ask)?,
        })
    })
}

/// Per-share cost to unwind: shorts bought back at the ask, longs sold at the bid.
///
/// # Errors
/// [`TradeError::DataUnavailable`] if a needed bid or ask is missing.
pub fn close_cost(legs: &[OrderLeg], quotes: &HashMap<String, OptionQuote>) -> TradeResult<Decimal> {
    legs.iter().try_fold(Decimal::ZERO, |total, leg| {
        Ok(match leg.side {
            OrderSide::Sell => total + quote_side(quotes, &leg.symbol, QuoteSide::Ask)?,
            OrderSide::Buy => total - quote_side(quotes, &leg.symbol, QuoteSide::Bid)?,
        })
    })
}

#[derive(Debug, Clone, Copy)]
enum QuoteSide {
    Bid,
    Ask,
}

fn quote_side(
    quotes: &HashMap<String, OptionQuote>,
    symbol: &str,
    side: QuoteSide,
) -> TradeResult<Decimal> {
    let quote = quotes
        .get(symbol)
        .ok_or_else(|| TradeError::data_unavailable(format!("no quote for {symbol}")))?;
    let price = match side {
        QuoteSide::Bid => quote.bid,
        QuoteSide::Ask => quote.ask,
    };
    price.ok_or_else(|| TradeError::data_unavailable(format!("no {side:?} for {symbol}")))
}

/// Picks the contracts for each structure from same-day and back-month chains.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    pub wing_width: Decimal,
    pub butterfly_strike_tolerance: Decimal,
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::from_config(&StrategyConfig::default())
    }
}

impl StrategySelector {
    #[must_use]
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            wing_width: config.wing_width,
            butterfly_strike_tolerance: config.butterfly_strike_tolerance,
        }
    }

    /// Builds the plan for `strategy`.
    ///
    /// `front` is the same-day chain; `back` is only read for the diagonal's
    /// long leg.
    ///
    /// # Errors
    /// [`TradeError::NoSuitableContracts`] if a leg is absent from the chain,
    /// [`TradeError::InvalidOrder`] for [`StrategyType::NoTrade`].
    pub fn select(
        &self,
        strategy: StrategyType,
        spot: Decimal,
        front: &[OptionContractRef],
        back: &[OptionContractRef],
    ) -> TradeResult<SpreadPlan> {
        let calls = by_distance(front, OptionType::Call, spot);
        let puts = by_distance(front, OptionType::Put, spot);

        let legs = match strategy {
            StrategyType::IronCondor => {
                let short_call = first_at_or_above(&calls, spot, "short call")?;
                let long_call = at_strike(&calls, short_call.strike_price + self.wing_width, "long call")?;
                let short_put = first_at_or_below(&puts, spot, "short put")?;
                let long_put = at_strike(&puts, short_put.strike_price - self.wing_width, "long put")?;
                vec![
                    SelectedLeg::new(LegRole::ShortCall, short_call),
                    SelectedLeg::new(LegRole::LongCall, long_call),
                    SelectedLeg::new(LegRole::ShortPut, short_put),
                    SelectedLeg::new(LegRole::LongPut, long_put),
                ]
            }
            StrategyType::IronButterfly => {
                let short_call = first_at_or_above(&calls, spot, "ATM call")?;
                let atm = short_call.strike_price;
                let short_put = puts
                    .iter()
                    .copied()
                    .find(|p| (p.strike_price - atm).abs() <= self.butterfly_strike_tolerance)
                    .ok_or_else(|| {
                        TradeError::no_suitable_contracts(format!("no ATM put near strike {atm}"))
                    })?;
                let long_call = at_strike(&calls, atm + self.wing_width, "long call")?;
                let long_put = at_strike(&puts, short_put.strike_price - self.wing_width, "long put")?;
                vec![
                    SelectedLeg::new(LegRole::ShortCall, short_call),
                    SelectedLeg::new(LegRole::LongCall, long_call),
                    SelectedLeg::new(LegRole::ShortPut, short_put),
                    SelectedLeg::new(LegRole::LongPut, long_put),
                ]
            }
            StrategyType::PutCreditSpread => {
                let short_put = first_at_or_below(&puts, spot, "short put")?;
                let long_put = at_strike(&puts, short_put.strike_price - self.wing_width, "long put")?;
                vec![
                    SelectedLeg::new(LegRole::ShortPut, short_put),
                    SelectedLeg::new(LegRole::LongPut, long_put),
                ]
            }
            StrategyType::CallCreditSpread => {
                let short_call = first_at_or_above(&calls, spot, "short call")?;
                let long_call = at_strike(&calls, short_call.strike_price + self.wing_width, "long call")?;
                vec![
                    SelectedLeg::new(LegRole::ShortCall, short_call),
                    SelectedLeg::new(LegRole::LongCall, long_call),
                ]
            }
            StrategyType::Diagonal => {
                let short_call = first_at_or_above(&calls, spot, "0DTE call")?;
                let back_calls = by_distance(back, OptionType::Call, spot);
                let long_call = at_strike(&back_calls, short_call.strike_price, "back-month call")?;
                vec![
                    SelectedLeg::new(LegRole::LongCall, long_call),
                    SelectedLeg::new(LegRole::ShortCall, short_call),
                ]
            }
            StrategyType::NoTrade => {
                return Err(TradeError::InvalidOrder("NO_TRADE has no legs".to_string()));
            }
        };

        let plan = SpreadPlan { strategy, legs };
        debug!(
            strategy = %strategy,
            spot = %spot,
            legs = ?plan.legs.iter().map(|l| l.contract.display_name()).collect::<Vec<_>>(),
            "Legs selected"
        );
        Ok(plan)
    }
}

/// Contracts of `option_type`, sorted by strike then stably by distance to spot.
fn by_distance(
    chain: &[OptionContractRef],
    option_type: OptionType,
    spot: Decimal,
) -> Vec<&OptionContractRef> {
    let mut candidates: Vec<_> = chain.iter().filter(|c| c.option_type == option_type).collect();
    candidates.sort_by(|a, b| a.strike_price.cmp(&b.strike_price));
    candidates.sort_by_key(|c| (c.strike_price - spot).abs());
    candidates
}

fn first_at_or_above<'a>(
    candidates: &[&'a OptionContractRef],
    spot: Decimal,
    what: &str,
) -> TradeResult<&'a OptionContractRef> {
    candidates
        .iter()
        .copied()
        .find(|c| c.strike_price >= spot)
        .ok_or_else(|| TradeError::no_suitable_contracts(format!("no {what} at or above {spot}")))
}

fn first_at_or_below<'a>(
    candidates: &[&'a OptionContractRef],
    spot: Decimal,
    what: &str,
) -> TradeResult<&'a OptionContractRef> {
    candidates
        .iter()
        .copied()
        .find(|c| c.strike_price <= spot)
        .ok_or_else(|| TradeError::no_suitable_contracts(format!("no {what} at or below {spot}")))
}

fn at_strike<'a>(
    candidates: &[&'a OptionContractRef],
    strike: Decimal,
    what: &str,
) -> TradeResult<&'a OptionContractRef> {
    candidates
        .iter()
        .copied()
        .find(|c| c.strike_price == strike)
        .ok_or_else(|| TradeError::no_suitable_contracts(format!("no {what} at strike {strike}")))
}
