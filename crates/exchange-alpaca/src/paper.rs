//! In-memory paper broker.
//!
//! Serves synthetic option chains and quotes around a configurable spot price,
//! scripted VIX and hourly bar history, and records every submitted order
//! without touching Alpaca. Clones share state, so one instance can act as
//! both the brokerage gateway and the market data feed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use regime_options_core::{
    occ_symbol, parse_occ_symbol, AccountSnapshot, BrokerPosition, BrokerageGateway,
    MarketDataFeed, OptionContractRef, OptionQuote, OptionType, OrderAck, OrderRequest, OrderSide,
    PriceBar, Timeframe, TradeError, TradeResult,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

/// Strikes listed either side of the spot in a synthetic chain.
const SYNTHETIC_STRIKE_RANGE: i64 = 20;

#[derive(Debug)]
struct PaperState {
    underlying: String,
    as_of: NaiveDate,
    spot: Option<Decimal>,
    portfolio_value: Decimal,
    account_error: Option<TradeError>,
    chains: BTreeMap<NaiveDate, Vec<OptionContractRef>>,
    quote_overrides: HashMap<String, OptionQuote>,
    vix_history: Vec<f64>,
    vix_unavailable: bool,
    hourly_closes: Vec<Decimal>,
    reject_orders: bool,
    orders: Vec<OrderRequest>,
    positions: BTreeMap<String, Decimal>,
    next_order_id: u64,
}

/// Simulated brokerage and market data.
#[derive(Debug, Clone)]
pub struct PaperBroker {
    state: Arc<Mutex<PaperState>>,
}

impl PaperBroker {
    /// A broker for `underlying` trading at `spot` on `as_of`, with a
    /// $100,000 account and flat VIX history.
    #[must_use]
    pub fn new(underlying: impl Into<String>, spot: Decimal, as_of: NaiveDate) -> Self {
        Self {
            state: Arc::new(Mutex::new(PaperState {
                underlying: underlying.into(),
                as_of,
                spot: Some(spot),
                portfolio_value: dec!(100000),
                account_error: None,
                chains: BTreeMap::new(),
                quote_overrides: HashMap::new(),
                vix_history: vec![17.5, 17.5],
                vix_unavailable: false,
                hourly_closes: Vec::new(),
                reject_orders: false,
                orders: Vec::new(),
                positions: BTreeMap::new(),
                next_order_id: 1,
            })),
        }
    }

    #[must_use]
    pub fn with_portfolio_value(self, value: Decimal) -> Self {
        self.set_portfolio_value(value);
        self
    }

    #[must_use]
    pub fn with_vix_history(self, closes: Vec<f64>) -> Self {
        self.set_vix_history(closes);
        self
    }

    /// Hourly closes served by `get_bars`, oldest first.
    #[must_use]
    pub fn with_hourly_closes(self, closes: Vec<Decimal>) -> Self {
        self.state.lock().hourly_closes = closes;
        self
    }

    /// Replaces the synthetic chain for `expiration` with exactly these strikes.
    /// Strikes that cannot be encoded as OCC symbols are left out.
    #[must_use]
    pub fn with_chain(self, expiration: NaiveDate, strikes: &[(OptionType, Decimal)]) -> Self {
        {
            let mut state = self.state.lock();
            let underlying = state.underlying.clone();
            let chain = strikes
                .iter()
                .filter_map(|(option_type, strike)| {
                    contract(&underlying, expiration, *option_type, *strike).ok()
                })
                .collect();
            state.chains.insert(expiration, chain);
        }
        self
    }

    pub fn set_spot(&self, spot: Option<Decimal>) {
        self.state.lock().spot = spot;
    }

    pub fn set_portfolio_value(&self, value: Decimal) {
        self.state.lock().portfolio_value = value;
    }

    /// Makes `get_account` fail with `error` until cleared with `None`.
    pub fn set_account_error(&self, error: Option<TradeError>) {
        self.state.lock().account_error = error;
    }

    pub fn set_vix_history(&self, closes: Vec<f64>) {
        let mut state = self.state.lock();
        state.vix_history = closes;
        state.vix_unavailable = false;
    }

    /// Makes `get_vix_history` fail until new history is set.
    pub fn set_vix_unavailable(&self) {
        self.state.lock().vix_unavailable = true;
    }

    /// Pins the quote for `symbol` instead of pricing it from the spot.
    pub fn set_quote(&self, symbol: &str, bid: Option<Decimal>, ask: Option<Decimal>) {
        self.state.lock().quote_overrides.insert(
            symbol.to_string(),
            OptionQuote {
                symbol: symbol.to_string(),
                bid,
                ask,
            },
        );
    }

    /// When set, every order is rejected.
    pub fn set_reject_orders(&self, reject: bool) {
        self.state.lock().reject_orders = reject;
    }

    /// Every accepted order, in submission order.
    #[must_use]
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.state.lock().orders.clone()
    }

    /// Net contract quantity per symbol after all accepted orders.
    #[must_use]
    pub fn net_positions(&self) -> BTreeMap<String, Decimal> {
        self.state.lock().positions.clone()
    }
}

fn contract(
    underlying: &str,
    expiration: NaiveDate,
    option_type: OptionType,
    strike: Decimal,
) -> TradeResult<OptionContractRef> {
    Ok(OptionContractRef {
        symbol: occ_symbol(underlying, expiration, option_type, strike)?,
        underlying: underlying.to_string(),
        strike_price: strike,
        option_type,
        expiration_date: expiration,
    })
}

impl PaperState {
    fn synthetic_chain(&self, expiration: NaiveDate) -> TradeResult<Vec<OptionContractRef>> {
        let spot = self
            .spot
            .ok_or_else(|| TradeError::data_unavailable("paper spot price not set"))?;
        let center = spot.round();
        let mut chain = Vec::new();
        for option_type in [OptionType::Call, OptionType::Put] {
            for offset in -SYNTHETIC_STRIKE_RANGE..=SYNTHETIC_STRIKE_RANGE {
                let strike = center + Decimal::from(offset);
                if strike > Decimal::ZERO {
                    chain.push(contract(&self.underlying, expiration, option_type, strike)?);
                }
            }
        }
        Ok(chain)
    }

    /// Intrinsic value plus a time value that decays with distance from the
    /// spot and grows with days to expiry, quoted five cents either side.
    fn synthetic_quote(&self, symbol: &str) -> Option<OptionQuote> {
        let spot = self.spot?;
        let parsed = parse_occ_symbol(symbol).ok()?;
        let intrinsic = match parsed.option_type {
            OptionType::Call => (spot - parsed.strike).max(Decimal::ZERO),
            OptionType::Put => (parsed.strike - spot).max(Decimal::ZERO),
        };
        let distance = (parsed.strike - spot).abs();
        let days = (parsed.expiration - self.as_of).num_days().max(0);
        let time_value = (Decimal::ONE - distance * dec!(0.1)).max(dec!(0.05))
            + dec!(0.25) * Decimal::from(days);
        let mid = (intrinsic + time_value).round_dp(2);
        Some(OptionQuote {
            symbol: symbol.to_string(),
            bid: Some((mid - dec!(0.05)).max(dec!(0.01))),
            ask: Some(mid + dec!(0.05)),
        })
    }

    fn apply_fill(&mut self, symbol: &str, side: OrderSide, qty: u32) {
        let signed = match side {
            OrderSide::Buy => Decimal::from(qty),
            OrderSide::Sell => -Decimal::from(qty),
        };
        let entry = self.positions.entry(symbol.to_string()).or_default();
        *entry += signed;
        if entry.is_zero() {
            self.positions.remove(symbol);
        }
    }
}

#[async_trait]
impl BrokerageGateway for PaperBroker {
    async fn get_account(&self) -> TradeResult<AccountSnapshot> {
        let state = self.state.lock();
        if let Some(error) = &state.account_error {
            return Err(error.clone());
        }
        Ok(AccountSnapshot {
            portfolio_value: state.portfolio_value,
        })
    }

    async fn get_all_positions(&self) -> TradeResult<Vec<BrokerPosition>> {
        Ok(self
            .state
            .lock()
            .positions
            .iter()
            .map(|(symbol, qty)| BrokerPosition {
                symbol: symbol.clone(),
                qty: *qty,
                market_value: None,
            })
            .collect())
    }

    async fn get_option_contracts(
        &self,
        underlying: &str,
        expiration: NaiveDate,
    ) -> TradeResult<Vec<OptionContractRef>> {
        let state = self.state.lock();
        if !underlying.eq_ignore_ascii_case(&state.underlying) {
            return Ok(Vec::new());
        }
        match state.chains.get(&expiration) {
            Some(chain) => Ok(chain.clone()),
            None => state.synthetic_chain(expiration),
        }
    }

    async fn get_option_latest_quotes(
        &self,
        symbols: &[String],
    ) -> TradeResult<HashMap<String, OptionQuote>> {
        let state = self.state.lock();
        Ok(symbols
            .iter()
            .filter_map(|symbol| {
                state
                    .quote_overrides
                    .get(symbol)
                    .cloned()
                    .or_else(|| state.synthetic_quote(symbol))
                    .map(|quote| (symbol.clone(), quote))
            })
            .collect())
    }

    async fn submit_order(&self, order: &OrderRequest) -> TradeResult<OrderAck> {
        let mut state = self.state.lock();
        if state.reject_orders {
            return Err(TradeError::order_submission("paper broker rejected the order"));
        }

        match order {
            OrderRequest::MultiLeg(multi) => {
                for leg in multi.legs() {
                    state.apply_fill(&leg.symbol, leg.side, leg.ratio_qty * multi.qty());
                }
            }
            OrderRequest::SingleLeg(single) => {
                state.apply_fill(&single.symbol, single.side, single.qty);
            }
        }

        let id = format!("PAPER-{}", state.next_order_id);
        state.next_order_id += 1;
        state.orders.push(order.clone());

        info!(order_id = %id, "Paper order filled");
        Ok(OrderAck {
            id,
            status: "filled".to_string(),
        })
    }
}

#[async_trait]
impl MarketDataFeed for PaperBroker {
    async fn get_latest_bar(&self, symbol: &str) -> TradeResult<Option<PriceBar>> {
        let state = self.state.lock();
        if !symbol.eq_ignore_ascii_case(&state.underlying) {
            return Ok(None);
        }
        Ok(state.spot.map(|spot| PriceBar {
            timestamp: Utc::now(),
            open: spot,
            high: spot,
            low: spot,
            close: spot,
            volume: 0,
        }))
    }

    async fn get_bars(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        _start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TradeResult<Vec<PriceBar>> {
        let state = self.state.lock();
        let count = state.hourly_closes.len();
        Ok(state
            .hourly_closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let hours_back = i64::try_from(count - i).unwrap_or(i64::MAX);
                PriceBar {
                    timestamp: end - Duration::hours(hours_back),
                    open: *close,
                    high: *close,
                    low: *close,
                    close: *close,
                    volume: 0,
                }
            })
            .collect())
    }

    async fn get_vix_history(&self, period_days: u32) -> TradeResult<Vec<f64>> {
        let state = self.state.lock();
        if state.vix_unavailable {
            return Err(TradeError::data_unavailable("paper VIX history unavailable"));
        }
        let keep = usize::try_from(period_days).unwrap_or(usize::MAX);
        let skip = state.vix_history.len().saturating_sub(keep);
        Ok(state.vix_history[skip..].to_vec())
    }
}
