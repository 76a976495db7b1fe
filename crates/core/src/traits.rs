use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::TradeResult;
use crate::types::{
    AccountSnapshot, BrokerPosition, OptionContractRef, OptionQuote, OrderAck, OrderRequest,
    PriceBar, Timeframe,
};

/// Account, option chain, quote and order access at the brokerage.
#[async_trait]
pub trait BrokerageGateway: Send + Sync {
    async fn get_account(&self) -> TradeResult<AccountSnapshot>;

    async fn get_all_positions(&self) -> TradeResult<Vec<BrokerPosition>>;

    /// All listed contracts on `underlying` expiring on `expiration`.
    async fn get_option_contracts(
        &self,
        underlying: &str,
        expiration: NaiveDate,
    ) -> TradeResult<Vec<OptionContractRef>>;

    /// Latest quotes keyed by contract symbol. Symbols without a quote are absent.
    async fn get_option_latest_quotes(
        &self,
        symbols: &[String],
    ) -> TradeResult<HashMap<String, OptionQuote>>;

    async fn submit_order(&self, order: &OrderRequest) -> TradeResult<OrderAck>;
}

/// Price history for the underlying and the volatility index.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    async fn get_latest_bar(&self, symbol: &str) -> TradeResult<Option<PriceBar>>;

    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TradeResult<Vec<PriceBar>>;

    /// Daily VIX closes over the trailing `period_days`, oldest first.
    async fn get_vix_history(&self, period_days: u32) -> TradeResult<Vec<f64>>;
}
