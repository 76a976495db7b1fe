//! Core building blocks for regime-based 0DTE options trading.
//!
//! - Domain types for contracts, quotes, orders and account data
//! - The brokerage and market data collaborator traits
//! - The shared error taxonomy
//! - Configuration and its loader
//! - Fractional Kelly sizing parameters
//! - OCC option symbol formatting

pub mod config;
pub mod config_loader;
pub mod error;
pub mod kelly;
pub mod occ;
pub mod traits;
pub mod types;

pub use config::{
    AlpacaSettings, AppConfig, ExitConfig, LedgerConfig, RiskConfig, ScheduleConfig,
    StrategyConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{TradeError, TradeResult};
pub use kelly::KellyParams;
pub use occ::{occ_symbol, parse_occ_symbol, OccSymbol};
pub use traits::{BrokerageGateway, MarketDataFeed};
pub use types::{
    AccountSnapshot, BrokerPosition, MultiLegOrder, OptionContractRef, OptionQuote, OptionType,
    OrderAck, OrderLeg, OrderRequest, OrderSide, PerStrategy, PriceBar, SingleLegOrder,
    StrategyType, TimeInForce, Timeframe,
};
