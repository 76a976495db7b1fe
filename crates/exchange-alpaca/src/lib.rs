//! Alpaca brokerage integration for regime-based options trading.
//!
//! Provides the REST client (account, option chain, quotes, stock bars,
//! multi-leg orders), daily VIX history from Yahoo Finance, the
//! collaborator trait implementations used by `options-manager`, and an
//! in-memory paper broker for dry runs and tests.

pub mod account;
pub mod client;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod market_data;
pub mod options_chain;
pub mod paper;
pub mod vix;

pub use client::{AlpacaClient, AlpacaConfig, AlpacaCredentials};
pub use error::AlpacaError;
pub use gateway::AlpacaMarketFeed;
pub use paper::PaperBroker;
pub use vix::YahooVixClient;
