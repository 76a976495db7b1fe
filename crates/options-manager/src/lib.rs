//! Regime-driven 0DTE spread management.
//!
//! Runs as a long-lived loop that:
//! - Classifies the volatility regime from VIX level, VIX trend and RSI momentum
//! - Gates new trades on daily trade count and daily loss
//! - Sizes positions with capped fractional Kelly
//! - Selects strikes and submits each structure as one multi-leg order
//! - Marks open positions and closes them at profit targets or stops
//!
//! All rules are deterministic; the broker and market data sit behind the
//! traits in `regime-options-core`.

pub mod error;
pub mod executor;
pub mod ledger;
pub mod monitor;
pub mod regime;
pub mod risk;
pub mod selector;
pub mod service;
pub mod stops;
pub mod targets;
pub mod types;

pub use error::ManagerError;
pub use ledger::{LedgerError, PositionTracker};
pub use monitor::ManageSummary;
pub use regime::{calculate_rsi, fetch_market_snapshot, momentum_from_rsi, RegimeClassifier};
pub use risk::{RiskManager, RiskState};
pub use selector::{SpreadPlan, StrategySelector};
pub use service::{is_market_open, run, step, CycleOutcome, TradingContext};
pub use stops::{should_stop_loss, ProfitLossManager};
pub use targets::should_take_profit;
pub use types::{CloseReason, MarketSnapshot, Position, PositionUpdate, RegimeDecision};
