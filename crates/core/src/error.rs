//! Error taxonomy shared by every collaborator seam.

use thiserror::Error;

/// Failures surfaced by the brokerage gateway, the market data feed and the
/// strategy logic built on them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TradeError {
    /// A market data item could not be obtained or was incomplete.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// The option chain has no contracts satisfying the structure's strikes.
    #[error("no suitable contracts: {0}")]
    NoSuitableContracts(String),

    /// The brokerage rejected or failed an order.
    #[error("order submission failed: {0}")]
    OrderSubmission(String),

    /// A strategy name outside the closed set.
    #[error("unknown strategy type: {0}")]
    UnknownStrategyType(String),

    /// An order that cannot be expressed (bad leg count, zero quantity).
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Transport or HTTP failure talking to an external service.
    #[error("gateway error: {0}")]
    Gateway(String),
}

impl TradeError {
    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    pub fn no_suitable_contracts(msg: impl Into<String>) -> Self {
        Self::NoSuitableContracts(msg.into())
    }

    pub fn order_submission(msg: impl Into<String>) -> Self {
        Self::OrderSubmission(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Programming errors end the trading loop; everything else is logged and
    /// the next cycle retries.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownStrategyType(_))
    }
}

pub type TradeResult<T> = std::result::Result<T, TradeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unknown_strategy_is_fatal() {
        assert!(TradeError::UnknownStrategyType("X".into()).is_fatal());
        assert!(!TradeError::data_unavailable("vix").is_fatal());
        assert!(!TradeError::no_suitable_contracts("wing").is_fatal());
        assert!(!TradeError::order_submission("rejected").is_fatal());
        assert!(!TradeError::InvalidOrder("legs".into()).is_fatal());
        assert!(!TradeError::gateway("timeout").is_fatal());
    }

    #[test]
    fn display_carries_the_detail() {
        let err = TradeError::no_suitable_contracts("no long put at 405");
        assert_eq!(err.to_string(), "no suitable contracts: no long put at 405");
    }
}
