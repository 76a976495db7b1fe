//! Errors surfaced by a trading cycle.

use regime_options_core::TradeError;
use thiserror::Error;

use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error("position ledger: {0}")]
    Ledger(#[from] LedgerError),
}

impl ManagerError {
    /// Only logic errors stop the loop; data, broker and ledger failures are
    /// retried on the next cycle.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Trade(e) => e.is_fatal(),
            Self::Ledger(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;
