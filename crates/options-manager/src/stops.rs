//! Stop-loss rule and the combined exit decision.

use regime_options_core::{ExitConfig, PerStrategy, StrategyType};
use rust_decimal::Decimal;

use crate::targets::should_take_profit;
use crate::types::{CloseReason, Position};

/// True iff `current_pnl <= -entry_credit × stop_multiple(strategy)`. Never true for `NoTrade`.
#[must_use]
pub fn should_stop_loss(
    current_pnl: Decimal,
    entry_credit: Decimal,
    strategy: StrategyType,
    multiples: &PerStrategy<Decimal>,
) -> bool {
    let Some(multiple) = multiples.get(strategy) else {
        return false;
    };
    let threshold = -entry_credit * multiple;
    if current_pnl <= threshold {
        tracing::warn!(
            strategy = %strategy,
            current_pnl = %current_pnl,
            threshold = %threshold,
            "Stop loss triggered"
        );
        return true;
    }
    false
}

/// Applies the per-structure profit targets and stops to a marked position.
#[derive(Debug, Clone, Default)]
pub struct ProfitLossManager {
    config: ExitConfig,
}

impl ProfitLossManager {
    #[must_use]
    pub fn new(config: ExitConfig) -> Self {
        Self { config }
    }

    /// Profit is checked before the stop. `None` while the position is unmarked.
    #[must_use]
    pub fn evaluate(&self, position: &Position) -> Option<CloseReason> {
        let pnl = position.current_pnl?;
        if should_take_profit(
            pnl,
            position.max_profit,
            position.strategy_type,
            &self.config.profit_targets,
        ) {
            return Some(CloseReason::ProfitTarget);
        }
        if should_stop_loss(
            pnl,
            position.entry_credit,
            position.strategy_type,
            &self.config.stop_multiples,
        ) {
            return Some(CloseReason::StopLoss);
        }
        None
    }
}
