//! Profit target rule: close once a share of the maximum profit is captured.

use regime_options_core::{PerStrategy, StrategyType};
use rust_decimal::Decimal;

/// True iff `current_pnl >= max_profit × target(strategy)`. Never true for `NoTrade`.
#[must_use]
pub fn should_take_profit(
    current_pnl: Decimal,
    max_profit: Decimal,
    strategy: StrategyType,
    targets: &PerStrategy<Decimal>,
) -> bool {
    let Some(fraction) = targets.get(strategy) else {
        return false;
    };
    let threshold = max_profit * fraction;
    if current_pnl >= threshold {
        tracing::info!(
            strategy = %strategy,
            current_pnl = %current_pnl,
            threshold = %threshold,
            "Profit target hit"
        );
        return true;
    }
    false
}
