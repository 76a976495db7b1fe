//! Prints the position ledger.

use anyhow::Result;
use clap::Args;
use regime_options_core::AppConfig;
use regime_options_manager::{Position, PositionTracker};

#[derive(Args, Debug)]
pub struct PositionsArgs {
    /// Print the records as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run_positions(config: &AppConfig, args: &PositionsArgs) -> Result<()> {
    let tracker = PositionTracker::load(&config.ledger.path)?;
    let positions: Vec<&Position> = tracker.positions().collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&positions)?);
        return Ok(());
    }

    if positions.is_empty() {
        println!("No open positions in {}", tracker.path().display());
        return Ok(());
    }
    for position in positions {
        println!("{}", summary_line(position));
    }
    Ok(())
}

fn summary_line(position: &Position) -> String {
    let pnl = position
        .current_pnl
        .map_or_else(
            || "unmarked".to_string(),
            |p| if p.is_sign_negative() { p.to_string() } else { format!("+{p}") },
        );
    format!(
        "{:<32} {:>3} x {:<18} entry {:>10} max risk {:>10} pnl {:>10}",
        position.position_id,
        position.contracts,
        position.strategy_type.as_str(),
        position.entry_value,
        position.max_risk,
        pnl
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use regime_options_core::StrategyType;
    use rust_decimal_macros::dec;

    #[test]
    fn line_shows_id_and_pnl() {
        let position = Position {
            position_id: "PUT_CREDIT_SPREAD_20261016_100000".to_string(),
            strategy_type: StrategyType::PutCreditSpread,
            underlying: "SPY".to_string(),
            entry_time: Utc::now(),
            contracts: 5,
            entry_credit: dec!(250),
            max_profit: dec!(250),
            max_risk: dec!(2250),
            entry_value: dec!(250),
            current_value: Some(dec!(100)),
            current_pnl: Some(dec!(150)),
            last_check: None,
            legs: Vec::new(),
            order_id: "PAPER-1".to_string(),
        };
        let line = summary_line(&position);
        assert!(line.starts_with("PUT_CREDIT_SPREAD_20261016_100000"));
        assert!(line.contains("+150"));
    }
}
