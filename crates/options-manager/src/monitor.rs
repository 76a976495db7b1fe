//! Marks open positions to market and closes those that hit an exit.

use chrono::{DateTime, Utc};
use regime_options_core::{
    parse_occ_symbol, BrokerageGateway, MarketDataFeed, MultiLegOrder, OrderRequest,
};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::selector::close_cost;
use crate::service::TradingContext;
use crate::types::{CloseReason, PositionUpdate, CONTRACT_MULTIPLIER};

/// Result of one pass over the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManageSummary {
    pub marked: usize,
    pub closed: Vec<(String, CloseReason)>,
    pub failed: usize,
}

impl<B, F> TradingContext<B, F>
where
    B: BrokerageGateway,
    F: MarketDataFeed,
{
    /// Marks every tracked position and closes the ones at a profit target or
    /// stop. A failure on one position is logged and the rest are still managed.
    pub async fn manage_positions(&mut self, now: DateTime<Utc>) -> ManageSummary {
        let ids: Vec<String> = self
            .ledger
            .positions()
            .map(|p| p.position_id.clone())
            .collect();
        let mut summary = ManageSummary::default();

        for id in ids {
            match self.manage_position(&id, now).await {
                Ok(Some(reason)) => summary.closed.push((id, reason)),
                Ok(None) => summary.marked += 1,
                Err(e) => {
                    warn!(position_id = %id, error = %e, "Failed to manage position");
                    summary.failed += 1;
                }
            }
        }

        self.log_untracked_positions().await;
        summary
    }

    async fn manage_position(&mut self, id: &str, now: DateTime<Utc>) -> Result<Option<CloseReason>> {
        let Some(position) = self.ledger.get(id).cloned() else {
            return Ok(None);
        };

        let today = self.trading_date(now);
        if let Some(expiration) = position.last_expiration().filter(|e| *e < today) {
            self.ledger.remove(id)?;
            info!(
                position_id = %id,
                %expiration,
                last_pnl = ?position.current_pnl,
                "Position expired, dropped from ledger"
            );
            return Ok(Some(CloseReason::Expired));
        }

        let symbols: Vec<String> = position.legs.iter().map(|l| l.symbol.clone()).collect();
        let quotes = self.broker.get_option_latest_quotes(&symbols).await?;
        let cost = close_cost(&position.legs, &quotes)?;
        let current_value =
            cost * Decimal::from(CONTRACT_MULTIPLIER) * Decimal::from(position.contracts);
        let current_pnl = position.entry_value - current_value;
        let mark = PositionUpdate {
            current_value: Some(current_value),
            current_pnl: Some(current_pnl),
            last_check: Some(now),
        };
        debug!(
            position_id = %id,
            current_value = %current_value,
            current_pnl = %current_pnl,
            "Position marked"
        );

        let mut marked = position.clone();
        mark.apply(&mut marked);
        let Some(reason) = self.exits.evaluate(&marked) else {
            self.ledger.update(id, &mark)?;
            return Ok(None);
        };

        let close = MultiLegOrder::new(position.legs.clone(), position.contracts)?.reversed();
        let ack = match self.broker.submit_order(&OrderRequest::MultiLeg(close)).await {
            Ok(ack) => ack,
            Err(e) => {
                self.ledger.update(id, &mark)?;
                return Err(e.into());
            }
        };

        // Removal follows acceptance of the close order, not its fill. The
        // record must not survive in memory or the next cycle closes it twice.
        if let Err(e) = self.ledger.remove(id) {
            error!(
                position_id = %id,
                order_id = %ack.id,
                error = %e,
                "Close order accepted but the ledger could not be written"
            );
            self.ledger.forget(id);
        }

        info!(
            position_id = %id,
            reason = %reason,
            order_id = %ack.id,
            current_pnl = %current_pnl,
            "Position closed"
        );
        Ok(Some(reason))
    }

    async fn log_untracked_positions(&self) {
        let held = match self.broker.get_all_positions().await {
            Ok(held) => held,
            Err(e) => {
                warn!(error = %e, "Failed to fetch broker positions");
                return;
            }
        };
        let underlying = &self.config.strategy.underlying;
        for broker_position in held {
            let on_underlying = parse_occ_symbol(&broker_position.symbol)
                .map(|occ| occ.underlying.eq_ignore_ascii_case(underlying))
                .unwrap_or(false);
            if !on_underlying {
                continue;
            }
            let tracked = self
                .ledger
                .positions()
                .any(|p| p.owns_symbol(&broker_position.symbol));
            if !tracked {
                warn!(
                    symbol = %broker_position.symbol,
                    qty = %broker_position.qty,
                    "Untracked broker position"
                );
            }
        }
    }
}
