//! Opens a spread: size, select legs, price, submit, record.

use chrono::{DateTime, Days, Utc};
use regime_options_core::{
    BrokerageGateway, MarketDataFeed, OrderRequest, StrategyType, TradeError,
};
use rust_decimal::Decimal;
use tracing::{error, info};

use crate::error::Result;
use crate::selector::SpreadPlan;
use crate::service::TradingContext;
use crate::types::{Position, CONTRACT_MULTIPLIER};

impl<B, F> TradingContext<B, F>
where
    B: BrokerageGateway,
    F: MarketDataFeed,
{
    /// Opens `strategy` around `spot` and records the position.
    ///
    /// Nothing is recorded unless the broker accepts the order. Once it does,
    /// the trade counts against the daily limit even if the ledger write fails.
    pub async fn execute_strategy(
        &mut self,
        strategy: StrategyType,
        spot: Decimal,
        portfolio_value: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Position> {
        let contracts = self.risk.contracts_for(portfolio_value, strategy);
        let underlying = self.config.strategy.underlying.clone();
        let today = self.trading_date(now);

        let front = self.broker.get_option_contracts(&underlying, today).await?;
        let back = if strategy == StrategyType::Diagonal {
            let back_days = u64::try_from(self.config.strategy.diagonal_back_month_days)
                .unwrap_or_default();
            let expiry = today
                .checked_add_days(Days::new(back_days))
                .ok_or_else(|| TradeError::data_unavailable("back-month expiry out of range"))?;
            self.broker.get_option_contracts(&underlying, expiry).await?
        } else {
            Vec::new()
        };

        let plan = self.selector.select(strategy, spot, &front, &back)?;
        let quotes = self.broker.get_option_latest_quotes(&plan.symbols()).await?;
        let premium = plan.entry_premium(&quotes)?;
        let order = plan.to_order(contracts)?;

        info!(
            strategy = %strategy,
            contracts,
            premium = %premium,
            legs = ?plan.symbols(),
            "Submitting entry order"
        );
        let ack = self
            .broker
            .submit_order(&OrderRequest::MultiLeg(order.clone()))
            .await?;
        self.risk.record_trade();

        let position = self.build_position(&plan, premium, contracts, &ack.id, now);
        if let Err(e) = self.ledger.add(position.clone()) {
            error!(
                order_id = %ack.id,
                position_id = %position.position_id,
                error = %e,
                "Entry order accepted but the position could not be recorded"
            );
            return Err(e.into());
        }

        info!(
            position_id = %position.position_id,
            order_id = %ack.id,
            status = %ack.status,
            entry_value = %position.entry_value,
            max_risk = %position.max_risk,
            "Position opened"
        );
        Ok(position)
    }

    fn build_position(
        &self,
        plan: &SpreadPlan,
        premium: Decimal,
        contracts: u32,
        order_id: &str,
        now: DateTime<Utc>,
    ) -> Position {
        let scale = Decimal::from(CONTRACT_MULTIPLIER) * Decimal::from(contracts);
        let entry_value = premium * scale;
        let max_risk = if plan.strategy == StrategyType::Diagonal {
            -premium * scale
        } else {
            (self.selector.wing_width - premium) * scale
        };

        Position {
            position_id: Position::make_id(
                plan.strategy,
                &now.with_timezone(&self.config.schedule.timezone),
            ),
            strategy_type: plan.strategy,
            underlying: self.config.strategy.underlying.clone(),
            entry_time: now,
            contracts,
            entry_credit: entry_value.abs(),
            max_profit: entry_value.abs(),
            max_risk,
            entry_value,
            current_value: None,
            current_pnl: None,
            last_check: None,
            legs: plan.order_legs(),
            order_id: order_id.to_string(),
        }
    }
}
