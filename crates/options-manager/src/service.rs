//! Trading context and main service loop.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use regime_options_core::{AppConfig, BrokerageGateway, MarketDataFeed, ScheduleConfig, StrategyType};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::ledger::PositionTracker;
use crate::monitor::ManageSummary;
use crate::regime::{fetch_market_snapshot, RegimeClassifier};
use crate::risk::RiskManager;
use crate::selector::StrategySelector;
use crate::stops::ProfitLossManager;
use crate::types::RegimeDecision;

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    DailyTargetReached,
    RiskGateClosed,
    NoTrade(RegimeDecision),
    SpotUnavailable(RegimeDecision),
    Executed {
        strategy: StrategyType,
        position_id: String,
        contracts: u32,
    },
    ExecutionFailed {
        strategy: StrategyType,
        reason: String,
    },
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyTargetReached => write!(f, "daily target reached, done for the day"),
            Self::RiskGateClosed => write!(f, "risk limits reached, no new trades"),
            Self::NoTrade(_) => write!(f, "no trade conditions"),
            Self::SpotUnavailable(d) => write!(f, "{} selected but spot price unavailable", d.strategy),
            Self::Executed {
                strategy,
                position_id,
                contracts,
            } => write!(f, "opened {contracts} x {strategy} as {position_id}"),
            Self::ExecutionFailed { strategy, reason } => {
                write!(f, "{strategy} not opened: {reason}")
            }
        }
    }
}

/// Everything one trading loop owns: collaborators, rules and state.
pub struct TradingContext<B, F> {
    pub(crate) broker: B,
    pub(crate) feed: F,
    pub(crate) config: AppConfig,
    pub(crate) classifier: RegimeClassifier,
    pub(crate) risk: RiskManager,
    pub(crate) exits: ProfitLossManager,
    pub(crate) selector: StrategySelector,
    pub(crate) ledger: PositionTracker,
}

impl<B, F> TradingContext<B, F>
where
    B: BrokerageGateway,
    F: MarketDataFeed,
{
    #[must_use]
    pub fn new(broker: B, feed: F, config: AppConfig, ledger: PositionTracker) -> Self {
        Self {
            classifier: RegimeClassifier::from_config(&config.strategy),
            risk: RiskManager::new(config.risk.clone()),
            exits: ProfitLossManager::new(config.exits.clone()),
            selector: StrategySelector::from_config(&config.strategy),
            broker,
            feed,
            config,
            ledger,
        }
    }

    /// Builds the context with the ledger loaded from `config.ledger.path`.
    ///
    /// # Errors
    /// Returns an error if an existing ledger file cannot be read.
    pub fn open(broker: B, feed: F, config: AppConfig) -> Result<Self> {
        let ledger = PositionTracker::load(Path::new(&config.ledger.path))?;
        Ok(Self::new(broker, feed, config, ledger))
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    #[must_use]
    pub fn ledger(&self) -> &PositionTracker {
        &self.ledger
    }

    #[must_use]
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Calendar date at the exchange.
    #[must_use]
    pub fn trading_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.config.schedule.timezone).date_naive()
    }

    /// Resets the daily risk state when the exchange date has moved on.
    pub fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = self.trading_date(now);
        if self.risk.state().trading_day != Some(today) {
            self.risk.reset_daily(today);
        }
    }

    /// One pass of the strategy.
    ///
    /// # Errors
    /// Account failures and fatal logic errors. A strategy that cannot be
    /// opened is reported as [`CycleOutcome::ExecutionFailed`] instead.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        self.roll_day(now);

        let account = self.broker.get_account().await?;
        let portfolio_value = account.portfolio_value;
        let daily_return = self.risk.observe_portfolio(portfolio_value);
        info!(
            portfolio_value = %portfolio_value,
            daily_pnl = %self.risk.state().daily_pnl,
            daily_return = %daily_return,
            trades_today = self.risk.state().trades_today,
            "Cycle started"
        );

        let ManageSummary {
            marked,
            closed,
            failed,
        } = self.manage_positions(now).await;
        if marked + closed.len() + failed > 0 {
            info!(marked, closed = closed.len(), failed, "Positions managed");
        }

        if self
            .risk
            .check_daily_target(daily_return, self.config.strategy.target_daily_return)
        {
            return Ok(CycleOutcome::DailyTargetReached);
        }
        if !self.risk.can_trade(portfolio_value) {
            return Ok(CycleOutcome::RiskGateClosed);
        }

        let snapshot = fetch_market_snapshot(&self.feed, &self.config.strategy, now).await;
        let decision = self.classifier.classify(&snapshot);
        info!(
            strategy = %decision.strategy,
            current_vix = ?snapshot.current_vix,
            previous_vix = ?snapshot.previous_vix,
            momentum = snapshot.momentum,
            "Regime classified"
        );
        if decision.strategy == StrategyType::NoTrade {
            return Ok(CycleOutcome::NoTrade(decision));
        }
        let Some(spot) = snapshot.spot_price else {
            warn!(strategy = %decision.strategy, "Spot price unavailable, skipping");
            return Ok(CycleOutcome::SpotUnavailable(decision));
        };

        let strategy = decision.strategy;
        match self
            .execute_strategy(strategy, spot, portfolio_value, now)
            .await
        {
            Ok(position) => Ok(CycleOutcome::Executed {
                strategy,
                position_id: position.position_id,
                contracts: position.contracts,
            }),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(strategy = %strategy, error = %e, "Strategy execution failed");
                Ok(CycleOutcome::ExecutionFailed {
                    strategy,
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Weekdays between the configured open and close, inclusive, in exchange time.
#[must_use]
pub fn is_market_open(now: DateTime<Utc>, schedule: &ScheduleConfig) -> bool {
    let local = now.with_timezone(&schedule.timezone);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let time = local.time();
    time >= schedule.market_open && time <= schedule.market_close
}

/// Runs cycles until Ctrl-C or a fatal error.
///
/// Ctrl-C is only observed between cycles.
///
/// # Errors
/// Returns the fatal error that stopped the loop.
pub async fn run<B, F>(mut ctx: TradingContext<B, F>) -> anyhow::Result<()>
where
    B: BrokerageGateway,
    F: MarketDataFeed,
{
    info!(
        underlying = %ctx.config.strategy.underlying,
        active_secs = ctx.config.schedule.active_interval_secs,
        closed_secs = ctx.config.schedule.closed_interval_secs,
        ledger = %ctx.ledger.path().display(),
        open_positions = ctx.ledger.len(),
        "Regime options strategy started"
    );

    loop {
        let wait = step(&mut ctx, Utc::now()).await?;
        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                return Ok(());
            }
        }
    }
}

/// One turn of the loop at `now`: a cycle while the market is open, otherwise
/// only the day roll. Returns how long to sleep before the next turn.
///
/// Every cycle error other than a fatal one is logged and swallowed.
///
/// # Errors
/// The fatal error that must stop the loop.
pub async fn step<B, F>(ctx: &mut TradingContext<B, F>, now: DateTime<Utc>) -> anyhow::Result<Duration>
where
    B: BrokerageGateway,
    F: MarketDataFeed,
{
    let schedule = &ctx.config.schedule;
    if !is_market_open(now, schedule) {
        let wait = Duration::from_secs(schedule.closed_interval_secs);
        ctx.roll_day(now);
        debug!("Market closed");
        return Ok(wait);
    }

    let wait = Duration::from_secs(schedule.active_interval_secs);
    match ctx.run_cycle(now).await {
        Ok(outcome) => info!(%outcome, "Cycle finished"),
        Err(e) if e.is_fatal() => {
            error!(error = %e, "Fatal error, stopping");
            return Err(e.into());
        }
        Err(e) => error!(error = %e, "Cycle failed"),
    }
    Ok(wait)
}
