//! `run` and `cycle`: wire the collaborators and drive the trading context.

use anyhow::{Context, Result};
use chrono::Utc;
use regime_options_alpaca::{
    AlpacaClient, AlpacaConfig, AlpacaCredentials, AlpacaMarketFeed, PaperBroker, YahooVixClient,
};
use regime_options_core::{AppConfig, BrokerageGateway, MarketDataFeed};
use regime_options_manager::{service, TradingContext};
use rust_decimal::Decimal;
use tracing::info;

/// Which collaborators to trade against.
#[derive(Debug, Clone)]
pub struct Backend {
    pub paper: bool,
    pub paper_spot: Decimal,
}

/// Alpaca trading client and feed from the config and `ALPACA_*` keys.
pub fn alpaca_collaborators(config: &AppConfig) -> Result<(AlpacaClient, AlpacaMarketFeed)> {
    let credentials = AlpacaCredentials::from_env().context("loading Alpaca credentials")?;
    let client = AlpacaClient::new(AlpacaConfig::from_settings(&config.alpaca), credentials)?;
    let mut vix = YahooVixClient::new(&config.strategy.vix_symbol, config.alpaca.timeout_secs)?;
    if let Some(url) = &config.alpaca.vix_url {
        vix = vix.with_base_url(url.clone());
    }
    let feed = AlpacaMarketFeed::new(client.clone(), vix);
    Ok((client, feed))
}

fn paper_broker(config: &AppConfig, spot: Decimal) -> PaperBroker {
    let today = Utc::now()
        .with_timezone(&config.schedule.timezone)
        .date_naive();
    info!(spot = %spot, %today, "Using paper broker");
    PaperBroker::new(config.strategy.underlying.clone(), spot, today)
}

/// Runs the loop until Ctrl-C.
pub async fn run_loop(config: AppConfig, backend: &Backend) -> Result<()> {
    if backend.paper {
        let broker = paper_broker(&config, backend.paper_spot);
        service::run(TradingContext::open(broker.clone(), broker, config)?).await
    } else {
        let (client, feed) = alpaca_collaborators(&config)?;
        service::run(TradingContext::open(client, feed, config)?).await
    }
}

/// Runs one cycle regardless of market hours and prints the outcome.
pub async fn run_once(config: AppConfig, backend: &Backend) -> Result<()> {
    if backend.paper {
        let broker = paper_broker(&config, backend.paper_spot);
        cycle(TradingContext::open(broker.clone(), broker, config)?).await
    } else {
        let (client, feed) = alpaca_collaborators(&config)?;
        cycle(TradingContext::open(client, feed, config)?).await
    }
}

async fn cycle<B, F>(mut ctx: TradingContext<B, F>) -> Result<()>
where
    B: BrokerageGateway,
    F: MarketDataFeed,
{
    let outcome = ctx.run_cycle(Utc::now()).await?;
    println!("{outcome}");
    println!("Open positions: {}", ctx.ledger().len());
    Ok(())
}
