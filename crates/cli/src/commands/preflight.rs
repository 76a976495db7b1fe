//! Preflight validation before trading live.
//!
//! Runs the checks a cycle depends on:
//! - Alpaca credentials in the environment
//! - Account access and portfolio value
//! - Broker positions on the underlying
//! - Today's option chain and a quote from it
//! - Spot price and VIX history

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use regime_options_alpaca::client::{API_KEY_ENV, SECRET_KEY_ENV};
use regime_options_core::{AppConfig, BrokerageGateway, MarketDataFeed};
use rust_decimal::Decimal;

use super::trade::alpaca_collaborators;

#[derive(Args, Debug)]
pub struct PreflightArgs {
    /// Minimum required portfolio value.
    #[arg(long, default_value = "2000")]
    pub min_portfolio: Decimal,

    /// Show verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug)]
struct CheckResult {
    name: &'static str,
    passed: bool,
    message: String,
}

impl CheckResult {
    fn pass(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            message: message.into(),
        }
    }

    fn fail(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            message: message.into(),
        }
    }

    fn print(&self) {
        let mark = if self.passed { "✓" } else { "✗" };
        println!("  {mark} {:<22} {}", self.name, self.message);
    }
}

/// Runs the preflight checks. Exits non-zero when a critical check fails.
pub async fn run_preflight(config: &AppConfig, args: &PreflightArgs) -> Result<()> {
    println!();
    println!("Preflight for {} (paper: {})", config.strategy.underlying, config.alpaca.paper);
    println!();

    let mut results: Vec<CheckResult> = Vec::new();

    for key in [API_KEY_ENV, SECRET_KEY_ENV] {
        results.push(if std::env::var(key).is_ok() {
            CheckResult::pass("ENV", format!("{key} set"))
        } else {
            CheckResult::fail("ENV", format!("{key} missing"))
        });
    }

    let collaborators = match alpaca_collaborators(config) {
        Ok(pair) => Some(pair),
        Err(e) => {
            results.push(CheckResult::fail("Client", e.to_string()));
            None
        }
    };

    if let Some((client, feed)) = collaborators {
        match client.get_account().await {
            Ok(account) if account.portfolio_value >= args.min_portfolio => results.push(
                CheckResult::pass("Account", format!("portfolio {}", account.portfolio_value)),
            ),
            Ok(account) => results.push(CheckResult::fail(
                "Account",
                format!(
                    "portfolio {} below minimum {}",
                    account.portfolio_value, args.min_portfolio
                ),
            )),
            Err(e) => results.push(CheckResult::fail("Account", e.to_string())),
        }

        match client.get_all_positions().await {
            Ok(positions) => {
                results.push(CheckResult::pass(
                    "Positions",
                    format!("{} open at broker", positions.len()),
                ));
                if args.verbose {
                    for position in positions.iter().take(10) {
                        println!("    • {} {}", position.symbol, position.qty);
                    }
                }
            }
            Err(e) => results.push(CheckResult::fail("Positions", e.to_string())),
        }

        let today = Utc::now()
            .with_timezone(&config.schedule.timezone)
            .date_naive();
        match client
            .get_option_contracts(&config.strategy.underlying, today)
            .await
        {
            Ok(chain) if chain.is_empty() => results.push(CheckResult::fail(
                "Option chain",
                format!("no contracts expiring {today}"),
            )),
            Ok(chain) => {
                results.push(CheckResult::pass(
                    "Option chain",
                    format!("{} contracts expiring {today}", chain.len()),
                ));
                let sample: Vec<String> = chain.iter().take(1).map(|c| c.symbol.clone()).collect();
                match client.get_option_latest_quotes(&sample).await {
                    Ok(quotes) if !quotes.is_empty() => {
                        results.push(CheckResult::pass("Option quotes", format!("{} quoted", sample.join(","))));
                    }
                    Ok(_) => results.push(CheckResult::fail("Option quotes", "no quote returned")),
                    Err(e) => results.push(CheckResult::fail("Option quotes", e.to_string())),
                }
            }
            Err(e) => results.push(CheckResult::fail("Option chain", e.to_string())),
        }

        match feed.get_latest_bar(&config.strategy.underlying).await {
            Ok(Some(bar)) => results.push(CheckResult::pass("Spot", format!("{}", bar.close))),
            Ok(None) => results.push(CheckResult::fail("Spot", "no latest bar")),
            Err(e) => results.push(CheckResult::fail("Spot", e.to_string())),
        }

        match feed.get_vix_history(config.strategy.vix_history_days).await {
            Ok(closes) if closes.len() >= 2 => {
                results.push(CheckResult::pass("VIX", format!("{closes:?}")));
            }
            Ok(closes) => results.push(CheckResult::fail(
                "VIX",
                format!("only {} closes", closes.len()),
            )),
            Err(e) => results.push(CheckResult::fail("VIX", e.to_string())),
        }
    }

    for result in &results {
        result.print();
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let critical: Vec<_> = results
        .iter()
        .filter(|r| !r.passed && is_critical(r.name))
        .collect();

    println!();
    println!("Passed: {passed}  Failed: {}", results.len() - passed);
    if critical.is_empty() {
        println!("✓ Ready to trade");
        Ok(())
    } else {
        println!("✗ Not ready, fix first:");
        for failure in &critical {
            println!("    • {}: {}", failure.name, failure.message);
        }
        std::process::exit(1);
    }
}

fn is_critical(name: &str) -> bool {
    matches!(name, "ENV" | "Client" | "Account" | "Option chain")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_checks_are_not_critical() {
        assert!(is_critical("Account"));
        assert!(is_critical("Option chain"));
        assert!(!is_critical("VIX"));
        assert!(!is_critical("Option quotes"));
    }
}
