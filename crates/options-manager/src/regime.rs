//! Regime detection: VIX level and trend plus RSI momentum select a structure.

use chrono::{DateTime, Duration, Utc};
use regime_options_core::{MarketDataFeed, StrategyConfig, StrategyType, Timeframe};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use crate::types::{MarketSnapshot, RegimeDecision};

/// Momentum above this (and above [`CONFIRMING_MOMENTUM`]) favours a put credit spread.
const STRONG_MOMENTUM: f64 = 0.5;
const CONFIRMING_MOMENTUM: f64 = 0.3;

/// Maps a [`MarketSnapshot`] to a strategy. Pure; no I/O.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    pub low_vol_threshold: f64,
    pub high_vol_threshold: f64,
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self {
            low_vol_threshold: 17.0,
            high_vol_threshold: 18.0,
        }
    }
}

impl RegimeClassifier {
    #[must_use]
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            low_vol_threshold: config.low_vol_threshold,
            high_vol_threshold: config.high_vol_threshold,
        }
    }

    #[must_use]
    pub fn classify(&self, snapshot: &MarketSnapshot) -> RegimeDecision {
        RegimeDecision {
            strategy: self.classify_values(
                snapshot.current_vix,
                snapshot.previous_vix,
                snapshot.momentum,
            ),
            snapshot: snapshot.clone(),
        }
    }

    /// First matching rule wins:
    /// 1. high and rising VIX: iron condor
    /// 2. low and not rising VIX: diagonal
    /// 3. VIX inside the band: credit spread on strong momentum, else iron butterfly
    /// 4. anything else: no trade
    ///
    /// A missing VIX value on either day makes every volatility predicate false.
    #[must_use]
    pub fn classify_values(
        &self,
        current_vix: Option<f64>,
        previous_vix: Option<f64>,
        momentum: f64,
    ) -> StrategyType {
        let (Some(current), Some(previous)) = (current_vix, previous_vix) else {
            return StrategyType::NoTrade;
        };
        let rising = current > previous;

        if current > self.high_vol_threshold && rising {
            return StrategyType::IronCondor;
        }
        if current < self.low_vol_threshold && !rising {
            return StrategyType::Diagonal;
        }
        if (self.low_vol_threshold..=self.high_vol_threshold).contains(&current) {
            if momentum > STRONG_MOMENTUM && momentum > CONFIRMING_MOMENTUM {
                return StrategyType::PutCreditSpread;
            }
            if momentum < -STRONG_MOMENTUM && momentum < -CONFIRMING_MOMENTUM {
                return StrategyType::CallCreditSpread;
            }
            return StrategyType::IronButterfly;
        }
        StrategyType::NoTrade
    }
}

/// Simple-average RSI over the last `period` price changes.
///
/// Returns 50 when there are fewer than `period + 1` prices and 100 when the
/// window holds no losses.
#[must_use]
pub fn calculate_rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }
    let window = &prices[prices.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), delta| {
            if delta > 0.0 {
                (gains + delta, losses)
            } else {
                (gains, losses - delta)
            }
        });

    #[allow(clippy::cast_precision_loss)]
    let n = period as f64;
    let avg_gain = gains / n;
    let avg_loss = losses / n;
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Contrarian momentum signal from RSI: overbought reads bearish, oversold bullish.
#[must_use]
pub fn momentum_from_rsi(rsi: f64, config: &StrategyConfig) -> f64 {
    if rsi > config.rsi_overbought {
        -config.momentum_signal
    } else if rsi < config.rsi_oversold {
        config.momentum_signal
    } else {
        0.0
    }
}

/// Momentum from a close series; neutral when there are fewer than `rsi_period` closes.
#[must_use]
pub fn momentum_from_closes(closes: &[f64], config: &StrategyConfig) -> f64 {
    if closes.len() < config.rsi_period {
        return 0.0;
    }
    momentum_from_rsi(calculate_rsi(closes, config.rsi_period), config)
}

/// Gathers VIX, spot and momentum. Feed failures degrade the affected field
/// (VIX and spot to `None`, momentum to 0) and are logged; they never abort.
pub async fn fetch_market_snapshot<F: MarketDataFeed + ?Sized>(
    feed: &F,
    config: &StrategyConfig,
    now: DateTime<Utc>,
) -> MarketSnapshot {
    let (current_vix, previous_vix) = match feed.get_vix_history(config.vix_history_days).await {
        Ok(closes) if closes.len() >= 2 => {
            (closes.last().copied(), closes.get(closes.len() - 2).copied())
        }
        Ok(closes) => {
            warn!(count = closes.len(), "Not enough VIX history; need two closes");
            (None, None)
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch VIX history");
            (None, None)
        }
    };

    let spot_price = match feed.get_latest_bar(&config.underlying).await {
        Ok(Some(bar)) => Some(bar.close),
        Ok(None) => {
            warn!(symbol = config.underlying, "No latest bar for underlying");
            None
        }
        Err(e) => {
            warn!(symbol = config.underlying, error = %e, "Failed to fetch spot price");
            None
        }
    };

    let start = now - Duration::days(config.momentum_lookback_days);
    let momentum = match feed
        .get_bars(&config.underlying, Timeframe::Hour, start, now)
        .await
    {
        Ok(bars) => {
            let closes: Vec<f64> = bars.iter().filter_map(|b| b.close.to_f64()).collect();
            momentum_from_closes(&closes, config)
        }
        Err(e) => {
            warn!(symbol = config.underlying, error = %e, "Failed to fetch bars for momentum");
            0.0
        }
    };

    let snapshot = MarketSnapshot {
        current_vix,
        previous_vix,
        spot_price,
        momentum,
    };
    debug!(?snapshot, "Market snapshot");
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(current: f64, previous: f64, momentum: f64) -> StrategyType {
        RegimeClassifier::default().classify_values(Some(current), Some(previous), momentum)
    }

    // ==================== Decision Table ====================

    #[test]
    fn high_and_rising_vix_is_iron_condor() {
        assert_eq!(classify(19.0, 18.0, 0.0), StrategyType::IronCondor);
        assert_eq!(classify(18.01, 17.0, 0.0), StrategyType::IronCondor);
    }

    #[test]
    fn threshold_itself_is_not_high() {
        // strict `>` on the threshold: 18 rising falls into the moderate band
        assert_eq!(classify(18.0, 17.0, 0.0), StrategyType::IronButterfly);
        assert_eq!(classify(18.0, 19.0, 0.0), StrategyType::IronButterfly);
    }

    #[test]
    fn high_but_falling_vix_is_no_trade() {
        assert_eq!(classify(20.0, 21.0, 0.0), StrategyType::NoTrade);
        assert_eq!(classify(20.0, 20.0, 0.9), StrategyType::NoTrade);
    }

    #[test]
    fn low_and_not_rising_vix_is_diagonal() {
        assert_eq!(classify(16.0, 17.0, 0.0), StrategyType::Diagonal);
        assert_eq!(classify(16.0, 16.0, 0.6), StrategyType::Diagonal);
        assert_eq!(classify(16.0, 17.0, -0.6), StrategyType::Diagonal);
    }

    #[test]
    fn low_but_rising_vix_is_no_trade() {
        assert_eq!(classify(16.0, 15.0, 0.0), StrategyType::NoTrade);
    }

    #[test]
    fn moderate_band_uses_momentum() {
        assert_eq!(classify(17.5, 17.5, 0.6), StrategyType::PutCreditSpread);
        assert_eq!(classify(17.5, 17.5, -0.6), StrategyType::CallCreditSpread);
        assert_eq!(classify(17.5, 17.5, 0.5), StrategyType::IronButterfly);
        assert_eq!(classify(17.0, 18.0, 0.0), StrategyType::IronButterfly);
    }

    #[test]
    fn missing_vix_is_no_trade() {
        let classifier = RegimeClassifier::default();
        assert_eq!(
            classifier.classify_values(None, Some(17.0), 0.6),
            StrategyType::NoTrade
        );
        assert_eq!(
            classifier.classify_values(None, None, 0.0),
            StrategyType::NoTrade
        );
        assert_eq!(
            classifier.classify_values(Some(25.0), None, 0.0),
            StrategyType::NoTrade
        );
        assert_eq!(
            classifier.classify_values(Some(12.0), None, 0.0),
            StrategyType::NoTrade
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = RegimeClassifier::default();
        let snapshot = MarketSnapshot {
            current_vix: Some(17.3),
            previous_vix: Some(17.9),
            spot_price: None,
            momentum: -0.6,
        };
        let first = classifier.classify(&snapshot);
        let second = classifier.classify(&snapshot);
        assert_eq!(first, second);
        assert_eq!(first.strategy, StrategyType::CallCreditSpread);
    }

    // ==================== RSI / Momentum ====================

    #[test]
    fn rsi_is_neutral_on_short_history() {
        assert!((calculate_rsi(&[1.0; 14], 14) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_is_100_without_losses() {
        let rising: Vec<f64> = (0..20).map(f64::from).collect();
        assert!((calculate_rsi(&rising, 14) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_uses_only_the_last_period_changes() {
        // an early crash outside the window must not matter
        let mut prices = vec![100.0, 50.0];
        prices.extend((0..15).map(|i| 50.0 + f64::from(i)));
        assert!((calculate_rsi(&prices, 14) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_balances_gains_and_losses() {
        // alternating +1 / -1 over 14 changes: avg gain == avg loss
        let prices: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        assert!((calculate_rsi(&prices, 14) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn momentum_maps_rsi_extremes() {
        let config = StrategyConfig::default();
        assert!((momentum_from_rsi(75.0, &config) + 0.6).abs() < f64::EPSILON);
        assert!((momentum_from_rsi(25.0, &config) - 0.6).abs() < f64::EPSILON);
        assert!(momentum_from_rsi(70.0, &config).abs() < f64::EPSILON);
        assert!(momentum_from_rsi(30.0, &config).abs() < f64::EPSILON);
    }

    #[test]
    fn momentum_needs_enough_closes() {
        let config = StrategyConfig::default();
        let falling: Vec<f64> = (0..13).map(|i| 100.0 - f64::from(i)).collect();
        assert!(momentum_from_closes(&falling, &config).abs() < f64::EPSILON);

        let falling: Vec<f64> = (0..20).map(|i| 100.0 - f64::from(i)).collect();
        assert!((momentum_from_closes(&falling, &config) - 0.6).abs() < f64::EPSILON);
    }
}
