//! Fractional Kelly risk budget for defined-risk option structures.
//!
//! The strategy does not estimate an edge per trade. It assumes a fixed win
//! rate and average win/loss ratio, takes a conservative fraction of the Kelly
//! optimum, and caps the result with an absolute per-trade risk limit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Assumed trade statistics and the bounds applied to the Kelly optimum.
///
/// The Kelly fraction for a bet paying `b` per unit risked with win
/// probability `p` is:
/// ```text
/// f* = (b·p − q) / b
/// where q = 1 − p
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyParams {
    /// Assumed probability of a winning trade.
    pub win_rate: Decimal,
    /// Assumed average win divided by average loss.
    pub win_loss_ratio: Decimal,
    /// Fraction of full Kelly to use (0.25 = quarter Kelly).
    pub multiplier: Decimal,
    /// Absolute cap on the fraction of the portfolio risked per trade.
    pub max_fraction: Decimal,
}

impl Default for KellyParams {
    fn default() -> Self {
        Self {
            win_rate: Decimal::new(65, 2),       // 0.65
            win_loss_ratio: Decimal::new(15, 1), // 1.5
            multiplier: Decimal::new(25, 2),     // 0.25
            max_fraction: Decimal::new(2, 2),    // 0.02
        }
    }
}

impl KellyParams {
    /// Full Kelly fraction. Zero when the ratio is not positive.
    #[must_use]
    pub fn full_fraction(&self) -> Decimal {
        if self.win_loss_ratio <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let q = Decimal::ONE - self.win_rate;
        (self.win_loss_ratio * self.win_rate - q) / self.win_loss_ratio
    }

    /// Fraction of the portfolio to risk: the smaller of the scaled Kelly
    /// fraction and `max_fraction`, floored at zero.
    ///
    /// # Examples
    /// ```
    /// use regime_options_core::kelly::KellyParams;
    /// use rust_decimal_macros::dec;
    ///
    /// // 0.65 win rate at 1.5:1 gives f* ≈ 0.417, quarter Kelly ≈ 0.104,
    /// // so the 2% cap binds.
    /// assert_eq!(KellyParams::default().risk_fraction(), dec!(0.02));
    /// ```
    #[must_use]
    pub fn risk_fraction(&self) -> Decimal {
        let scaled = self.full_fraction() * self.multiplier;
        scaled.min(self.max_fraction).max(Decimal::ZERO)
    }
}
