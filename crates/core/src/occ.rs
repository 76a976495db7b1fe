//! OCC option symbols: `{root}{yymmdd}{C|P}{strike × 1000, 8 digits}`.
//!
//! `SPY261017C00415000` is the SPY 415 call expiring 2026-10-17.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{TradeError, TradeResult};
use crate::types::OptionType;

/// Parsed components of an OCC symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccSymbol {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: Decimal,
}

/// Formats an OCC symbol.
///
/// # Errors
/// Returns [`TradeError::InvalidOrder`] for a negative strike or one that does
/// not fit eight digits of thousandths.
pub fn occ_symbol(
    underlying: &str,
    expiration: NaiveDate,
    option_type: OptionType,
    strike: Decimal,
) -> TradeResult<String> {
    let thousandths = (strike * Decimal::from(1000))
        .round()
        .to_u64()
        .filter(|v| *v <= 99_999_999)
        .ok_or_else(|| TradeError::InvalidOrder(format!("strike {strike} out of range")))?;
    Ok(format!(
        "{}{:02}{:02}{:02}{}{:08}",
        underlying,
        expiration.year() % 100,
        expiration.month(),
        expiration.day(),
        option_type.code(),
        thousandths
    ))
}

/// Parses an OCC symbol.
///
/// # Errors
/// Returns [`TradeError::DataUnavailable`] when `symbol` is not well formed.
pub fn parse_occ_symbol(symbol: &str) -> TradeResult<OccSymbol> {
    let malformed = || TradeError::data_unavailable(format!("malformed option symbol {symbol}"));

    // root + 6 date digits + 1 right + 8 strike digits
    if symbol.len() < 16 || !symbol.is_ascii() {
        return Err(malformed());
    }
    let (root, tail) = symbol.split_at(symbol.len() - 15);
    if root.is_empty() || !root.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(malformed());
    }

    let digits = |s: &str| -> TradeResult<u32> {
        if s.chars().all(|c| c.is_ascii_digit()) {
            s.parse().map_err(|_| malformed())
        } else {
            Err(malformed())
        }
    };
    let year = digits(&tail[0..2])?;
    let month = digits(&tail[2..4])?;
    let day = digits(&tail[4..6])?;
    let expiration = NaiveDate::from_ymd_opt(2000 + year as i32, month, day).ok_or_else(malformed)?;

    let option_type = match &tail[6..7] {
        "C" => OptionType::Call,
        "P" => OptionType::Put,
        _ => return Err(malformed()),
    };
    let strike = Decimal::new(i64::from(digits(&tail[7..15])?), 3).normalize();

    Ok(OccSymbol {
        underlying: root.to_string(),
        expiration,
        option_type,
        strike,
    })
}
