//! Error types for the Alpaca and VIX source integrations.

use regime_options_core::TradeError;
use thiserror::Error;

/// Errors that can occur when talking to Alpaca or the VIX source.
#[derive(Debug, Error)]
pub enum AlpacaError {
    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error body returned by the API.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Missing credentials or an unusable setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The VIX history source failed or reported an error.
    #[error("VIX source error: {0}")]
    VixSource(String),

    /// Response parsed but did not hold what was asked for.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl AlpacaError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Returns true if repeating the same request right away may succeed.
    ///
    /// Rate limits are excluded: the server asks for a longer wait than a
    /// cycle should spend on one fetch.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Maps an order-endpoint failure into the shared taxonomy.
    #[must_use]
    pub fn into_order_error(self) -> TradeError {
        TradeError::order_submission(self.to_string())
    }
}

impl From<reqwest::Error> for AlpacaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AlpacaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<AlpacaError> for TradeError {
    fn from(err: AlpacaError) -> Self {
        match err {
            AlpacaError::InvalidResponse(msg) | AlpacaError::VixSource(msg) => {
                TradeError::data_unavailable(msg)
            }
            other => TradeError::gateway(other.to_string()),
        }
    }
}

/// Result type alias for Alpaca operations.
pub type Result<T> = std::result::Result<T, AlpacaError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Error Construction Tests ====================

    #[test]
    fn test_api_error_construction() {
        let err = AlpacaError::api(403, "forbidden");
        assert!(matches!(
            err,
            AlpacaError::Api {
                status_code: 403,
                ..
            }
        ));
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("forbidden"));
    }

    #[test]
    fn test_rate_limit_error_construction() {
        let err = AlpacaError::rate_limit(30);
        assert!(err.to_string().contains("30"));
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_transient_errors() {
        assert!(AlpacaError::Network("reset".into()).is_transient());
        assert!(AlpacaError::Timeout("30s".into()).is_transient());
        assert!(AlpacaError::api(503, "unavailable").is_transient());
        assert!(!AlpacaError::api(404, "not found").is_transient());
        assert!(!AlpacaError::api(422, "bad qty").is_transient());
        assert!(!AlpacaError::rate_limit(60).is_transient());
        assert!(!AlpacaError::Configuration("no key".into()).is_transient());
    }

    // ==================== Conversion Tests ====================

    #[test]
    fn test_conversion_into_trade_error() {
        let err: TradeError = AlpacaError::api(500, "boom").into();
        assert!(matches!(err, TradeError::Gateway(_)));

        let err: TradeError = AlpacaError::invalid_response("no bar").into();
        assert!(matches!(err, TradeError::DataUnavailable(_)));

        let err = AlpacaError::api(403, "insufficient buying power").into_order_error();
        assert!(matches!(err, TradeError::OrderSubmission(ref m) if m.contains("buying power")));
    }
}
