//! Alpaca REST client with rate limiting.
//!
//! Wraps the trading API (account, positions, option contracts, orders) and
//! the market data API (stock bars, option quotes) behind one client sharing
//! a single request budget.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use regime_options_core::AlpacaSettings;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::{AlpacaError, Result};

// =============================================================================
// Constants
// =============================================================================

/// Paper trading API base URL.
pub const ALPACA_PAPER_URL: &str = "https://paper-api.alpaca.markets";

/// Live trading API base URL.
pub const ALPACA_LIVE_URL: &str = "https://api.alpaca.markets";

/// Market data API base URL.
pub const ALPACA_DATA_URL: &str = "https://data.alpaca.markets";

pub const API_KEY_ENV: &str = "ALPACA_API_KEY";
pub const SECRET_KEY_ENV: &str = "ALPACA_SECRET_KEY";

// =============================================================================
// Configuration
// =============================================================================

/// API key pair. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct AlpacaCredentials {
    pub api_key: String,
    pub secret_key: SecretString,
}

impl std::fmt::Debug for AlpacaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaCredentials")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl AlpacaCredentials {
    #[must_use]
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: SecretString::from(secret_key.into()),
        }
    }

    /// Reads `ALPACA_API_KEY` and `ALPACA_SECRET_KEY`.
    ///
    /// # Errors
    /// Returns [`AlpacaError::Configuration`] if either variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AlpacaError::Configuration(format!("{name} is not set")))
        };
        Ok(Self::new(read(API_KEY_ENV)?, read(SECRET_KEY_ENV)?))
    }
}

/// Configuration for the Alpaca client.
#[derive(Debug, Clone)]
pub struct AlpacaConfig {
    /// Trading API base URL.
    pub trading_url: String,

    /// Market data API base URL.
    pub data_url: String,

    /// Stock bar feed (`iex` works on free accounts, `sip` needs a subscription).
    pub stock_feed: String,

    /// Requests per minute limit.
    pub requests_per_minute: NonZeroU32,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for AlpacaConfig {
    fn default() -> Self {
        Self {
            trading_url: ALPACA_PAPER_URL.to_string(),
            data_url: ALPACA_DATA_URL.to_string(),
            stock_feed: "iex".to_string(),
            requests_per_minute: nonzero!(180u32),
            timeout_secs: 30,
        }
    }
}

impl AlpacaConfig {
    /// Live trading configuration.
    #[must_use]
    pub fn live() -> Self {
        Self {
            trading_url: ALPACA_LIVE_URL.to_string(),
            ..Self::default()
        }
    }

    /// Builds a configuration from the `[alpaca]` settings section.
    #[must_use]
    pub fn from_settings(settings: &AlpacaSettings) -> Self {
        let base = if settings.paper {
            Self::default()
        } else {
            Self::live()
        };
        let mut config = base.with_timeout_secs(settings.timeout_secs);
        if let Some(rpm) = NonZeroU32::new(settings.requests_per_minute) {
            config = config.with_rate_limit(rpm);
        }
        if let Some(url) = &settings.trading_url {
            config = config.with_trading_url(url.clone());
        }
        if let Some(url) = &settings.data_url {
            config = config.with_data_url(url.clone());
        }
        config
    }

    /// Sets the trading API URL.
    #[must_use]
    pub fn with_trading_url(mut self, url: impl Into<String>) -> Self {
        self.trading_url = url.into();
        self
    }

    /// Sets the market data API URL.
    #[must_use]
    pub fn with_data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = url.into();
        self
    }

    /// Sets the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

// =============================================================================
// AlpacaClient
// =============================================================================

/// Attempts per GET before a transient failure is returned.
pub const MAX_GET_ATTEMPTS: u32 = 3;

/// Base pause between GET attempts, scaled by the attempt number.
const GET_RETRY_BACKOFF: Duration = Duration::from_millis(250);

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Which Alpaca host a request goes to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Api {
    Trading,
    Data,
}

/// Alpaca REST client. Clones share the HTTP pool and the rate limiter.
#[derive(Clone)]
pub struct AlpacaClient {
    config: AlpacaConfig,
    credentials: AlpacaCredentials,
    http: Client,
    rate_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("trading_url", &self.config.trading_url)
            .field("data_url", &self.config.data_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl AlpacaClient {
    /// Creates a new client.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: AlpacaConfig, credentials: AlpacaCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AlpacaError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            config,
            credentials,
            http,
            rate_limiter,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AlpacaConfig {
        &self.config
    }

    fn base_url(&self, api: Api) -> &str {
        match api {
            Api::Trading => &self.config.trading_url,
            Api::Data => &self.config.data_url,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("APCA-API-KEY-ID", &self.credentials.api_key)
            .header(
                "APCA-API-SECRET-KEY",
                self.credentials.secret_key.expose_secret(),
            )
            .header("Accept", "application/json")
    }

    /// Waits for rate limiter and makes an authenticated GET request.
    ///
    /// Transient failures are retried up to [`MAX_GET_ATTEMPTS`] times in total.
    /// Orders go through [`Self::post`] and are never repeated.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(
        &self,
        api: Api,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url(api), path);
        let mut attempt = 1;
        loop {
            self.rate_limiter.until_ready().await;
            tracing::debug!("GET {} params={} attempt={}", url, query.len(), attempt);

            let result = match self
                .authorized(self.http.get(&url))
                .query(query)
                .send()
                .await
            {
                Ok(response) => Self::handle_response(response).await,
                Err(e) => Err(e.into()),
            };

            match result {
                Err(e) if e.is_transient() && attempt < MAX_GET_ATTEMPTS => {
                    tracing::warn!(%url, attempt, error = %e, "GET failed, retrying");
                    tokio::time::sleep(GET_RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Waits for rate limiter and makes an authenticated POST request.
    pub(crate) async fn post<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        api: Api,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url(api), path);
        let body_json = serde_json::to_string(body)?;

        tracing::debug!("POST {} body_len={}", url, body_json.len());

        let response = self
            .authorized(self.http.post(&url))
            .header("Content-Type", "application/json")
            .body(body_json)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handles API response, converting errors appropriately.
    pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AlpacaError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AlpacaError::api(status.as_u16(), text));
        }

        let body = response.json::<T>().await?;
        Ok(body)
    }
}
