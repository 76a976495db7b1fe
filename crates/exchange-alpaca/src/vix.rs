//! Daily VIX closes from the Yahoo Finance chart API.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{AlpacaError, Result};

/// Yahoo Finance chart API base URL.
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo rejects requests without a browser-like user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) regime-options/0.1";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Client for daily index closes.
#[derive(Debug, Clone)]
pub struct YahooVixClient {
    http: Client,
    base_url: String,
    symbol: String,
}

impl YahooVixClient {
    /// Creates a client for `symbol` (normally `^VIX`).
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(symbol: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AlpacaError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: YAHOO_CHART_URL.to_string(),
            symbol: symbol.into(),
        })
    }

    /// Sets a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Daily closes over the trailing `period_days`, oldest first. Null closes
    /// (holidays, the still-open session) are skipped.
    ///
    /// # Errors
    /// Returns error if the request fails or Yahoo reports an error.
    pub async fn daily_closes(&self, period_days: u32) -> Result<Vec<f64>> {
        let url = self.chart_url()?;
        debug!("GET {} range={}d", url, period_days);

        let response = self
            .http
            .get(url)
            .query(&[("range", format!("{period_days}d")), ("interval", "1d".to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AlpacaError::VixSource(format!("HTTP {status}: {text}")));
        }

        let body: ChartResponse = response.json().await?;
        if let Some(err) = body.chart.error.filter(|e| !e.is_null()) {
            return Err(AlpacaError::VixSource(format!("chart error: {err}")));
        }

        let closes: Vec<f64> = body
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|r| r.indicators.quote.into_iter().next())
            .map(|q| q.close.into_iter().flatten().collect())
            .unwrap_or_default();

        debug!(symbol = self.symbol, count = closes.len(), "Fetched VIX closes");
        Ok(closes)
    }

    /// `<base>/v8/finance/chart/<symbol>` with the symbol encoded as a path segment.
    fn chart_url(&self) -> Result<Url> {
        let invalid = || AlpacaError::Configuration(format!("invalid VIX URL {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", self.symbol.as_str()]);
        Ok(url)
    }
}
