//! Stock bars for the underlying.

use chrono::{DateTime, SecondsFormat, Utc};
use regime_options_core::{PriceBar, Timeframe};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::client::{AlpacaClient, Api};
use crate::error::Result;

const BAR_PAGE_LIMIT: u32 = 10_000;

#[derive(Debug, Deserialize)]
struct RawBar {
    t: DateTime<Utc>,
    o: Decimal,
    h: Decimal,
    l: Decimal,
    c: Decimal,
    #[serde(default)]
    v: u64,
}

impl From<RawBar> for PriceBar {
    fn from(raw: RawBar) -> Self {
        Self {
            timestamp: raw.t,
            open: raw.o,
            high: raw.h,
            low: raw.l,
            close: raw.c,
            volume: raw.v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLatestBar {
    bar: Option<RawBar>,
}

#[derive(Debug, Deserialize)]
struct RawBarsPage {
    #[serde(default)]
    bars: Option<Vec<RawBar>>,
    next_page_token: Option<String>,
}

impl AlpacaClient {
    /// Most recent bar for `symbol`, if the feed has one.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn latest_bar(&self, symbol: &str) -> Result<Option<PriceBar>> {
        let path = format!("/v2/stocks/{symbol}/bars/latest");
        let query = [("feed", self.config().stock_feed.clone())];
        let raw: RawLatestBar = self.get(Api::Data, &path, &query).await?;
        Ok(raw.bar.map(PriceBar::from))
    }

    /// Bars for `symbol` between `start` and `end`, oldest first, following pagination.
    ///
    /// # Errors
    /// Returns error if any page fails.
    pub async fn bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>> {
        let path = format!("/v2/stocks/{symbol}/bars");
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("timeframe", timeframe.as_str().to_string()),
                ("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("limit", BAR_PAGE_LIMIT.to_string()),
                ("feed", self.config().stock_feed.clone()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("page_token", token));
            }

            let page: RawBarsPage = self.get(Api::Data, &path, &query).await?;
            bars.extend(page.bars.unwrap_or_default().into_iter().map(PriceBar::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(symbol, timeframe = timeframe.as_str(), count = bars.len(), "Fetched bars");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::tests::mock_client;
    use chrono::{Duration, TimeZone, Utc};
    use regime_options_core::Timeframe;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_latest_bar() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/SPY/bars/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "SPY",
                "bar": {"t": "2026-10-16T19:59:00Z", "o": 412.1, "h": 412.4, "l": 411.9, "c": 412.2, "v": 10500}
            })))
            .mount(&server)
            .await;

        let bar = mock_client(&server).latest_bar("SPY").await.unwrap().unwrap();
        assert_eq!(bar.close, dec!(412.2));
        assert_eq!(bar.volume, 10500);
    }

    #[tokio::test]
    async fn test_latest_bar_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/SPY/bars/latest"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"symbol": "SPY"})),
            )
            .mount(&server)
            .await;

        assert!(mock_client(&server).latest_bar("SPY").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hourly_bars_are_paged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/SPY/bars"))
            .and(query_param("page_token", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bars": [{"t": "2026-10-16T15:00:00Z", "o": 2, "h": 2, "l": 2, "c": 2, "v": 1}],
                "next_page_token": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/SPY/bars"))
            .and(query_param("timeframe", "1Hour"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bars": [{"t": "2026-10-16T14:00:00Z", "o": 1, "h": 1, "l": 1, "c": 1, "v": 1}],
                "next_page_token": "next"
            })))
            .mount(&server)
            .await;

        let end = Utc.with_ymd_and_hms(2026, 10, 16, 20, 0, 0).unwrap();
        let bars = mock_client(&server)
            .bars("SPY", Timeframe::Hour, end - Duration::days(5), end)
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(1));
        assert_eq!(bars[1].close, dec!(2));
    }
}
