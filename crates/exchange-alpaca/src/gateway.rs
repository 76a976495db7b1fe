//! Collaborator trait implementations over the Alpaca and Yahoo clients.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use regime_options_core::{
    AccountSnapshot, BrokerPosition, BrokerageGateway, MarketDataFeed, OptionContractRef,
    OptionQuote, OrderAck, OrderRequest, PriceBar, Timeframe, TradeResult,
};

use crate::client::AlpacaClient;
use crate::vix::YahooVixClient;

#[async_trait]
impl BrokerageGateway for AlpacaClient {
    async fn get_account(&self) -> TradeResult<AccountSnapshot> {
        Ok(self.account().await?)
    }

    async fn get_all_positions(&self) -> TradeResult<Vec<BrokerPosition>> {
        Ok(self.positions().await?)
    }

    async fn get_option_contracts(
        &self,
        underlying: &str,
        expiration: NaiveDate,
    ) -> TradeResult<Vec<OptionContractRef>> {
        Ok(self.option_contracts(underlying, expiration).await?)
    }

    async fn get_option_latest_quotes(
        &self,
        symbols: &[String],
    ) -> TradeResult<HashMap<String, OptionQuote>> {
        Ok(self.latest_option_quotes(symbols).await?)
    }

    async fn submit_order(&self, order: &OrderRequest) -> TradeResult<OrderAck> {
        self.place_order(order)
            .await
            .map_err(|e| e.into_order_error())
    }
}

/// Stock bars from Alpaca, VIX history from Yahoo.
#[derive(Debug, Clone)]
pub struct AlpacaMarketFeed {
    client: AlpacaClient,
    vix: YahooVixClient,
}

impl AlpacaMarketFeed {
    #[must_use]
    pub fn new(client: AlpacaClient, vix: YahooVixClient) -> Self {
        Self { client, vix }
    }
}

#[async_trait]
impl MarketDataFeed for AlpacaMarketFeed {
    async fn get_latest_bar(&self, symbol: &str) -> TradeResult<Option<PriceBar>> {
        Ok(self.client.latest_bar(symbol).await?)
    }

    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> TradeResult<Vec<PriceBar>> {
        Ok(self.client.bars(symbol, timeframe, start, end).await?)
    }

    async fn get_vix_history(&self, period_days: u32) -> TradeResult<Vec<f64>> {
        Ok(self.vix.daily_closes(period_days).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_client;
    use regime_options_core::{MultiLegOrder, OrderLeg, OrderSide, TradeError};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_rejected_order_maps_to_order_submission() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .respond_with(ResponseTemplate::new(422).set_body_string("qty must be > 0"))
            .mount(&server)
            .await;

        let client = mock_client(&server);
        let order = MultiLegOrder::new(
            vec![
                OrderLeg::new("SPY261017P00410000", OrderSide::Sell),
                OrderLeg::new("SPY261017P00405000", OrderSide::Buy),
            ],
            1,
        )
        .unwrap();
        let err = client
            .submit_order(&OrderRequest::MultiLeg(order))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeError::OrderSubmission(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = mock_client(&server).get_account().await.unwrap_err();
        assert!(matches!(err, TradeError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_feed_reads_vix_from_yahoo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": {"result": [{"indicators": {"quote": [{"close": [16.5, 17.5]}]}}], "error": null}
            })))
            .mount(&server)
            .await;

        let vix = YahooVixClient::new("^VIX", 5)
            .unwrap()
            .with_base_url(server.uri());
        let feed = AlpacaMarketFeed::new(mock_client(&server), vix);
        assert_eq!(feed.get_vix_history(5).await.unwrap(), vec![16.5, 17.5]);
    }
}
