//! Account queries: portfolio value and open positions.

use regime_options_core::{AccountSnapshot, BrokerPosition};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::client::{AlpacaClient, Api};
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct RawAccount {
    portfolio_value: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    symbol: String,
    qty: Decimal,
    market_value: Option<Decimal>,
}

impl From<RawPosition> for BrokerPosition {
    fn from(raw: RawPosition) -> Self {
        Self {
            symbol: raw.symbol,
            qty: raw.qty,
            market_value: raw.market_value,
        }
    }
}

impl AlpacaClient {
    /// Current account value.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn account(&self) -> Result<AccountSnapshot> {
        let raw: RawAccount = self.get(Api::Trading, "/v2/account", &[]).await?;
        debug!(portfolio_value = %raw.portfolio_value, "Fetched account");
        Ok(AccountSnapshot {
            portfolio_value: raw.portfolio_value,
        })
    }

    /// Every open position, stock and option alike.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn positions(&self) -> Result<Vec<BrokerPosition>> {
        let raw: Vec<RawPosition> = self.get(Api::Trading, "/v2/positions", &[]).await?;
        Ok(raw.into_iter().map(BrokerPosition::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::tests::mock_client;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_account_parses_string_amounts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "acct-1",
                "status": "ACTIVE",
                "cash": "25000.10",
                "portfolio_value": "100250.55"
            })))
            .mount(&server)
            .await;

        let account = mock_client(&server).account().await.unwrap();
        assert_eq!(account.portfolio_value, dec!(100250.55));
    }

    #[tokio::test]
    async fn test_positions_keep_sign_of_short_legs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/positions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"symbol": "SPY261017C00415000", "qty": "-2", "market_value": "-240"},
                {"symbol": "SPY261017C00420000", "qty": "2", "market_value": null}
            ])))
            .mount(&server)
            .await;

        let positions = mock_client(&server).positions().await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].qty, dec!(-2));
        assert_eq!(positions[0].market_value, Some(dec!(-240)));
        assert_eq!(positions[1].market_value, None);
    }
}
