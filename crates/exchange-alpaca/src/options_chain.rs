//! Option chain queries: listed contracts and latest quotes.

use std::collections::HashMap;

use chrono::NaiveDate;
use regime_options_core::{OptionContractRef, OptionQuote, OptionType};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::client::{AlpacaClient, Api};
use crate::error::Result;

/// Contracts per page requested from the listing endpoint.
const CONTRACT_PAGE_LIMIT: u32 = 1000;

/// Symbols per latest-quote request.
const QUOTE_BATCH_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct RawContractsPage {
    #[serde(default)]
    option_contracts: Vec<RawContract>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawContract {
    symbol: String,
    underlying_symbol: String,
    strike_price: Decimal,
    #[serde(rename = "type")]
    option_type: OptionType,
    expiration_date: NaiveDate,
}

impl From<RawContract> for OptionContractRef {
    fn from(raw: RawContract) -> Self {
        Self {
            symbol: raw.symbol,
            underlying: raw.underlying_symbol,
            strike_price: raw.strike_price,
            option_type: raw.option_type,
            expiration_date: raw.expiration_date,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQuotesResponse {
    #[serde(default)]
    quotes: HashMap<String, RawQuote>,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    bp: Option<Decimal>,
    ap: Option<Decimal>,
}

impl AlpacaClient {
    /// All active contracts on `underlying` expiring on `expiration`, following pagination.
    ///
    /// # Errors
    /// Returns error if any page fails.
    pub async fn option_contracts(
        &self,
        underlying: &str,
        expiration: NaiveDate,
    ) -> Result<Vec<OptionContractRef>> {
        debug!(underlying, %expiration, "Fetching option contracts");

        let mut contracts = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("underlying_symbols", underlying.to_string()),
                ("expiration_date", expiration.to_string()),
                ("status", "active".to_string()),
                ("limit", CONTRACT_PAGE_LIMIT.to_string()),
            ];
            if let Some(token) = page_token.take() {
                query.push(("page_token", token));
            }

            let page: RawContractsPage = self
                .get(Api::Trading, "/v2/options/contracts", &query)
                .await?;
            contracts.extend(page.option_contracts.into_iter().map(OptionContractRef::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(underlying, %expiration, count = contracts.len(), "Fetched option contracts");
        Ok(contracts)
    }

    /// Latest quote per symbol. Symbols the feed has no quote for are absent.
    ///
    /// # Errors
    /// Returns error if a request fails.
    pub async fn latest_option_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, OptionQuote>> {
        let mut quotes = HashMap::with_capacity(symbols.len());
        for batch in symbols.chunks(QUOTE_BATCH_SIZE) {
            let query = [
                ("symbols", batch.join(",")),
                ("feed", "indicative".to_string()),
            ];
            let response: RawQuotesResponse = self
                .get(Api::Data, "/v1beta1/options/quotes/latest", &query)
                .await?;
            quotes.extend(response.quotes.into_iter().map(|(symbol, raw)| {
                let quote = OptionQuote {
                    symbol: symbol.clone(),
                    bid: raw.bp,
                    ask: raw.ap,
                };
                (symbol, quote)
            }));
        }
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::tests::mock_client;
    use chrono::NaiveDate;
    use regime_options_core::OptionType;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn contract_json(symbol: &str, kind: &str, strike: &str) -> serde_json::Value {
        serde_json::json!({
            "id": format!("id-{symbol}"),
            "symbol": symbol,
            "name": "SPY Oct 17 2026",
            "status": "active",
            "tradable": true,
            "expiration_date": "2026-10-17",
            "root_symbol": "SPY",
            "underlying_symbol": "SPY",
            "type": kind,
            "style": "american",
            "strike_price": strike,
            "size": "100"
        })
    }

    #[tokio::test]
    async fn test_option_contracts_follow_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/options/contracts"))
            .and(query_param("page_token", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "option_contracts": [contract_json("SPY261017P00410000", "put", "410")],
                "next_page_token": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/options/contracts"))
            .and(query_param("underlying_symbols", "SPY"))
            .and(query_param("expiration_date", "2026-10-17"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "option_contracts": [contract_json("SPY261017C00415000", "call", "415")],
                "next_page_token": "page-2"
            })))
            .mount(&server)
            .await;

        let expiry = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let contracts = mock_client(&server)
            .option_contracts("SPY", expiry)
            .await
            .unwrap();

        assert_eq!(contracts.len(), 2);
        assert_eq!(contracts[0].option_type, OptionType::Call);
        assert_eq!(contracts[0].strike_price, dec!(415));
        assert_eq!(contracts[1].option_type, OptionType::Put);
        assert_eq!(contracts[1].expiration_date, expiry);
    }

    #[tokio::test]
    async fn test_latest_quotes_keep_missing_sides() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta1/options/quotes/latest"))
            .and(query_param("symbols", "A,B"))
            .and(query_param("feed", "indicative"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "quotes": {
                    "A": {"bp": 1.25, "ap": 1.35, "bs": 10, "as": 12},
                    "B": {"ap": 0.4}
                }
            })))
            .mount(&server)
            .await;

        let quotes = mock_client(&server)
            .latest_option_quotes(&["A".to_string(), "B".to_string()])
            .await
            .unwrap();

        assert_eq!(quotes["A"].bid, Some(dec!(1.25)));
        assert_eq!(quotes["A"].ask, Some(dec!(1.35)));
        assert_eq!(quotes["B"].bid, None);
        assert_eq!(quotes["B"].ask, Some(dec!(0.4)));
    }
}
