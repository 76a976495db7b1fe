//! Order submission: multi-leg (`mleg`) and single-leg market orders.

use regime_options_core::{
    MultiLegOrder, OrderAck, OrderRequest, OrderSide, SingleLegOrder, TimeInForce,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{AlpacaClient, Api};
use crate::error::Result;

#[derive(Debug, Serialize)]
struct LegBody<'a> {
    symbol: &'a str,
    side: OrderSide,
    ratio_qty: String,
}

/// Request body for `POST /v2/orders`.
#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    symbol: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    side: Option<OrderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_class: Option<&'static str>,
    qty: String,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: TimeInForce,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    legs: Vec<LegBody<'a>>,
}

impl<'a> From<&'a MultiLegOrder> for OrderBody<'a> {
    fn from(order: &'a MultiLegOrder) -> Self {
        Self {
            symbol: None,
            side: None,
            order_class: Some("mleg"),
            qty: order.qty().to_string(),
            order_type: "market",
            time_in_force: order.time_in_force(),
            legs: order
                .legs()
                .iter()
                .map(|leg| LegBody {
                    symbol: &leg.symbol,
                    side: leg.side,
                    ratio_qty: leg.ratio_qty.to_string(),
                })
                .collect(),
        }
    }
}

impl<'a> From<&'a SingleLegOrder> for OrderBody<'a> {
    fn from(order: &'a SingleLegOrder) -> Self {
        Self {
            symbol: Some(&order.symbol),
            side: Some(order.side),
            order_class: None,
            qty: order.qty.to_string(),
            order_type: "market",
            time_in_force: order.time_in_force,
            legs: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    id: String,
    status: String,
}

impl AlpacaClient {
    /// Submits an order and returns the brokerage acknowledgement.
    ///
    /// # Errors
    /// Returns error if the order is rejected or the request fails.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck> {
        let body = match order {
            OrderRequest::MultiLeg(order) => OrderBody::from(order),
            OrderRequest::SingleLeg(order) => OrderBody::from(order),
        };
        let raw: RawOrder = self.post(Api::Trading, "/v2/orders", &body).await?;

        info!(
            order_id = raw.id,
            status = raw.status,
            legs = body.legs.len().max(1),
            qty = body.qty,
            "Order accepted"
        );

        Ok(OrderAck {
            id: raw.id,
            status: raw.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::mock_client;
    use crate::error::AlpacaError;
    use regime_options_core::OrderLeg;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn condor() -> MultiLegOrder {
        MultiLegOrder::new(
            vec![
                OrderLeg::new("SPY261017C00415000", OrderSide::Sell),
                OrderLeg::new("SPY261017C00420000", OrderSide::Buy),
                OrderLeg::new("SPY261017P00410000", OrderSide::Sell),
                OrderLeg::new("SPY261017P00405000", OrderSide::Buy),
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_multi_leg_body_shape() {
        let order = condor();
        let body = serde_json::to_value(OrderBody::from(&order)).unwrap();
        assert_eq!(body["order_class"], "mleg");
        assert_eq!(body["qty"], "2");
        assert_eq!(body["type"], "market");
        assert_eq!(body["time_in_force"], "day");
        assert_eq!(body["legs"][0]["side"], "sell");
        assert_eq!(body["legs"][1]["ratio_qty"], "1");
        assert!(body.get("symbol").is_none());
    }

    #[test]
    fn test_single_leg_body_shape() {
        let order = SingleLegOrder {
            symbol: "SPY261017C00415000".to_string(),
            side: OrderSide::Buy,
            qty: 1,
            time_in_force: TimeInForce::Day,
        };
        let body = serde_json::to_value(OrderBody::from(&order)).unwrap();
        assert_eq!(body["symbol"], "SPY261017C00415000");
        assert_eq!(body["side"], "buy");
        assert!(body.get("legs").is_none());
        assert!(body.get("order_class").is_none());
    }

    #[tokio::test]
    async fn test_place_multi_leg_order() {
        let server = MockServer::start().await;
        let order = condor();
        let expected = serde_json::to_value(OrderBody::from(&order)).unwrap();
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .and(body_json(expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "61e69015-8549-4bfd-b9c3-01e75843f47d",
                "status": "accepted",
                "order_class": "mleg"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = mock_client(&server)
            .place_order(&OrderRequest::MultiLeg(order))
            .await
            .unwrap();
        assert_eq!(ack.status, "accepted");
        assert_eq!(ack.id, "61e69015-8549-4bfd-b9c3-01e75843f47d");
    }

    #[tokio::test]
    async fn test_rejected_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"code":40310000,"message":"insufficient options buying power"}"#),
            )
            .mount(&server)
            .await;

        let err = mock_client(&server)
            .place_order(&OrderRequest::MultiLeg(condor()))
            .await
            .unwrap_err();
        assert!(matches!(err, AlpacaError::Api { status_code: 403, .. }));
    }

    #[tokio::test]
    async fn test_order_is_not_resubmitted_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let err = mock_client(&server)
            .place_order(&OrderRequest::MultiLeg(condor()))
            .await
            .unwrap_err();
        assert!(matches!(err, AlpacaError::Api { status_code: 502, .. }));
    }
}
