// src/connectors/luno.rs
use crate::connectors::messages::{
    BalancesResponse, CandlesResponse, ErrorResponse, OrderBookResponse, PostOrderResponse,
    TickersResponse,
};
use crate::connectors::traits::BrokerClient;
use crate::types::{Balance, Candle, LimitOrder, OrderBook, OrderResponse, Side, Ticker};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Luno REST client authenticated with an API key id/secret pair.
pub struct LunoClient {
    api_key_id: String,
    api_key_secret: String,
    http_client: Client,
    base_rest_url: String,
}

impl LunoClient {
    pub fn new(api_key_id: String, api_key_secret: String) -> Self {
        Self::with_base_url(api_key_id, api_key_secret, "https://api.luno.com".to_string())
    }

    pub fn with_base_url(api_key_id: String, api_key_secret: String, base_url: String) -> Self {
        Self {
            api_key_id,
            api_key_secret,
            http_client: Client::new(),
            base_rest_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_rest_url, endpoint);
        self.http_client
            .request(method, url)
            .basic_auth(&self.api_key_id, Some(&self.api_key_secret))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| format!("{} ({})", e.error, e.error_code))
                .unwrap_or(body);
            return Err(anyhow!("luno request failed with {}: {}", status, message));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl BrokerClient for LunoClient {
    async fn get_tickers(&self, pairs: &[String]) -> Result<Vec<Ticker>> {
        let query: Vec<(&str, &str)> = pairs.iter().map(|p| ("pair", p.as_str())).collect();
        let resp: TickersResponse = self
            .send(self.request(Method::GET, "/api/1/tickers").query(&query))
            .await?;

        resp.into_active()
    }

    async fn get_order_book(&self, pair: &str) -> Result<OrderBook> {
        let resp: OrderBookResponse = self
            .send(
                self.request(Method::GET, "/api/1/orderbook_top")
                    .query(&[("pair", pair)]),
            )
            .await?;
        Ok(resp.into())
    }

    async fn get_candles(
        &self,
        pair: &str,
        since: DateTime<Utc>,
        duration_secs: u32,
    ) -> Result<Vec<Candle>> {
        let query = [
            ("pair", pair.to_string()),
            ("since", since.timestamp_millis().to_string()),
            ("duration", duration_secs.to_string()),
        ];
        let resp: CandlesResponse = self
            .send(
                self.request(Method::GET, "/api/exchange/1/candles")
                    .query(&query),
            )
            .await?;

        let mut candles = resp
            .candles
            .into_iter()
            .map(Candle::try_from)
            .collect::<Result<Vec<_>>>()?;
        candles.sort_by_key(|c| c.timestamp);
        debug!("Fetched {} candles for {}", candles.len(), pair);
        Ok(candles)
    }

    async fn post_limit_order(&self, order: &LimitOrder) -> Result<OrderResponse> {
        let order_type = match order.side {
            Side::Buy => "BID",
            Side::Sell => "ASK",
        };

        let mut params = vec![
            ("pair", order.pair.clone()),
            ("type", order_type.to_string()),
            ("volume", order.volume.to_string()),
            ("price", order.price.to_string()),
            ("client_order_id", order.client_order_id.clone()),
        ];
        if order.base_account_id != 0 {
            params.push(("base_account_id", order.base_account_id.to_string()));
        }
        if order.counter_account_id != 0 {
            params.push(("counter_account_id", order.counter_account_id.to_string()));
        }

        info!(
            "Sending Order: {} {} {} @ {} (client id {})",
            order_type, order.volume, order.pair, order.price, order.client_order_id
        );

        let resp: PostOrderResponse = self
            .send(self.request(Method::POST, "/api/1/postorder").form(&params))
            .await?;

        Ok(OrderResponse {
            id: resp.order_id,
            pair: order.pair.clone(),
        })
    }

    async fn get_balances(&self) -> Result<Vec<Balance>> {
        let resp: BalancesResponse = self
            .send(self.request(Method::GET, "/api/1/balance"))
            .await?;
        Ok(resp.balance.into_iter().map(Balance::from).collect())
    }
}
