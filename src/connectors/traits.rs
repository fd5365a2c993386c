// src/connectors/traits.rs
use crate::types::{Balance, Candle, LimitOrder, OrderBook, OrderResponse, Ticker};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Exchange operations the pipeline consumes.
///
/// Every call is a single request: no retries happen here, network and API
/// failures come back as errors.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Tickers for `pairs`, or for every market when `pairs` is empty.
    async fn get_tickers(&self, pairs: &[String]) -> Result<Vec<Ticker>>;

    async fn get_order_book(&self, pair: &str) -> Result<OrderBook>;

    /// Candles ordered by timestamp, starting at `since`.
    async fn get_candles(
        &self,
        pair: &str,
        since: DateTime<Utc>,
        duration_secs: u32,
    ) -> Result<Vec<Candle>>;

    async fn post_limit_order(&self, order: &LimitOrder) -> Result<OrderResponse>;

    async fn get_balances(&self) -> Result<Vec<Balance>>;
}
