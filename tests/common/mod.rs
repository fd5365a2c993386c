// tests/common/mod.rs
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use spot_sniper::error::StoreError;
use spot_sniper::storage::TradeStore;
use spot_sniper::types::{
    Balance, Candle, LimitOrder, OrderBook, OrderResponse, PriceLevel, SliceRecord, Ticker,
    TradeRecord,
};
use spot_sniper::connectors::traits::BrokerClient;
use spot_sniper::types::Side;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn candles(closes: &[Decimal]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| Candle {
            timestamp: t0() + Duration::minutes(i as i64),
            open: *c,
            high: *c,
            low: *c,
            close: *c,
            volume: Decimal::ONE,
        })
        .collect()
}

pub fn volume_candles(volumes: &[Decimal]) -> Vec<Candle> {
    volumes
        .iter()
        .enumerate()
        .map(|(i, v)| Candle {
            timestamp: t0() + Duration::minutes(i as i64),
            open: Decimal::ONE,
            high: Decimal::ONE,
            low: Decimal::ONE,
            close: Decimal::ONE,
            volume: *v,
        })
        .collect()
}

pub fn levels(volumes: &[Decimal]) -> Vec<PriceLevel> {
    volumes
        .iter()
        .enumerate()
        .map(|(i, v)| PriceLevel {
            price: Decimal::from(100 + i as i64),
            volume: *v,
        })
        .collect()
}

/// Scriptable broker: canned market data, recorded orders, optional
/// failures.
#[derive(Default)]
pub struct FakeBroker {
    pub tickers: Mutex<Vec<Ticker>>,
    pub book: Mutex<Option<OrderBook>>,
    pub candles: Mutex<Option<Vec<Candle>>>,
    pub orders: Mutex<Vec<LimitOrder>>,
    /// Order posts succeed until this many have been accepted.
    pub accept_orders: Mutex<Option<usize>>,
    pub ticker_calls: AtomicUsize,
    pub candle_requests: Mutex<Vec<(String, DateTime<Utc>, u32)>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_book(self, bids: &[Decimal], asks: &[Decimal]) -> Self {
        *self.book.lock().unwrap() = Some(OrderBook {
            bids: levels(bids),
            asks: levels(asks),
        });
        self
    }

    pub fn with_candles(self, candles: Vec<Candle>) -> Self {
        *self.candles.lock().unwrap() = Some(candles);
        self
    }

    pub fn with_tickers(self, tickers: Vec<Ticker>) -> Self {
        *self.tickers.lock().unwrap() = tickers;
        self
    }

    pub fn rejecting_after(self, accepted: usize) -> Self {
        *self.accept_orders.lock().unwrap() = Some(accepted);
        self
    }

    pub fn orders(&self) -> Vec<LimitOrder> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn get_tickers(&self, pairs: &[String]) -> Result<Vec<Ticker>> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tickers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| pairs.is_empty() || pairs.contains(&t.pair))
            .cloned()
            .collect())
    }

    async fn get_order_book(&self, _pair: &str) -> Result<OrderBook> {
        self.book
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("order book unavailable"))
    }

    async fn get_candles(
        &self,
        pair: &str,
        since: DateTime<Utc>,
        duration_secs: u32,
    ) -> Result<Vec<Candle>> {
        self.candle_requests
            .lock()
            .unwrap()
            .push((pair.to_string(), since, duration_secs));
        self.candles
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("candles unavailable"))
    }

    async fn post_limit_order(&self, order: &LimitOrder) -> Result<OrderResponse> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(limit) = *self.accept_orders.lock().unwrap() {
            if orders.len() >= limit {
                return Err(anyhow!("order rejected"));
            }
        }
        orders.push(order.clone());
        Ok(OrderResponse {
            id: format!("BX{}", orders.len()),
            pair: order.pair.clone(),
        })
    }

    async fn get_balances(&self) -> Result<Vec<Balance>> {
        Ok(Vec::new())
    }
}

/// Store that accepts trades but fails every slice write.
#[derive(Default)]
pub struct FailingSliceStore {
    pub trades: AtomicUsize,
}

#[async_trait]
impl TradeStore for FailingSliceStore {
    async fn save_trade(
        &self,
        _timestamp: DateTime<Utc>,
        _pair: &str,
        _side: Side,
        _price: Decimal,
        _volume: Decimal,
    ) -> Result<i64, StoreError> {
        Ok(self.trades.fetch_add(1, Ordering::SeqCst) as i64 + 1)
    }

    async fn save_slice(
        &self,
        _trade_id: i64,
        _index: usize,
        _size: Decimal,
        _weight: Decimal,
    ) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn list_trades(&self) -> Result<Vec<TradeRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn list_slices(&self, _trade_id: i64) -> Result<Vec<SliceRecord>, StoreError> {
        Ok(Vec::new())
    }
}
