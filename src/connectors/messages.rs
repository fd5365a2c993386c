// src/connectors/messages.rs
//! Luno REST payloads. Prices and volumes arrive as decimal strings,
//! timestamps as unix milliseconds.
use crate::types::{Balance, Candle, OrderBook, PriceLevel, Ticker};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

fn millis(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts).ok_or_else(|| anyhow!("timestamp {} out of range", ts))
}

#[derive(Debug, Deserialize)]
pub struct LunoTicker {
    pub pair: String,
    pub timestamp: i64,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last_trade: Decimal,
    pub rolling_24_hour_volume: Decimal,
    #[serde(default)]
    pub status: String,
}

impl LunoTicker {
    /// POSTONLY and DISABLED markets cannot take a mid-price limit order.
    /// A missing status counts as active.
    pub fn is_active(&self) -> bool {
        self.status.is_empty() || self.status == "ACTIVE"
    }
}

#[derive(Debug, Deserialize)]
pub struct TickersResponse {
    #[serde(default)]
    pub tickers: Vec<LunoTicker>,
}

impl TickersResponse {
    /// Tickers of tradeable markets, in response order.
    pub fn into_active(self) -> Result<Vec<Ticker>> {
        self.tickers
            .into_iter()
            .filter(LunoTicker::is_active)
            .map(Ticker::try_from)
            .collect()
    }
}

impl TryFrom<LunoTicker> for Ticker {
    type Error = anyhow::Error;

    fn try_from(t: LunoTicker) -> Result<Self> {
        Ok(Ticker {
            timestamp: millis(t.timestamp)?,
            pair: t.pair,
            bid: t.bid,
            ask: t.ask,
            last_trade: t.last_trade,
            rolling_24h_volume: t.rolling_24_hour_volume,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LunoLevel {
    pub price: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OrderBookResponse {
    #[serde(default)]
    pub bids: Vec<LunoLevel>,
    #[serde(default)]
    pub asks: Vec<LunoLevel>,
}

impl From<OrderBookResponse> for OrderBook {
    fn from(r: OrderBookResponse) -> Self {
        let level = |l: LunoLevel| PriceLevel {
            price: l.price,
            volume: l.volume,
        };
        OrderBook {
            bids: r.bids.into_iter().map(level).collect(),
            asks: r.asks.into_iter().map(level).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LunoCandle {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CandlesResponse {
    #[serde(default)]
    pub candles: Vec<LunoCandle>,
}

impl TryFrom<LunoCandle> for Candle {
    type Error = anyhow::Error;

    fn try_from(c: LunoCandle) -> Result<Self> {
        Ok(Candle {
            timestamp: millis(c.timestamp)?,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PostOrderResponse {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LunoBalance {
    pub account_id: String,
    pub asset: String,
    pub balance: Decimal,
    pub reserved: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BalancesResponse {
    #[serde(default)]
    pub balance: Vec<LunoBalance>,
}

impl From<LunoBalance> for Balance {
    fn from(b: LunoBalance) -> Self {
        Balance {
            account_id: b.account_id,
            asset: b.asset,
            balance: b.balance,
            reserved: b.reserved,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_code: String,
}
