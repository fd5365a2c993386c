// src/types.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Top-of-book snapshot fed into strategies and executors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    pub fn new(bid: Decimal, ask: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            bid,
            ask,
            timestamp,
        }
    }

    /// Quote with bid == ask, as produced from a historical close.
    pub fn from_close(close: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self::new(close, close, timestamp)
    }

    /// Reference price used by every indicator and executor.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }
}

/// Output of one strategy call. `Hold` means no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    #[default]
    Hold,
    Buy,
    Sell,
}

impl Signal {
    pub fn side(self) -> Option<Side> {
        match self {
            Signal::Hold => None,
            Signal::Buy => Some(Side::Buy),
            Signal::Sell => Some(Side::Sell),
        }
    }

    pub fn is_hold(self) -> bool {
        self == Signal::Hold
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Hold => write!(f, "hold"),
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub pair: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub last_trade: Decimal,
    pub rolling_24h_volume: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    pub fn quote(&self) -> Quote {
        Quote::new(self.bid, self.ask, self.timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub volume: Decimal,
}

/// Bids sorted by price descending, asks ascending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBook {
    /// Levels a taker on `side` would consume: asks for a buy, bids for a sell.
    pub fn levels_for(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: String,
    pub asset: String,
    pub balance: Decimal,
    pub reserved: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub pair: String,
}

/// Parameters of a limit order as handed to the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitOrder {
    pub pair: String,
    pub side: Side,
    pub price: Decimal,
    pub volume: Decimal,
    pub base_account_id: i64,
    pub counter_account_id: i64,
    pub client_order_id: String,
}

// --- Persisted execution records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub pair: String,
    pub side: Side,
    pub price: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceRecord {
    pub id: i64,
    pub trade_id: i64,
    pub index: usize,
    pub size: Decimal,
    pub weight: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn mid_price_is_average_of_bid_and_ask() {
        let q = Quote::new(dec!(99), dec!(101), Utc::now());
        assert_eq!(q.mid(), dec!(100));
    }

    #[test]
    fn book_side_selection() {
        let book = OrderBook {
            bids: vec![PriceLevel {
                price: dec!(9),
                volume: dec!(1),
            }],
            asks: vec![PriceLevel {
                price: dec!(11),
                volume: dec!(2),
            }],
        };
        assert_eq!(book.levels_for(Side::Buy)[0].price, dec!(11));
        assert_eq!(book.levels_for(Side::Sell)[0].price, dec!(9));
    }

    #[test]
    fn signal_maps_to_side() {
        assert_eq!(Signal::Buy.side(), Some(Side::Buy));
        assert_eq!(Signal::Hold.side(), None);
        assert!(Signal::Hold.is_hold());
    }
}
