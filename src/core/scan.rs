// src/core/scan.rs
use crate::config::{ScanConfig, TradingConfig};
use crate::connectors::traits::BrokerClient;
use crate::strategies::bollinger::mean_and_stddev;
use crate::strategies::rsi::relative_strength;
use crate::strategies::{MacdStrategy, Strategy};
use crate::types::{Quote, Signal, Ticker};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

const CANDLE_SECS: u32 = 60;
const DEFAULT_DEPTH_LEVELS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub pair: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub volume: Decimal,
    /// Consecutive scans on which the spread exceeded the entry threshold.
    pub hits: usize,
    pub signal: Signal,
}

/// Spread breakout scanner with confirmation.
///
/// A pair is flagged `Buy` once `ask > bid * (1 + entry_threshold)` has held
/// on `confirmations` consecutive scans and the indicator checks agree.
/// Pairs dropped by the volume, volatility or depth filters are left out of
/// the results and their count is untouched. Any miss resets the count.
///
/// Market data that cannot be fetched, or is too short, skips that check.
#[derive(Debug, Clone)]
pub struct ScanSession {
    min_volume: Decimal,
    confirmations: usize,
    hits: HashMap<String, usize>,
}

impl ScanSession {
    pub const DEFAULT_CONFIRMATIONS: usize = 2;

    pub fn new(min_volume: Decimal) -> Self {
        Self {
            min_volume,
            confirmations: Self::DEFAULT_CONFIRMATIONS,
            hits: HashMap::new(),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.min_volume).with_confirmations(config.confirmations)
    }

    pub fn with_confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations.max(1);
        self
    }

    pub fn hits(&self, pair: &str) -> usize {
        self.hits.get(pair).copied().unwrap_or(0)
    }

    /// Scans every ticker with the same trading parameters.
    pub async fn scan(
        &mut self,
        client: &dyn BrokerClient,
        tickers: &[Ticker],
        config: &TradingConfig,
    ) -> Vec<ScanResult> {
        let mut results = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            if let Some(result) = self.scan_ticker(client, ticker, config).await {
                results.push(result);
            }
        }
        results
    }

    /// One ticker through the filters. `None` when a filter dropped it.
    pub async fn scan_ticker(
        &mut self,
        client: &dyn BrokerClient,
        ticker: &Ticker,
        config: &TradingConfig,
    ) -> Option<ScanResult> {
        if self.min_volume > Decimal::ZERO && ticker.rolling_24h_volume < self.min_volume {
            return None;
        }
        if !spread_beats_volatility(client, ticker, config).await {
            debug!("{}: spread below volatility band", ticker.pair);
            return None;
        }
        if !book_covers_stake(client, ticker, config).await {
            debug!("{}: not enough bid depth for stake", ticker.pair);
            return None;
        }

        let hit = config.entry_threshold > Decimal::ZERO
            && ticker.ask > ticker.bid * (Decimal::ONE + config.entry_threshold);
        let count = self.hits.entry(ticker.pair.clone()).or_insert(0);
        *count = if hit { *count + 1 } else { 0 };
        let hits = *count;

        let confirmed =
            hits >= self.confirmations && indicators_confirm(client, ticker, config).await;
        let signal = if confirmed { Signal::Buy } else { Signal::Hold };
        Some(ScanResult {
            pair: ticker.pair.clone(),
            bid: ticker.bid,
            ask: ticker.ask,
            volume: ticker.rolling_24h_volume,
            hits,
            signal,
        })
    }
}

/// Closes of the last `count` one-minute candles, or `None` when fewer are
/// available or the fetch failed.
async fn recent_closes(
    client: &dyn BrokerClient,
    ticker: &Ticker,
    count: usize,
) -> Option<Vec<Decimal>> {
    let since = ticker.timestamp - Duration::minutes(count as i64 + 1);
    let candles = match client.get_candles(&ticker.pair, since, CANDLE_SECS).await {
        Ok(candles) => candles,
        Err(e) => {
            debug!("{}: candles unavailable for scan: {}", ticker.pair, e);
            return None;
        }
    };
    if candles.len() < count {
        return None;
    }
    Some(candles[candles.len() - count..].iter().map(|c| c.close).collect())
}

async fn spread_beats_volatility(
    client: &dyn BrokerClient,
    ticker: &Ticker,
    config: &TradingConfig,
) -> bool {
    if config.bb_period <= 1 || config.bb_multiplier <= Decimal::ZERO {
        return true;
    }
    let Some(closes) = recent_closes(client, ticker, config.bb_period + 1).await else {
        return true;
    };
    let (_, stddev) = mean_and_stddev(closes);
    ticker.ask - ticker.bid >= stddev * config.bb_multiplier
}

async fn book_covers_stake(
    client: &dyn BrokerClient,
    ticker: &Ticker,
    config: &TradingConfig,
) -> bool {
    let book = match client.get_order_book(&ticker.pair).await {
        Ok(book) => book,
        Err(e) => {
            debug!("{}: order book unavailable for scan: {}", ticker.pair, e);
            return true;
        }
    };
    let levels = match config.vwap_orderbook_depth_levels {
        0 => DEFAULT_DEPTH_LEVELS,
        n => n,
    };
    let depth: Decimal = book.bids.iter().take(levels).map(|l| l.volume).sum();
    config.stake_size <= Decimal::ZERO || depth >= config.stake_size
}

/// RSI not overbought, short SMA above long SMA, positive MACD histogram.
async fn indicators_confirm(
    client: &dyn BrokerClient,
    ticker: &Ticker,
    config: &TradingConfig,
) -> bool {
    if config.rsi_period > 0 {
        if let Some(closes) = recent_closes(client, ticker, config.rsi_period + 1).await {
            // a window without losses reads as fully overbought
            let rsi = relative_strength(closes, config.rsi_period)
                .unwrap_or(Decimal::ONE_HUNDRED);
            if rsi > config.rsi_overbought {
                debug!("{}: RSI {} overbought", ticker.pair, rsi);
                return false;
            }
        }
    }

    if config.short_window > 0 && config.long_window > 0 {
        if let Some(closes) = recent_closes(client, ticker, config.long_window).await {
            if sma_tail(&closes, config.short_window) <= sma_tail(&closes, config.long_window) {
                debug!("{}: short SMA not above long SMA", ticker.pair);
                return false;
            }
        }
    }

    let macd_periods = [
        config.macd_fast_period,
        config.macd_slow_period,
        config.macd_signal_period,
    ];
    if macd_periods.iter().all(|p| *p > 0) {
        let lookback = config.macd_slow_period.max(config.macd_signal_period) + 1;
        if let Some(closes) = recent_closes(client, ticker, lookback).await {
            if !macd_rising(&closes, config, ticker.timestamp) {
                debug!("{}: MACD histogram not positive", ticker.pair);
                return false;
            }
        }
    }
    true
}

fn sma_tail(closes: &[Decimal], window: usize) -> Decimal {
    let start = closes.len().saturating_sub(window);
    closes[start..].iter().sum::<Decimal>() / Decimal::from(window.max(1))
}

/// Replays `closes` through a fresh MACD and reports whether the last
/// sample left the MACD line above its signal line.
fn macd_rising(closes: &[Decimal], config: &TradingConfig, at: DateTime<Utc>) -> bool {
    let Ok(mut macd) = MacdStrategy::new(
        config.macd_fast_period,
        config.macd_slow_period,
        config.macd_signal_period,
    ) else {
        return true;
    };
    closes
        .iter()
        .map(|c| macd.next(&Quote::from_close(*c, at), config))
        .last()
        .map_or(true, |signal| signal == Signal::Buy)
}
