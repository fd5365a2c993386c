// src/execution/vwap.rs
use crate::config::{TradingConfig, VwapSource};
use crate::connectors::traits::BrokerClient;
use crate::error::ExecError;
use crate::execution::weights::{blend, bucket_weights, equal_weights};
use crate::execution::{wait_between_slices, CancelToken, Executor};
use crate::storage::TradeStore;
use crate::types::{Quote, Side, Signal};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const CANDLE_SECS: u32 = 60;

/// Volume-weighted slicing.
///
/// Slice weights come from recent candle volume, from order book depth on
/// the side being traded, or from a blend of both. A source that errors or
/// returns nothing degrades to equal weights. When a store is attached the
/// parent trade is written before the first slice and each slice after it
/// fills.
pub struct VwapExecutor<E> {
    inner: E,
    client: Arc<dyn BrokerClient>,
    store: Option<Arc<dyn TradeStore>>,
    slices: usize,
    interval: Duration,
}

impl<E: Executor> VwapExecutor<E> {
    pub fn new(
        inner: E,
        client: Arc<dyn BrokerClient>,
        store: Option<Arc<dyn TradeStore>>,
        slices: usize,
        interval: Duration,
    ) -> Self {
        Self {
            inner,
            client,
            store,
            slices: slices.max(1),
            interval,
        }
    }

    pub fn from_config(
        inner: E,
        client: Arc<dyn BrokerClient>,
        store: Option<Arc<dyn TradeStore>>,
        config: &TradingConfig,
    ) -> Self {
        Self::new(
            inner,
            client,
            store,
            config.twap_slices,
            config.slice_interval(),
        )
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

/// Weight schedule for one execution of `slices` slices on `side`.
pub async fn slice_weights(
    client: &dyn BrokerClient,
    side: Side,
    quote: &Quote,
    config: &TradingConfig,
    slices: usize,
) -> Vec<Decimal> {
    match config.vwap_source {
        VwapSource::Historical => historical_weights(client, quote, config, slices).await,
        VwapSource::Orderbook => orderbook_weights(client, side, config, slices).await,
        VwapSource::Hybrid => {
            let hist = historical_weights(client, quote, config, slices).await;
            let book = orderbook_weights(client, side, config, slices).await;
            blend(&hist, &book, config.vwap_hybrid_weight)
        }
    }
}

async fn historical_weights(
    client: &dyn BrokerClient,
    quote: &Quote,
    config: &TradingConfig,
    slices: usize,
) -> Vec<Decimal> {
    let since = quote.timestamp - chrono::Duration::minutes(config.vwap_history_window_minutes);
    match client.get_candles(&config.pair, since, CANDLE_SECS).await {
        Ok(candles) => {
            let volumes: Vec<Decimal> = candles.iter().map(|c| c.volume).collect();
            bucket_weights(&volumes, slices)
        }
        Err(e) => {
            warn!(
                "VWAP: candle history unavailable for {} ({}), using equal weights",
                config.pair, e
            );
            equal_weights(slices)
        }
    }
}

async fn orderbook_weights(
    client: &dyn BrokerClient,
    side: Side,
    config: &TradingConfig,
    slices: usize,
) -> Vec<Decimal> {
    match client.get_order_book(&config.pair).await {
        Ok(book) => {
            let levels = book.levels_for(side);
            let depth = match config.vwap_orderbook_depth_levels {
                0 => levels.len(),
                d => d.min(levels.len()),
            };
            let volumes: Vec<Decimal> = levels[..depth].iter().map(|l| l.volume).collect();
            bucket_weights(&volumes, slices)
        }
        Err(e) => {
            warn!(
                "VWAP: order book unavailable for {} ({}), using equal weights",
                config.pair, e
            );
            equal_weights(slices)
        }
    }
}

#[async_trait]
impl<E: Executor> Executor for VwapExecutor<E> {
    async fn execute(
        &mut self,
        signal: Signal,
        quote: &Quote,
        config: &TradingConfig,
        cancel: &CancelToken,
    ) -> Result<(), ExecError> {
        let Some(side) = signal.side() else {
            return Ok(());
        };

        let weights =
            slice_weights(&*self.client, side, quote, config, self.slices).await;
        info!(
            "VWAP: {} {} {} in {} slices, weights {:?}",
            side, config.stake_size, config.pair, self.slices, weights
        );

        let trade_id = match &self.store {
            Some(store) => Some(
                store
                    .save_trade(
                        quote.timestamp,
                        &config.pair,
                        side,
                        quote.mid(),
                        config.stake_size,
                    )
                    .await?,
            ),
            None => None,
        };

        let last = weights.len() - 1;
        for (i, weight) in weights.into_iter().enumerate() {
            let size = config.stake_size * weight;
            if size.is_zero() {
                debug!("VWAP: slice {} has no volume, skipped", i);
            } else {
                let slice_cfg = TradingConfig {
                    stake_size: size,
                    ..config.clone()
                };
                self.inner.execute(signal, quote, &slice_cfg, cancel).await?;

                if let (Some(store), Some(id)) = (&self.store, trade_id) {
                    store.save_slice(id, i, size, weight).await?;
                }
            }
            if i < last {
                wait_between_slices(self.interval, cancel).await?;
            }
        }
        Ok(())
    }

    async fn cancel_all(&mut self) -> Result<(), ExecError> {
        self.inner.cancel_all().await
    }
}
