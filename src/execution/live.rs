// src/execution/live.rs
use crate::config::TradingConfig;
use crate::connectors::traits::BrokerClient;
use crate::error::ExecError;
use crate::execution::{CancelToken, Executor};
use crate::types::{LimitOrder, Quote, Side, Signal};
use crate::utils::precision::{normalize_price, normalize_quantity, DEFAULT_STEP};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Places real limit orders at mid-price.
///
/// Follows the same entry/exit rules as the simulated executor (one open
/// lot, position limit on entry). PnL is booked at the posted limit prices,
/// so it is an estimate until the exchange reports fills.
pub struct LiveExecutor {
    client: Arc<dyn BrokerClient>,
    position: Decimal,
    entry_price: Decimal,
    realized_pnl: Decimal,
}

impl LiveExecutor {
    pub fn new(client: Arc<dyn BrokerClient>) -> Self {
        Self {
            client,
            position: Decimal::ZERO,
            entry_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    }

    pub fn position(&self) -> Decimal {
        self.position
    }

    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    fn order(
        &self,
        side: Side,
        price: Decimal,
        volume: Decimal,
        config: &TradingConfig,
    ) -> LimitOrder {
        LimitOrder {
            pair: config.pair.clone(),
            side,
            price,
            volume,
            base_account_id: config.base_account_id,
            counter_account_id: config.counter_account_id,
            client_order_id: Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    async fn execute(
        &mut self,
        signal: Signal,
        quote: &Quote,
        config: &TradingConfig,
        _cancel: &CancelToken,
    ) -> Result<(), ExecError> {
        let price = normalize_price(quote.mid(), DEFAULT_STEP);

        match signal {
            Signal::Buy => {
                if !self.position.is_zero() {
                    return Ok(());
                }
                if config.stake_size > config.position_limit {
                    return Err(ExecError::PositionLimit {
                        stake: config.stake_size,
                        limit: config.position_limit,
                    });
                }
                let volume = normalize_quantity(config.stake_size, DEFAULT_STEP);
                if volume.is_zero() {
                    warn!(
                        "Quantity is zero after normalization ({}). Not entering {}.",
                        config.stake_size, config.pair
                    );
                    return Ok(());
                }

                let order = self.order(Side::Buy, price, volume, config);
                let resp = self.client.post_limit_order(&order).await?;
                info!("Order Confirmed: {} (BID {} @ {})", resp.id, volume, price);
                self.position = volume;
                self.entry_price = price;
            }
            Signal::Sell => {
                if self.position.is_zero() {
                    return Ok(());
                }
                let order = self.order(Side::Sell, price, self.position, config);
                let resp = self.client.post_limit_order(&order).await?;
                let pnl = (price - self.entry_price) * self.position;
                self.realized_pnl += pnl;
                info!(
                    "Order Confirmed: {} (ASK {} @ {}, entry {}, pnl {}, total {})",
                    resp.id, self.position, price, self.entry_price, pnl, self.realized_pnl
                );
                self.position = Decimal::ZERO;
                self.entry_price = Decimal::ZERO;
            }
            Signal::Hold => {}
        }
        Ok(())
    }

    async fn cancel_all(&mut self) -> Result<(), ExecError> {
        // orders are immediate limit orders; nothing is tracked to cancel
        Ok(())
    }
}
