// src/execution/simulated.rs
use crate::config::TradingConfig;
use crate::error::ExecError;
use crate::execution::{CancelToken, Executor};
use crate::types::{Quote, Signal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

/// Single-position PnL book.
///
/// At most one lot is open at a time. `peak_pnl` never decreases and
/// `max_drawdown_exceeded` never resets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionLedger {
    pub position: Decimal,
    pub entry_price: Decimal,
    pub total_pnl: Decimal,
    pub peak_pnl: Decimal,
    pub max_drawdown_exceeded: bool,
    pub last_trade_time: Option<DateTime<Utc>>,
}

impl PositionLedger {
    pub fn is_flat(&self) -> bool {
        self.position.is_zero()
    }

    pub fn drawdown(&self) -> Decimal {
        self.peak_pnl - self.total_pnl
    }

    fn in_cooldown(&self, now: DateTime<Utc>, config: &TradingConfig) -> bool {
        match self.last_trade_time {
            Some(last) => now - last < config.cooldown(),
            None => false,
        }
    }
}

/// Paper executor: applies the risk rules and books PnL at mid-price.
#[derive(Debug, Default)]
pub struct SimulatedExecutor {
    ledger: PositionLedger,
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    fn enter(&mut self, quote: &Quote, config: &TradingConfig) -> Result<(), ExecError> {
        if !self.ledger.is_flat() || config.stake_size.is_zero() {
            return Ok(());
        }
        if config.stake_size > config.position_limit {
            return Err(ExecError::PositionLimit {
                stake: config.stake_size,
                limit: config.position_limit,
            });
        }

        let price = quote.mid();
        self.ledger.position = config.stake_size;
        self.ledger.entry_price = price;
        info!(
            "Paper Buy: {} {} @ {}",
            config.stake_size, config.pair, price
        );
        Ok(())
    }

    fn exit(&mut self, quote: &Quote, config: &TradingConfig) -> Result<(), ExecError> {
        if self.ledger.is_flat() {
            return Ok(());
        }

        let price = quote.mid();
        let profit = (price - self.ledger.entry_price) * self.ledger.position;
        let ledger = &mut self.ledger;
        ledger.total_pnl += profit;
        if ledger.total_pnl > ledger.peak_pnl {
            ledger.peak_pnl = ledger.total_pnl;
        }
        ledger.position = Decimal::ZERO;
        info!(
            "Paper Sell: closed {} @ {} (pnl {}, total {})",
            config.pair, price, profit, ledger.total_pnl
        );

        let drawdown = ledger.drawdown();
        if drawdown > config.max_drawdown {
            ledger.max_drawdown_exceeded = true;
            warn!(
                "Drawdown {} breached limit {} on {}",
                drawdown, config.max_drawdown, config.pair
            );
            return Err(ExecError::MaxDrawdown {
                max_drawdown: config.max_drawdown,
                drawdown,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for SimulatedExecutor {
    async fn execute(
        &mut self,
        signal: Signal,
        quote: &Quote,
        config: &TradingConfig,
        _cancel: &CancelToken,
    ) -> Result<(), ExecError> {
        if self.ledger.in_cooldown(quote.timestamp, config) {
            return Ok(());
        }

        let result = match signal {
            Signal::Buy => self.enter(quote, config),
            Signal::Sell => self.exit(quote, config),
            Signal::Hold => Ok(()),
        };
        // every call past the gate restarts the window, no-ops included;
        // a rejected entry leaves the ledger untouched
        if !matches!(result, Err(ExecError::PositionLimit { .. })) {
            self.ledger.last_trade_time = Some(quote.timestamp);
        }
        result
    }

    async fn cancel_all(&mut self) -> Result<(), ExecError> {
        if !self.ledger.is_flat() {
            info!("Paper position of {} flattened", self.ledger.position);
            self.ledger.position = Decimal::ZERO;
        }
        Ok(())
    }
}
