// src/execution/logging.rs
use crate::config::TradingConfig;
use crate::error::ExecError;
use crate::execution::{CancelToken, Executor};
use crate::types::{Quote, Signal};
use async_trait::async_trait;
use tracing::{error, info};

/// Records every call and every failure, then returns the inner result
/// untouched.
pub struct LoggingExecutor<E> {
    inner: E,
}

impl<E: Executor> LoggingExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Executor> Executor for LoggingExecutor<E> {
    async fn execute(
        &mut self,
        signal: Signal,
        quote: &Quote,
        config: &TradingConfig,
        cancel: &CancelToken,
    ) -> Result<(), ExecError> {
        info!(
            target: "activity",
            signal = %signal,
            bid = %quote.bid,
            ask = %quote.ask,
            time = %quote.timestamp.to_rfc3339(),
            ?config,
            "Execute"
        );
        let result = self.inner.execute(signal, quote, config, cancel).await;
        if let Err(e) = &result {
            error!(target: "errors", pair = %config.pair, "Execute error: {}", e);
        }
        result
    }

    async fn cancel_all(&mut self) -> Result<(), ExecError> {
        info!(target: "activity", "CancelAll");
        let result = self.inner.cancel_all().await;
        if let Err(e) = &result {
            error!(target: "errors", "CancelAll error: {}", e);
        }
        result
    }
}
