// src/execution/sizing.rs
use crate::config::TradingConfig;
use crate::error::ExecError;
use crate::execution::{CancelToken, Executor};
use crate::risk::PositionSizer;
use crate::types::{Quote, Signal};
use async_trait::async_trait;
use tracing::debug;

/// Replaces `stake_size` with the sizer's answer for `initial_equity`
/// before delegating. Works on a copy of the config.
pub struct SizingExecutor<E> {
    inner: E,
    sizer: Box<dyn PositionSizer>,
}

impl<E: Executor> SizingExecutor<E> {
    pub fn new(inner: E, sizer: Box<dyn PositionSizer>) -> Self {
        Self { inner, sizer }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Executor> Executor for SizingExecutor<E> {
    async fn execute(
        &mut self,
        signal: Signal,
        quote: &Quote,
        config: &TradingConfig,
        cancel: &CancelToken,
    ) -> Result<(), ExecError> {
        let stake = self.sizer.size(config.initial_equity, config);
        debug!(
            "{} sizer: stake {} -> {}",
            self.sizer.name(),
            config.stake_size,
            stake
        );
        let sized = TradingConfig {
            stake_size: stake,
            ..config.clone()
        };
        self.inner.execute(signal, quote, &sized, cancel).await
    }

    async fn cancel_all(&mut self) -> Result<(), ExecError> {
        self.inner.cancel_all().await
    }
}
