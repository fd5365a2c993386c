// src/execution/mod.rs
//! Executors turn signals into orders (or simulated fills).
//!
//! They compose by wrapping: every decorator does its own work and then
//! delegates to the executor it owns, so the innermost one places or
//! simulates the order. Chain order matters, e.g.
//! `Logging(Sizing(Vwap(Simulated)))`.
pub mod live;
pub mod logging;
pub mod simulated;
pub mod sizing;
pub mod twap;
pub mod vwap;
pub mod weights;

pub use live::LiveExecutor;
pub use logging::LoggingExecutor;
pub use simulated::{PositionLedger, SimulatedExecutor};
pub use sizing::SizingExecutor;
pub use twap::TwapExecutor;
pub use vwap::{slice_weights, VwapExecutor};

use crate::config::TradingConfig;
use crate::error::ExecError;
use crate::types::{Quote, Signal};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;

#[async_trait]
pub trait Executor: Send {
    /// Acts on one signal. `cancel` aborts any wait between order slices.
    async fn execute(
        &mut self,
        signal: Signal,
        quote: &Quote,
        config: &TradingConfig,
        cancel: &CancelToken,
    ) -> Result<(), ExecError>;

    /// Flattens or cancels whatever the executor holds. Safe to repeat.
    async fn cancel_all(&mut self) -> Result<(), ExecError>;
}

#[async_trait]
impl<E: Executor + ?Sized> Executor for Box<E> {
    async fn execute(
        &mut self,
        signal: Signal,
        quote: &Quote,
        config: &TradingConfig,
        cancel: &CancelToken,
    ) -> Result<(), ExecError> {
        (**self).execute(signal, quote, config, cancel).await
    }

    async fn cancel_all(&mut self) -> Result<(), ExecError> {
        (**self).cancel_all().await
    }
}

/// Receiving side of a cancellation signal shared by the driver loop and
/// the slicing executors.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Fires the paired [`CancelToken`]s.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    /// A token that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            let fired = *rx.borrow_and_update();
            if fired {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Waits `interval` between two slices unless cancelled first.
pub(crate) async fn wait_between_slices(
    interval: Duration,
    cancel: &CancelToken,
) -> Result<(), ExecError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExecError::Cancelled),
        _ = tokio::time::sleep(interval) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_fires_all_tokens() {
        let (handle, token) = cancel_pair();
        let other = handle.token();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());
        token.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn wait_completes_without_cancellation() {
        let token = CancelToken::never();
        assert!(wait_between_slices(Duration::from_secs(5), &token)
            .await
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_aborts_on_cancel() {
        let (handle, token) = cancel_pair();
        let waiter = tokio::spawn(async move {
            wait_between_slices(Duration::from_secs(3600), &token).await
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(ExecError::Cancelled)));
    }
}
