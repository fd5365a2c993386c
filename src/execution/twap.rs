// src/execution/twap.rs
use crate::config::TradingConfig;
use crate::error::ExecError;
use crate::execution::{wait_between_slices, CancelToken, Executor};
use crate::types::{Quote, Signal};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::info;

/// Time-weighted slicing: `slices` equal parts, `interval` apart.
///
/// A failing slice aborts the rest and its error is returned. Cancellation
/// during a wait aborts with [`ExecError::Cancelled`].
pub struct TwapExecutor<E> {
    inner: E,
    slices: usize,
    interval: Duration,
}

impl<E: Executor> TwapExecutor<E> {
    pub fn new(inner: E, slices: usize, interval: Duration) -> Self {
        Self {
            inner,
            slices: slices.max(1),
            interval,
        }
    }

    pub fn from_config(inner: E, config: &TradingConfig) -> Self {
        Self::new(inner, config.twap_slices, config.slice_interval())
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn slices(&self) -> usize {
        self.slices
    }
}

#[async_trait]
impl<E: Executor> Executor for TwapExecutor<E> {
    async fn execute(
        &mut self,
        signal: Signal,
        quote: &Quote,
        config: &TradingConfig,
        cancel: &CancelToken,
    ) -> Result<(), ExecError> {
        if signal.is_hold() {
            return Ok(());
        }
        info!(
            "TWAP: executing {} slices every {:?}",
            self.slices, self.interval
        );

        let slice_cfg = TradingConfig {
            stake_size: config.stake_size / Decimal::from(self.slices),
            ..config.clone()
        };
        for i in 0..self.slices {
            self.inner.execute(signal, quote, &slice_cfg, cancel).await?;
            if i + 1 < self.slices {
                wait_between_slices(self.interval, cancel).await?;
            }
        }
        Ok(())
    }

    async fn cancel_all(&mut self) -> Result<(), ExecError> {
        self.inner.cancel_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::cancel_pair;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct Recorder {
        stakes: Vec<Decimal>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl Executor for Recorder {
        async fn execute(
            &mut self,
            _signal: Signal,
            _quote: &Quote,
            config: &TradingConfig,
            _cancel: &CancelToken,
        ) -> Result<(), ExecError> {
            if self.fail_on == Some(self.stakes.len()) {
                return Err(ExecError::Broker(anyhow::anyhow!("rejected")));
            }
            self.stakes.push(config.stake_size);
            Ok(())
        }

        async fn cancel_all(&mut self) -> Result<(), ExecError> {
            Ok(())
        }
    }

    fn quote() -> Quote {
        Quote::from_close(dec!(100), Utc::now())
    }

    fn cfg() -> TradingConfig {
        TradingConfig {
            stake_size: dec!(3),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn splits_stake_into_equal_slices() {
        let mut twap = TwapExecutor::new(Recorder::default(), 3, Duration::from_secs(10));
        let start = tokio::time::Instant::now();
        twap.execute(Signal::Buy, &quote(), &cfg(), &CancelToken::never())
            .await
            .unwrap();
        assert_eq!(twap.inner().stakes, vec![dec!(1), dec!(1), dec!(1)]);
        // two waits, none after the last slice
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn hold_places_nothing() {
        let mut twap = TwapExecutor::new(Recorder::default(), 3, Duration::from_secs(10));
        twap.execute(Signal::Hold, &quote(), &cfg(), &CancelToken::never())
            .await
            .unwrap();
        assert!(twap.inner().stakes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_slices_means_one() {
        let mut twap = TwapExecutor::new(Recorder::default(), 0, Duration::from_secs(10));
        assert_eq!(twap.slices(), 1);
        twap.execute(Signal::Sell, &quote(), &cfg(), &CancelToken::never())
            .await
            .unwrap();
        assert_eq!(twap.inner().stakes, vec![dec!(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_slice_aborts_the_rest() {
        let rec = Recorder {
            fail_on: Some(1),
            ..Default::default()
        };
        let mut twap = TwapExecutor::new(rec, 3, Duration::from_secs(10));
        let err = twap
            .execute(Signal::Buy, &quote(), &cfg(), &CancelToken::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Broker(_)));
        assert_eq!(twap.inner().stakes.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_wait_stops_slicing() {
        let (handle, token) = cancel_pair();
        handle.cancel();
        let mut twap = TwapExecutor::new(Recorder::default(), 3, Duration::from_secs(10));
        let err = twap
            .execute(Signal::Buy, &quote(), &cfg(), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
        assert_eq!(twap.inner().stakes.len(), 1);
    }
}
