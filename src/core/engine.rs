// src/core/engine.rs
use crate::config::TradingConfig;
use crate::connectors::traits::BrokerClient;
use crate::core::scan::ScanSession;
use crate::error::ExecError;
use crate::execution::{CancelToken, Executor};
use crate::strategies::Strategy;
use crate::types::{Quote, Signal, Ticker};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// One pass of the pipeline: quote -> strategy -> executor chain.
///
/// The signal is returned even when execution fails so callers can report
/// both.
pub async fn run_strategy_tick<S, E>(
    strategy: &mut S,
    executor: &mut E,
    quote: &Quote,
    config: &TradingConfig,
    cancel: &CancelToken,
) -> (Signal, Result<(), ExecError>)
where
    S: Strategy + ?Sized,
    E: Executor + ?Sized,
{
    let signal = strategy.next(quote, config);
    let result = executor.execute(signal, quote, config, cancel).await;
    (signal, result)
}

/// Strategy and executor chain owned by a single pair. Ledgers are never
/// shared between sessions.
pub struct PairSession {
    config: TradingConfig,
    strategy: Box<dyn Strategy>,
    executor: Box<dyn Executor>,
}

impl PairSession {
    pub fn new(
        config: TradingConfig,
        strategy: Box<dyn Strategy>,
        executor: Box<dyn Executor>,
    ) -> Self {
        Self {
            config,
            strategy,
            executor,
        }
    }

    pub fn pair(&self) -> &str {
        &self.config.pair
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// One pipeline pass for this pair. When `entry_allowed` is false a
    /// `Buy` is held back as `Hold`; the strategy still sees the quote.
    pub async fn on_quote(
        &mut self,
        quote: &Quote,
        entry_allowed: bool,
        cancel: &CancelToken,
    ) -> (Signal, Result<(), ExecError>) {
        if entry_allowed {
            return run_strategy_tick(
                &mut self.strategy,
                &mut self.executor,
                quote,
                &self.config,
                cancel,
            )
            .await;
        }

        let mut signal = self.strategy.next(quote, &self.config);
        if signal == Signal::Buy {
            debug!("{}: buy held back, pair not confirmed by scan", self.config.pair);
            signal = Signal::Hold;
        }
        let result = self
            .executor
            .execute(signal, quote, &self.config, cancel)
            .await;
        (signal, result)
    }

    pub async fn cancel_all(&mut self) -> Result<(), ExecError> {
        self.executor.cancel_all().await
    }
}

/// Polls tickers on a fixed interval and feeds every session its pair's
/// quote. Pairs are evaluated concurrently; each tick completes before the
/// next one starts.
///
/// With a scanner attached, a session may only enter once the scanner has
/// confirmed its pair on the current tick. Exits are never held back.
pub struct TradingEngine {
    client: Arc<dyn BrokerClient>,
    sessions: Vec<PairSession>,
    tick: Duration,
    scanner: Option<ScanSession>,
}

impl TradingEngine {
    pub fn new(client: Arc<dyn BrokerClient>, sessions: Vec<PairSession>, tick: Duration) -> Self {
        Self {
            client,
            sessions,
            tick,
            scanner: None,
        }
    }

    pub fn with_scanner(mut self, scanner: ScanSession) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn scanner(&self) -> Option<&ScanSession> {
        self.scanner.as_ref()
    }

    pub fn sessions(&self) -> &[PairSession] {
        &self.sessions
    }

    /// Runs until `cancel` fires, then cancels every session's open orders.
    pub async fn run(&mut self, cancel: CancelToken) {
        let pairs: Vec<String> = self.sessions.iter().map(|s| s.pair().to_string()).collect();
        info!("Engine starting for {:?}, tick {:?}", pairs, self.tick);

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            self.tick_once(&pairs, &cancel).await;
        }

        info!("Engine stopping, cancelling open orders");
        self.shutdown().await;
    }

    /// Fetches quotes for all pairs in one call and evaluates every session
    /// that received one.
    pub async fn tick_once(&mut self, pairs: &[String], cancel: &CancelToken) {
        let tickers = match self.client.get_tickers(pairs).await {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!("Ticker fetch failed: {}", e);
                return;
            }
        };
        let quotes: HashMap<String, Quote> =
            tickers.iter().map(|t| (t.pair.clone(), t.quote())).collect();
        let confirmed = self.scan(&tickers).await;

        let ticks = self.sessions.iter_mut().filter_map(|session| {
            let quote = quotes.get(session.pair())?;
            let entry_allowed = confirmed
                .as_ref()
                .map_or(true, |set| set.contains(session.pair()));
            Some(async move {
                let (signal, result) = session.on_quote(quote, entry_allowed, cancel).await;
                (session.pair().to_string(), signal, result)
            })
        });

        for (pair, signal, result) in join_all(ticks).await {
            match result {
                Ok(()) if signal.is_hold() => debug!("{}: hold", pair),
                Ok(()) => info!("{}: {} handled", pair, signal),
                Err(e) => error!("{}: {} failed: {}", pair, signal, e),
            }
        }
    }

    /// Pairs the scanner confirmed this tick, `None` without a scanner.
    async fn scan(&mut self, tickers: &[Ticker]) -> Option<HashSet<String>> {
        let scanner = self.scanner.as_mut()?;
        let mut confirmed = HashSet::new();
        for ticker in tickers {
            let Some(config) = self
                .sessions
                .iter()
                .find(|s| s.pair() == ticker.pair)
                .map(|s| s.config().clone())
            else {
                continue;
            };
            let result = scanner
                .scan_ticker(self.client.as_ref(), ticker, &config)
                .await;
            if let Some(r) = result.filter(|r| r.signal == Signal::Buy) {
                info!("{}: confirmed by scan after {} hits", r.pair, r.hits);
                confirmed.insert(r.pair);
            }
        }
        Some(confirmed)
    }

    async fn shutdown(&mut self) {
        for session in &mut self.sessions {
            if let Err(e) = session.cancel_all().await {
                error!("{}: cancel_all failed: {}", session.pair(), e);
            }
        }
    }
}
