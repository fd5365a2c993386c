// tests/executor_chain.rs
mod common;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use common::{t0, volume_candles, FailingSliceStore, FakeBroker};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spot_sniper::config::{TradingConfig, VwapSource};
use spot_sniper::error::ExecError;
use spot_sniper::execution::{
    cancel_pair, CancelToken, Executor, LiveExecutor, LoggingExecutor, SimulatedExecutor,
    SizingExecutor, TwapExecutor, VwapExecutor,
};
use spot_sniper::risk::FixedSizer;
use spot_sniper::storage::{SqliteStore, TradeStore};
use spot_sniper::types::{Quote, Side, Signal};
use std::sync::Arc;
use std::time::Duration;

/// Inner executor that records what reaches it.
#[derive(Default)]
struct Recorder {
    calls: Vec<(Signal, Decimal)>,
    fail: bool,
    cancels: usize,
}

#[async_trait]
impl Executor for Recorder {
    async fn execute(
        &mut self,
        signal: Signal,
        _quote: &Quote,
        config: &TradingConfig,
        _cancel: &CancelToken,
    ) -> Result<(), ExecError> {
        if self.fail {
            return Err(ExecError::Broker(anyhow::anyhow!("exchange down")));
        }
        self.calls.push((signal, config.stake_size));
        Ok(())
    }

    async fn cancel_all(&mut self) -> Result<(), ExecError> {
        self.cancels += 1;
        Ok(())
    }
}

fn quote() -> Quote {
    Quote::new(dec!(99), dec!(101), t0())
}

fn cfg(source: VwapSource) -> TradingConfig {
    TradingConfig {
        pair: "XBTZAR".to_string(),
        stake_size: dec!(2),
        position_limit: dec!(10),
        vwap_source: source,
        vwap_orderbook_depth_levels: 4,
        ..Default::default()
    }
}

fn vwap(
    broker: FakeBroker,
    store: Option<Arc<dyn TradeStore>>,
    slices: usize,
) -> (VwapExecutor<Recorder>, Arc<FakeBroker>) {
    paced_vwap(broker, store, slices, Duration::from_secs(5))
}

fn paced_vwap(
    broker: FakeBroker,
    store: Option<Arc<dyn TradeStore>>,
    slices: usize,
    interval: Duration,
) -> (VwapExecutor<Recorder>, Arc<FakeBroker>) {
    let broker = Arc::new(broker);
    let exec = VwapExecutor::new(Recorder::default(), broker.clone(), store, slices, interval);
    (exec, broker)
}

// SQLite answers from its own worker thread, so tests that touch it run on
// the real clock with no gap between slices.
async fn sqlite() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::in_memory().await.unwrap())
}

fn stakes(rec: &Recorder) -> Vec<Decimal> {
    rec.calls.iter().map(|(_, s)| *s).collect()
}

#[tokio::test]
async fn vwap_orderbook_weights_buy_from_asks() {
    let broker = FakeBroker::new()
        .with_book(&[dec!(9), dec!(1)], &[dec!(1), dec!(1), dec!(3), dec!(5)]);
    let store = sqlite().await;
    let (mut exec, _) = paced_vwap(
        broker,
        Some(store.clone() as Arc<dyn TradeStore>),
        2,
        Duration::ZERO,
    );

    exec.execute(Signal::Buy, &quote(), &cfg(VwapSource::Orderbook), &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(stakes(exec.inner()), vec![dec!(0.4), dec!(1.6)]);

    let trades = store.list_trades().await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].side, Side::Buy);
    assert_eq!(trades[0].price, dec!(100));
    assert_eq!(trades[0].volume, dec!(2));

    let slices = store.list_slices(trades[0].id).await.unwrap();
    let weights: Vec<Decimal> = slices.iter().map(|s| s.weight).collect();
    assert_eq!(weights, vec![dec!(0.2), dec!(0.8)]);
    let total: Decimal = slices.iter().map(|s| s.size).sum();
    assert_eq!(total, dec!(2));
}

#[tokio::test(start_paused = true)]
async fn vwap_sell_weights_from_bids() {
    let broker = FakeBroker::new().with_book(&[dec!(3), dec!(1)], &[dec!(1), dec!(1)]);
    let (mut exec, _) = vwap(broker, None, 2);

    exec.execute(Signal::Sell, &quote(), &cfg(VwapSource::Orderbook), &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(stakes(exec.inner()), vec![dec!(1.5), dec!(0.5)]);
    assert!(exec.inner().calls.iter().all(|(s, _)| *s == Signal::Sell));
}

#[tokio::test(start_paused = true)]
async fn vwap_historical_reads_trailing_window() {
    let broker = FakeBroker::new().with_candles(volume_candles(&[dec!(1), dec!(3)]));
    let (mut exec, broker) = vwap(broker, None, 2);
    let config = TradingConfig {
        vwap_history_window_minutes: 30,
        ..cfg(VwapSource::Historical)
    };

    exec.execute(Signal::Buy, &quote(), &config, &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(stakes(exec.inner()), vec![dec!(0.5), dec!(1.5)]);
    let requests = broker.candle_requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![("XBTZAR".to_string(), t0() - ChronoDuration::minutes(30), 60)]
    );
}

#[tokio::test(start_paused = true)]
async fn vwap_hybrid_blends_sources() {
    let broker = FakeBroker::new()
        .with_candles(volume_candles(&[dec!(1), dec!(0)]))
        .with_book(&[], &[dec!(0), dec!(1)]);
    let (mut exec, _) = vwap(broker, None, 2);
    let config = TradingConfig {
        vwap_hybrid_weight: dec!(0.75),
        ..cfg(VwapSource::Hybrid)
    };

    exec.execute(Signal::Buy, &quote(), &config, &CancelToken::never())
        .await
        .unwrap();

    // hist [1, 0], book [0, 1]
    assert_eq!(stakes(exec.inner()), vec![dec!(1.5), dec!(0.5)]);
}

#[tokio::test(start_paused = true)]
async fn vwap_falls_back_to_equal_weights() {
    let (mut exec, _) = vwap(FakeBroker::new(), None, 4);

    exec.execute(Signal::Buy, &quote(), &cfg(VwapSource::Hybrid), &CancelToken::never())
        .await
        .unwrap();

    assert_eq!(stakes(exec.inner()), vec![dec!(0.5); 4]);
}

#[tokio::test]
async fn vwap_hold_touches_nothing() {
    let store = sqlite().await;
    let (mut exec, broker) = paced_vwap(
        FakeBroker::new(),
        Some(store.clone() as Arc<dyn TradeStore>),
        2,
        Duration::ZERO,
    );

    exec.execute(Signal::Hold, &quote(), &cfg(VwapSource::Historical), &CancelToken::never())
        .await
        .unwrap();

    assert!(exec.inner().calls.is_empty());
    assert!(broker.candle_requests.lock().unwrap().is_empty());
    assert!(store.list_trades().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn vwap_store_failure_aborts_remaining_slices() {
    let store = Arc::new(FailingSliceStore::default());
    let (mut exec, _) = vwap(FakeBroker::new(), Some(store.clone() as Arc<dyn TradeStore>), 3);

    let err = exec
        .execute(Signal::Buy, &quote(), &cfg(VwapSource::Historical), &CancelToken::never())
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Store(_)));
    assert_eq!(exec.inner().calls.len(), 1);
}

#[tokio::test]
async fn vwap_inner_failure_records_trade_but_no_slices() {
    let store = sqlite().await;
    let broker = Arc::new(FakeBroker::new());
    let mut exec = VwapExecutor::new(
        Recorder {
            fail: true,
            ..Default::default()
        },
        broker,
        Some(store.clone() as Arc<dyn TradeStore>),
        3,
        Duration::from_secs(5),
    );

    let err = exec
        .execute(Signal::Buy, &quote(), &cfg(VwapSource::Historical), &CancelToken::never())
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Broker(_)));
    let trades = store.list_trades().await.unwrap();
    assert_eq!(trades.len(), 1);
    assert!(store.list_slices(trades[0].id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn vwap_cancel_during_wait_stops_after_current_slice() {
    let (handle, token) = cancel_pair();
    let (mut exec, _) = vwap(FakeBroker::new(), None, 3);

    let run = async {
        exec.execute(Signal::Buy, &quote(), &cfg(VwapSource::Historical), &token)
            .await
    };
    let cancel = async {
        tokio::time::sleep(Duration::from_secs(7)).await;
        handle.cancel();
    };
    let (result, ()) = tokio::join!(run, cancel);

    assert!(matches!(result, Err(ExecError::Cancelled)));
    // slice 0 at t=0, slice 1 at t=5, cancelled while waiting for slice 2
    assert_eq!(exec.inner().calls.len(), 2);
}

#[tokio::test]
async fn live_executor_posts_normalized_orders() {
    let broker = Arc::new(FakeBroker::new());
    let mut live = LiveExecutor::new(broker.clone());
    let config = TradingConfig {
        pair: "XBTZAR".to_string(),
        stake_size: dec!(0.123456789),
        position_limit: dec!(1),
        base_account_id: 11,
        counter_account_id: 22,
        ..Default::default()
    };
    let q = Quote::new(dec!(99.999999991), dec!(100.000000001), t0());

    live.execute(Signal::Buy, &q, &config, &CancelToken::never())
        .await
        .unwrap();
    // already positioned
    live.execute(Signal::Buy, &q, &config, &CancelToken::never())
        .await
        .unwrap();
    live.execute(Signal::Sell, &q, &config, &CancelToken::never())
        .await
        .unwrap();
    // flat again
    live.execute(Signal::Sell, &q, &config, &CancelToken::never())
        .await
        .unwrap();

    let orders = broker.orders();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].side, Side::Buy);
    assert_eq!(orders[0].price, dec!(100.00000000));
    assert_eq!(orders[0].volume, dec!(0.12345678));
    assert_eq!(orders[0].base_account_id, 11);
    assert_eq!(orders[0].counter_account_id, 22);
    assert_eq!(orders[1].side, Side::Sell);
    assert_eq!(orders[1].volume, dec!(0.12345678));
    assert_ne!(orders[0].client_order_id, orders[1].client_order_id);
    assert!(live.position().is_zero());
}

#[tokio::test]
async fn live_books_pnl_from_entry_price() {
    let broker = Arc::new(FakeBroker::new());
    let mut live = LiveExecutor::new(broker.clone());
    let config = TradingConfig {
        stake_size: dec!(0.5),
        position_limit: dec!(1),
        ..Default::default()
    };
    let token = CancelToken::never();

    live.execute(Signal::Buy, &Quote::from_close(dec!(100), t0()), &config, &token)
        .await
        .unwrap();
    assert_eq!(live.entry_price(), dec!(100));
    live.execute(Signal::Sell, &Quote::from_close(dec!(110), t0()), &config, &token)
        .await
        .unwrap();
    assert_eq!(live.realized_pnl(), dec!(5));
    assert!(live.entry_price().is_zero());

    live.execute(Signal::Buy, &Quote::from_close(dec!(120), t0()), &config, &token)
        .await
        .unwrap();
    live.execute(Signal::Sell, &Quote::from_close(dec!(116), t0()), &config, &token)
        .await
        .unwrap();
    assert_eq!(live.realized_pnl(), dec!(3));
    assert_eq!(broker.orders().len(), 4);
}

#[tokio::test]
async fn live_position_limit_checked_before_broker() {
    let broker = Arc::new(FakeBroker::new());
    let mut live = LiveExecutor::new(broker.clone());
    let config = TradingConfig {
        stake_size: dec!(2),
        position_limit: dec!(1),
        ..Default::default()
    };

    let err = live
        .execute(Signal::Buy, &quote(), &config, &CancelToken::never())
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::PositionLimit { .. }));
    assert!(broker.orders().is_empty());
}

#[tokio::test]
async fn live_broker_error_propagates_and_keeps_flat() {
    let broker = Arc::new(FakeBroker::new().rejecting_after(0));
    let mut live = LiveExecutor::new(broker);

    let err = live
        .execute(Signal::Buy, &quote(), &TradingConfig::default(), &CancelToken::never())
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Broker(_)));
    assert!(live.position().is_zero());
    live.cancel_all().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn full_chain_forwards_errors_unchanged() {
    let config = TradingConfig {
        stake_size: dec!(5),
        position_limit: dec!(1),
        twap_slices: 2,
        ..Default::default()
    };
    let twap = TwapExecutor::from_config(SimulatedExecutor::new(), &config);
    let mut chain = LoggingExecutor::new(SizingExecutor::new(twap, Box::new(FixedSizer)));

    let err = chain
        .execute(Signal::Buy, &quote(), &config, &CancelToken::never())
        .await
        .unwrap_err();

    // 5 / 2 slices = 2.5 per slice, still above the limit
    match err {
        ExecError::PositionLimit { stake, limit } => {
            assert_eq!(stake, dec!(2.5));
            assert_eq!(limit, dec!(1));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(chain.inner().inner().inner().ledger().is_flat());
}

#[tokio::test(start_paused = true)]
async fn chain_over_boxed_executors() {
    let inner: Box<dyn Executor> = Box::new(Recorder::default());
    let mut chain: Box<dyn Executor> = Box::new(LoggingExecutor::new(TwapExecutor::new(
        inner,
        2,
        Duration::from_secs(1),
    )));

    chain
        .execute(Signal::Sell, &quote(), &cfg(VwapSource::Historical), &CancelToken::never())
        .await
        .unwrap();
    chain.cancel_all().await.unwrap();
    chain.cancel_all().await.unwrap();
}
