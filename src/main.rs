// src/main.rs
use anyhow::{Context, Result};
use dotenvy::dotenv;
use spot_sniper::config::{AppConfig, SliceMode, TradingConfig};
use spot_sniper::connectors::luno::LunoClient;
use spot_sniper::connectors::traits::BrokerClient;
use spot_sniper::core::{PairSession, ScanSession, TradingEngine};
use spot_sniper::execution::{
    cancel_pair, Executor, LiveExecutor, LoggingExecutor, SimulatedExecutor, SizingExecutor,
    TwapExecutor, VwapExecutor,
};
use spot_sniper::risk::sizer_from_config;
use spot_sniper::storage::{SqliteStore, TradeStore};
use spot_sniper::strategies::build_strategy;
use spot_sniper::utils::logging::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Logging(Sizing(Twap|Vwap(Live|Simulated))).
fn build_chain(
    app: &AppConfig,
    config: &TradingConfig,
    client: &Arc<dyn BrokerClient>,
    store: &Arc<dyn TradeStore>,
) -> Box<dyn Executor> {
    let base: Box<dyn Executor> = if app.live_trading {
        Box::new(LiveExecutor::new(client.clone()))
    } else {
        Box::new(SimulatedExecutor::new())
    };

    let sliced: Box<dyn Executor> = match app.slicing {
        SliceMode::Twap => Box::new(TwapExecutor::from_config(base, config)),
        SliceMode::Vwap => Box::new(VwapExecutor::from_config(
            base,
            client.clone(),
            Some(store.clone()),
            config,
        )),
    };

    let sized = SizingExecutor::new(sliced, sizer_from_config(config));
    Box::new(LoggingExecutor::new(sized))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let app = AppConfig::load().context("loading configuration")?;
    let _guard = init_tracing(&app.log_dir);

    info!("========================================");
    info!("       SPOT SNIPER - v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Pairs:    {:?}", app.pairs);
    info!("Strategy: {:?}, slicing: {:?}", app.strategy, app.slicing);
    info!(
        "Mode:     {}",
        if app.live_trading {
            "🚨 LIVE TRADING"
        } else {
            "📝 PAPER TRADING"
        }
    );

    let client: Arc<dyn BrokerClient> = Arc::new(LunoClient::with_base_url(
        app.api_key_id.clone(),
        app.api_key_secret.clone(),
        app.base_url.clone(),
    ));
    let store: Arc<dyn TradeStore> = Arc::new(
        SqliteStore::open(&app.store_path)
            .await
            .with_context(|| format!("opening {}", app.store_path.display()))?,
    );

    let mut sessions = Vec::with_capacity(app.pairs.len());
    for pair in &app.pairs {
        let config = TradingConfig {
            pair: pair.clone(),
            ..app.trading.clone()
        };
        let strategy = build_strategy(app.strategy, &config)
            .with_context(|| format!("building strategy for {}", pair))?;
        let executor = build_chain(&app, &config, &client, &store);
        sessions.push(PairSession::new(config, strategy, executor));
    }

    let (handle, token) = cancel_pair();
    let mut engine = TradingEngine::new(
        client,
        sessions,
        Duration::from_secs(app.tick_interval_secs.max(1)),
    );
    if app.scan.enabled {
        info!(
            "Scanner:  min volume {}, {} confirmations",
            app.scan.min_volume, app.scan.confirmations
        );
        engine = engine.with_scanner(ScanSession::from_config(&app.scan));
    }
    let engine_task = tokio::spawn(async move { engine.run(token).await });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down...");
    handle.cancel();
    engine_task.await?;

    Ok(())
}
