// src/config.rs

use anyhow::Context;
use async_trait::async_trait;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizerKind {
    #[default]
    Fixed,
    Kelly,
}

/// Which signal generator a trading session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Sma,
    Rsi,
    Macd,
    Bollinger,
    Threshold,
    Composite,
    MultiTimeframe,
}

/// How an order is split before it reaches the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceMode {
    Twap,
    #[default]
    Vwap,
}

/// Where VWAP slice weights come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VwapSource {
    #[default]
    Historical,
    Orderbook,
    Hybrid,
}

/// Parameters handed to strategies and executors on every call.
///
/// Executors clone and override fields (stake size per slice) locally;
/// the caller's copy is never touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub pair: String,
    pub entry_threshold: Decimal,
    pub exit_threshold: Decimal,
    pub stake_size: Decimal,
    pub cooldown_secs: u64,
    pub position_limit: Decimal,
    pub max_drawdown: Decimal,

    // SMA
    pub short_window: usize,
    pub long_window: usize,
    // RSI
    pub rsi_period: usize,
    pub rsi_overbought: Decimal,
    pub rsi_oversold: Decimal,
    // MACD
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    // Bollinger Bands
    pub bb_period: usize,
    pub bb_multiplier: Decimal,

    // Sizing
    pub initial_equity: Decimal,
    pub position_sizer_type: SizerKind,
    pub kelly_win_prob: Decimal,
    pub kelly_win_loss_ratio: Decimal,

    // Slicing
    pub twap_slices: usize,
    pub twap_interval_secs: u64,
    pub vwap_source: VwapSource,
    pub vwap_history_window_minutes: i64,
    pub vwap_orderbook_depth_levels: usize,
    pub vwap_hybrid_weight: Decimal,

    // Broker accounts
    pub base_account_id: i64,
    pub counter_account_id: i64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            pair: "XBTZAR".to_string(),
            entry_threshold: Decimal::ZERO,
            exit_threshold: Decimal::ZERO,
            stake_size: Decimal::ONE,
            cooldown_secs: 0,
            position_limit: Decimal::ONE,
            max_drawdown: Decimal::ONE_HUNDRED,
            short_window: 5,
            long_window: 10,
            rsi_period: 14,
            rsi_overbought: Decimal::from(70),
            rsi_oversold: Decimal::from(30),
            macd_fast_period: 12,
            macd_slow_period: 26,
            macd_signal_period: 9,
            bb_period: 20,
            bb_multiplier: Decimal::TWO,
            initial_equity: Decimal::ONE_THOUSAND,
            position_sizer_type: SizerKind::Fixed,
            kelly_win_prob: Decimal::new(5, 1),
            kelly_win_loss_ratio: Decimal::ONE,
            twap_slices: 1,
            twap_interval_secs: 0,
            vwap_source: VwapSource::Historical,
            vwap_history_window_minutes: 60,
            vwap_orderbook_depth_levels: 10,
            vwap_hybrid_weight: Decimal::new(5, 1),
            base_account_id: 0,
            counter_account_id: 0,
        }
    }
}

impl TradingConfig {
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cooldown_secs as i64)
    }

    pub fn slice_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.twap_interval_secs)
    }

    /// Structural checks the indicator constructors would otherwise reject later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.short_window == 0 || self.short_window >= self.long_window {
            return Err(ConfigError::Message(format!(
                "short_window ({}) must be positive and below long_window ({})",
                self.short_window, self.long_window
            )));
        }
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast_period", self.macd_fast_period),
            ("macd_slow_period", self.macd_slow_period),
            ("macd_signal_period", self.macd_signal_period),
            ("bb_period", self.bb_period),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(ConfigError::Message(format!("{name} must be positive")));
        }
        if self.vwap_hybrid_weight < Decimal::ZERO || self.vwap_hybrid_weight > Decimal::ONE {
            return Err(ConfigError::Message(format!(
                "vwap_hybrid_weight {} outside [0, 1]",
                self.vwap_hybrid_weight
            )));
        }
        if self.position_sizer_type == SizerKind::Kelly
            && self.kelly_win_loss_ratio <= Decimal::ZERO
        {
            return Err(ConfigError::Message(
                "kelly_win_loss_ratio must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-level settings: credentials, pairs, scheduling, file locations.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api_key_id: String,
    #[serde(default)]
    pub api_key_secret: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    #[serde(default)]
    pub live_trading: bool,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default)]
    pub slicing: SliceMode,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Market scanner settings. When enabled, a pair may only be entered once
/// the scanner has confirmed it; indicator periods come from `trading`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub enabled: bool,
    /// Minimum 24h volume; zero disables the filter.
    pub min_volume: Decimal,
    /// Consecutive spread hits needed before a pair is confirmed.
    pub confirmations: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_volume: Decimal::ZERO,
            confirmations: 2,
        }
    }
}

fn default_base_url() -> String {
    "https://api.luno.com".to_string()
}

fn default_pairs() -> Vec<String> {
    vec!["XBTZAR".to_string()]
}

fn default_tick_interval() -> u64 {
    60
}

fn default_store_path() -> PathBuf {
    PathBuf::from("trades.db")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl AppConfig {
    /// `Settings.toml` (optional) overridden by `APP_*` environment variables,
    /// e.g. `APP_TRADING__STAKE_SIZE=0.01`.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pairs")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.trading.validate()?;
        Ok(config)
    }
}

/// Source of the trading parameters. The pipeline only ever reads from it.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load_config(&self) -> anyhow::Result<TradingConfig>;
    async fn save_config(&self, config: &TradingConfig) -> anyhow::Result<()>;
}

/// Trading parameters kept as a pretty-printed JSON document.
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigStore for JsonConfigStore {
    async fn load_config(&self) -> anyhow::Result<TradingConfig> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        let config: TradingConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        config.validate()?;
        Ok(config)
    }

    async fn save_config(&self, config: &TradingConfig) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(config)?;
        tokio::fs::write(&self.path, data)
            .await
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}
