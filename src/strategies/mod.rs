// src/strategies/mod.rs
pub mod bollinger;
pub mod composite;
pub mod macd;
pub mod multi_timeframe;
pub mod rsi;
pub mod sma;
pub mod threshold;
pub mod traits;

pub use bollinger::BollingerStrategy;
pub use composite::CompositeStrategy;
pub use macd::MacdStrategy;
pub use multi_timeframe::MultiTimeframeStrategy;
pub use rsi::RsiStrategy;
pub use sma::SmaStrategy;
pub use threshold::ThresholdStrategy;
pub use traits::Strategy;

use crate::config::{StrategyKind, TradingConfig};
use crate::error::StrategyError;

/// Builds the configured strategy with its periods taken from `config`.
pub fn build_strategy(
    kind: StrategyKind,
    config: &TradingConfig,
) -> Result<Box<dyn Strategy>, StrategyError> {
    let strategy: Box<dyn Strategy> = match kind {
        StrategyKind::Sma => Box::new(SmaStrategy::new(config.short_window, config.long_window)?),
        StrategyKind::Rsi => Box::new(RsiStrategy::new(
            config.rsi_period,
            config.rsi_overbought,
            config.rsi_oversold,
        )?),
        StrategyKind::Macd => Box::new(MacdStrategy::new(
            config.macd_fast_period,
            config.macd_slow_period,
            config.macd_signal_period,
        )?),
        StrategyKind::Bollinger => {
            Box::new(BollingerStrategy::new(config.bb_period, config.bb_multiplier)?)
        }
        StrategyKind::Threshold => Box::new(ThresholdStrategy::new()),
        StrategyKind::Composite => Box::new(multi_timeframe::indicator_set(config, 1)?),
        StrategyKind::MultiTimeframe => Box::new(MultiTimeframeStrategy::from_config(config)?),
    };
    Ok(strategy)
}
