// src/strategies/multi_timeframe.rs
use crate::config::TradingConfig;
use crate::error::StrategyError;
use crate::strategies::{
    BollingerStrategy, CompositeStrategy, MacdStrategy, RsiStrategy, SmaStrategy, Strategy,
    ThresholdStrategy,
};
use crate::types::{Quote, Signal};

/// Two composites over the same indicator family, the slow one with every
/// period doubled. A signal passes only when both timeframes agree.
pub struct MultiTimeframeStrategy {
    fast: Box<dyn Strategy>,
    slow: Box<dyn Strategy>,
}

impl MultiTimeframeStrategy {
    pub fn new(fast: Box<dyn Strategy>, slow: Box<dyn Strategy>) -> Self {
        Self { fast, slow }
    }

    /// Builds the fast and slow indicator sets from the configured periods.
    pub fn from_config(config: &TradingConfig) -> Result<Self, StrategyError> {
        let fast = indicator_set(config, 1)?;
        let slow = indicator_set(config, 2)?;
        Ok(Self::new(Box::new(fast), Box::new(slow)))
    }
}

pub(crate) fn indicator_set(
    config: &TradingConfig,
    scale: usize,
) -> Result<CompositeStrategy, StrategyError> {
    let members: Vec<Box<dyn Strategy>> = vec![
        Box::new(SmaStrategy::new(
            config.short_window * scale,
            config.long_window * scale,
        )?),
        Box::new(ThresholdStrategy::new()),
        Box::new(RsiStrategy::new(
            config.rsi_period * scale,
            config.rsi_overbought,
            config.rsi_oversold,
        )?),
        Box::new(MacdStrategy::new(
            config.macd_fast_period * scale,
            config.macd_slow_period * scale,
            config.macd_signal_period * scale,
        )?),
        Box::new(BollingerStrategy::new(
            config.bb_period * scale,
            config.bb_multiplier,
        )?),
    ];
    Ok(CompositeStrategy::new(members))
}

impl Strategy for MultiTimeframeStrategy {
    fn name(&self) -> &str {
        "multi_timeframe"
    }

    fn next(&mut self, quote: &Quote, config: &TradingConfig) -> Signal {
        let fast = self.fast.next(quote, config);
        let slow = self.slow.next(quote, config);
        if fast == slow {
            fast
        } else {
            Signal::Hold
        }
    }
}
