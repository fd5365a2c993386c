// src/strategies/threshold.rs
use crate::config::TradingConfig;
use crate::strategies::traits::Strategy;
use crate::types::{Quote, Signal};
use rust_decimal::Decimal;

/// Stateless spread trigger. A non-positive threshold disables its side.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThresholdStrategy;

impl ThresholdStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for ThresholdStrategy {
    fn name(&self) -> &str {
        "threshold"
    }

    fn next(&mut self, quote: &Quote, config: &TradingConfig) -> Signal {
        if config.entry_threshold > Decimal::ZERO
            && quote.ask > quote.bid * (Decimal::ONE + config.entry_threshold)
        {
            return Signal::Buy;
        }
        if config.exit_threshold > Decimal::ZERO
            && quote.bid < quote.ask * (Decimal::ONE - config.exit_threshold)
        {
            return Signal::Sell;
        }
        Signal::Hold
    }
}
