// src/strategies/traits.rs
use crate::config::TradingConfig;
use crate::types::{Quote, Signal};

/// Turns one quote into one signal.
///
/// Implementations keep their own rolling state across calls; an instance
/// belongs to exactly one pair and is never shared. `next` must not block.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn next(&mut self, quote: &Quote, config: &TradingConfig) -> Signal;
}

impl Strategy for Box<dyn Strategy> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next(&mut self, quote: &Quote, config: &TradingConfig) -> Signal {
        (**self).next(quote, config)
    }
}
