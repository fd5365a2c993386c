// src/strategies/composite.rs
use crate::config::TradingConfig;
use crate::strategies::traits::Strategy;
use crate::types::{Quote, Signal};

/// AND-gate over sub-strategies: a signal passes only when every member
/// emits it. Every member sees every quote so their state keeps advancing.
///
/// A composite with no members always returns `Hold`, never a vacuous `Buy`.
pub struct CompositeStrategy {
    strategies: Vec<Box<dyn Strategy>>,
}

impl CompositeStrategy {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Strategy for CompositeStrategy {
    fn name(&self) -> &str {
        "composite"
    }

    fn next(&mut self, quote: &Quote, config: &TradingConfig) -> Signal {
        if self.strategies.is_empty() {
            return Signal::Hold;
        }

        let signals: Vec<Signal> = self
            .strategies
            .iter_mut()
            .map(|s| s.next(quote, config))
            .collect();

        if signals.iter().all(|s| *s == Signal::Buy) {
            Signal::Buy
        } else if signals.iter().all(|s| *s == Signal::Sell) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
