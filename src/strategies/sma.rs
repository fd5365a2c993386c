// src/strategies/sma.rs
use crate::config::TradingConfig;
use crate::error::StrategyError;
use crate::strategies::traits::Strategy;
use crate::types::{Quote, Signal};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple moving average crossover.
///
/// Keeps fixed-length short and long windows with running sums. Emits
/// `Buy` when the short average clears the long average by
/// `entry_threshold`, `Sell` when it falls below by `exit_threshold`.
pub struct SmaStrategy {
    short_window: usize,
    long_window: usize,
    short_buf: VecDeque<Decimal>,
    long_buf: VecDeque<Decimal>,
    short_sum: Decimal,
    long_sum: Decimal,
}

impl SmaStrategy {
    /// Requires `0 < short_window < long_window`.
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, StrategyError> {
        if short_window == 0 || long_window == 0 || short_window >= long_window {
            return Err(StrategyError::InvalidWindows {
                short: short_window,
                long: long_window,
            });
        }
        Ok(Self {
            short_window,
            long_window,
            short_buf: VecDeque::with_capacity(short_window + 1),
            long_buf: VecDeque::with_capacity(long_window + 1),
            short_sum: Decimal::ZERO,
            long_sum: Decimal::ZERO,
        })
    }

    fn push(buf: &mut VecDeque<Decimal>, sum: &mut Decimal, cap: usize, price: Decimal) {
        buf.push_back(price);
        *sum += price;
        if buf.len() > cap {
            if let Some(old) = buf.pop_front() {
                *sum -= old;
            }
        }
    }
}

impl Strategy for SmaStrategy {
    fn name(&self) -> &str {
        "sma"
    }

    fn next(&mut self, quote: &Quote, config: &TradingConfig) -> Signal {
        let price = quote.mid();

        Self::push(
            &mut self.short_buf,
            &mut self.short_sum,
            self.short_window,
            price,
        );
        Self::push(
            &mut self.long_buf,
            &mut self.long_sum,
            self.long_window,
            price,
        );

        if self.long_buf.len() < self.long_window {
            return Signal::Hold;
        }

        let short_avg = self.short_sum / Decimal::from(self.short_window);
        let long_avg = self.long_sum / Decimal::from(self.long_window);

        if short_avg > long_avg + config.entry_threshold {
            Signal::Buy
        } else if short_avg < long_avg - config.exit_threshold {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
