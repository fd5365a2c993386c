// src/strategies/macd.rs
use crate::config::TradingConfig;
use crate::error::StrategyError;
use crate::strategies::traits::Strategy;
use crate::types::{Quote, Signal};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy)]
struct Ema {
    alpha: Decimal,
    value: Decimal,
}

impl Ema {
    fn new(period: usize) -> Self {
        Self {
            alpha: Decimal::TWO / Decimal::from(period + 1),
            value: Decimal::ZERO,
        }
    }

    fn update(&mut self, sample: Decimal) -> Decimal {
        self.value = self.alpha * sample + (Decimal::ONE - self.alpha) * self.value;
        self.value
    }
}

/// Moving Average Convergence Divergence.
///
/// The first quote seeds both price EMAs and yields `Hold`. After that the
/// signal is the side of the MACD line relative to its signal line.
pub struct MacdStrategy {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    initialized: bool,
}

impl MacdStrategy {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, StrategyError> {
        for period in [fast, slow, signal] {
            if period == 0 {
                return Err(StrategyError::InvalidPeriod {
                    indicator: "MACD",
                    period,
                });
            }
        }
        Ok(Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            initialized: false,
        })
    }
}

impl Strategy for MacdStrategy {
    fn name(&self) -> &str {
        "macd"
    }

    fn next(&mut self, quote: &Quote, _config: &TradingConfig) -> Signal {
        let price = quote.mid();

        if !self.initialized {
            self.fast.value = price;
            self.slow.value = price;
            self.signal.value = Decimal::ZERO;
            self.initialized = true;
            return Signal::Hold;
        }

        let macd = self.fast.update(price) - self.slow.update(price);
        let signal_line = self.signal.update(macd);

        if macd > signal_line {
            Signal::Buy
        } else if macd < signal_line {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}
