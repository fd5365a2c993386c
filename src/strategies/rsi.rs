// src/strategies/rsi.rs
use crate::config::TradingConfig;
use crate::error::StrategyError;
use crate::strategies::traits::Strategy;
use crate::types::{Quote, Signal};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Relative Strength Index over simple average gain/loss.
pub struct RsiStrategy {
    period: usize,
    overbought: Decimal,
    oversold: Decimal,
    // last `period + 1` mid-prices
    prices: VecDeque<Decimal>,
    seen: usize,
}

impl RsiStrategy {
    pub fn new(
        period: usize,
        overbought: Decimal,
        oversold: Decimal,
    ) -> Result<Self, StrategyError> {
        if period == 0 {
            return Err(StrategyError::InvalidPeriod {
                indicator: "RSI",
                period,
            });
        }
        Ok(Self {
            period,
            overbought,
            oversold,
            prices: VecDeque::with_capacity(period + 2),
            seen: 0,
        })
    }

    fn value(&self) -> Option<Decimal> {
        relative_strength(self.prices.iter().copied(), self.period)
    }
}

/// RSI over consecutive `prices` with simple average gain and loss.
/// `None` when no step in the window was a loss.
pub(crate) fn relative_strength<I>(prices: I, period: usize) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
    I::IntoIter: Clone,
{
    let prices = prices.into_iter();
    let mut gains = Decimal::ZERO;
    let mut losses = Decimal::ZERO;
    for (prev, cur) in prices.clone().zip(prices.skip(1)) {
        let delta = cur - prev;
        if delta > Decimal::ZERO {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    let period = Decimal::from(period.max(1));
    let avg_gain = gains / period;
    let avg_loss = losses / period;
    if avg_loss.is_zero() {
        return None;
    }
    let rs = avg_gain / avg_loss;
    Some(Decimal::ONE_HUNDRED - Decimal::ONE_HUNDRED / (Decimal::ONE + rs))
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &str {
        "rsi"
    }

    fn next(&mut self, quote: &Quote, _config: &TradingConfig) -> Signal {
        self.prices.push_back(quote.mid());
        if self.prices.len() > self.period + 1 {
            self.prices.pop_front();
        }
        self.seen += 1;
        if self.seen <= self.period {
            return Signal::Hold;
        }

        match self.value() {
            Some(rsi) if rsi >= self.overbought => Signal::Sell,
            Some(rsi) if rsi <= self.oversold => Signal::Buy,
            _ => Signal::Hold,
        }
    }
}
