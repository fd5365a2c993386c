// src/strategies/bollinger.rs
use crate::config::TradingConfig;
use crate::error::StrategyError;
use crate::strategies::traits::Strategy;
use crate::types::{Quote, Signal};
use rust_decimal::{Decimal, MathematicalOps};
use std::collections::VecDeque;

/// Mean reversion on Bollinger Bands: sell above the upper band, buy below
/// the lower one. Bands use the population standard deviation.
pub struct BollingerStrategy {
    period: usize,
    multiplier: Decimal,
    prices: VecDeque<Decimal>,
}

impl BollingerStrategy {
    pub fn new(period: usize, multiplier: Decimal) -> Result<Self, StrategyError> {
        if period == 0 {
            return Err(StrategyError::InvalidPeriod {
                indicator: "Bollinger",
                period,
            });
        }
        if multiplier <= Decimal::ZERO {
            return Err(StrategyError::InvalidMultiplier(multiplier));
        }
        Ok(Self {
            period,
            multiplier,
            prices: VecDeque::with_capacity(period + 1),
        })
    }

    /// (lower, upper) of the current window.
    fn bands(&self) -> (Decimal, Decimal) {
        let (mean, stddev) = mean_and_stddev(self.prices.iter().copied());
        let width = self.multiplier * stddev;
        (mean - width, mean + width)
    }
}

/// Mean and population standard deviation; zeros for an empty series.
pub(crate) fn mean_and_stddev<I>(prices: I) -> (Decimal, Decimal)
where
    I: IntoIterator<Item = Decimal>,
    I::IntoIter: Clone,
{
    let prices = prices.into_iter();
    let count = prices.clone().count();
    if count == 0 {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let n = Decimal::from(count);
    let mean = prices.clone().sum::<Decimal>() / n;
    let variance = prices.map(|p| (p - mean) * (p - mean)).sum::<Decimal>() / n;
    (mean, variance.sqrt().unwrap_or(Decimal::ZERO))
}

impl Strategy for BollingerStrategy {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn next(&mut self, quote: &Quote, _config: &TradingConfig) -> Signal {
        let price = quote.mid();
        self.prices.push_back(price);
        if self.prices.len() > self.period {
            self.prices.pop_front();
        }
        if self.prices.len() < self.period {
            return Signal::Hold;
        }

        let (lower, upper) = self.bands();
        if price > upper {
            Signal::Sell
        } else if price < lower {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }
}
