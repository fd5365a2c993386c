// src/error.rs
use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid indicator parameters, raised when a strategy is built.
#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("invalid SMA windows: short={short}, long={long} (need 0 < short < long)")]
    InvalidWindows { short: usize, long: usize },

    #[error("invalid {indicator} period: {period}")]
    InvalidPeriod {
        indicator: &'static str,
        period: usize,
    },

    #[error("invalid Bollinger multiplier: {0}")]
    InvalidMultiplier(Decimal),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("slice references unknown trade {0}")]
    UnknownTrade(i64),

    #[error("corrupt {column} value {value:?}")]
    Corrupt { column: &'static str, value: String },
}

/// Everything an executor chain can return to its caller.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("stake size {stake} > position limit {limit}")]
    PositionLimit { stake: Decimal, limit: Decimal },

    #[error("max drawdown {max_drawdown} exceeded (drawdown {drawdown})")]
    MaxDrawdown {
        max_drawdown: Decimal,
        drawdown: Decimal,
    },

    #[error("execution cancelled")]
    Cancelled,

    #[error(transparent)]
    Broker(#[from] anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error, PartialEq)]
pub enum BacktestError {
    #[error("invalid threshold grid: start={start}, end={end}, step={step}")]
    InvalidGrid {
        start: Decimal,
        end: Decimal,
        step: Decimal,
    },
}
