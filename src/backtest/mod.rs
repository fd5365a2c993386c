// src/backtest/mod.rs
//! Offline evaluation over historical candles.
pub mod grid;
pub mod replay;

pub use grid::{optimize_pairs, optimize_thresholds, run_threshold_grid_search, ThresholdResult};
pub use replay::{run_backtest, BacktestPoint, BacktestReport};
