// src/core/mod.rs
pub mod engine;
pub mod scan;

pub use engine::{run_strategy_tick, PairSession, TradingEngine};
pub use scan::{ScanResult, ScanSession};
