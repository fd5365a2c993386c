// src/lib.rs
pub mod backtest;
pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod execution;
pub mod risk;
pub mod storage;
pub mod strategies;
pub mod types;
pub mod utils;
