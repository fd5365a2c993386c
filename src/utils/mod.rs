// src/utils/mod.rs
pub mod logging;
pub mod precision;
