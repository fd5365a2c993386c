// src/risk/mod.rs
pub mod sizing;

pub use sizing::{sizer_from_config, FixedSizer, KellySizer, PositionSizer};
