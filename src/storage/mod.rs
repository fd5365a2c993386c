// src/storage/mod.rs
//! Trade and slice records written during sliced execution.
pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::types::{Side, SliceRecord, TradeRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Append-only store of executed trades and their slices.
///
/// Writes complete (or fail) before returning; a slice must reference a
/// trade that already exists.
#[async_trait]
pub trait TradeStore: Send + Sync {
    async fn save_trade(
        &self,
        timestamp: DateTime<Utc>,
        pair: &str,
        side: Side,
        price: Decimal,
        volume: Decimal,
    ) -> Result<i64, StoreError>;

    async fn save_slice(
        &self,
        trade_id: i64,
        index: usize,
        size: Decimal,
        weight: Decimal,
    ) -> Result<(), StoreError>;

    /// All trades ordered by timestamp.
    async fn list_trades(&self) -> Result<Vec<TradeRecord>, StoreError>;

    /// Slices of one trade ordered by slice index.
    async fn list_slices(&self, trade_id: i64) -> Result<Vec<SliceRecord>, StoreError>;
}
