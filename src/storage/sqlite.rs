// src/storage/sqlite.rs
use crate::error::StoreError;
use crate::storage::TradeStore;
use crate::types::{Side, SliceRecord, TradeRecord};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const CREATE_TRADES: &str = r#"
    CREATE TABLE IF NOT EXISTS trades (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        pair      TEXT NOT NULL,
        side      TEXT NOT NULL,
        price     TEXT NOT NULL,
        volume    TEXT NOT NULL
    )
"#;

const CREATE_SLICES: &str = r#"
    CREATE TABLE IF NOT EXISTS slices (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        trade_id    INTEGER NOT NULL REFERENCES trades(id),
        slice_index INTEGER NOT NULL,
        size        TEXT NOT NULL,
        weight      TEXT NOT NULL
    )
"#;

const CREATE_SLICES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS slices_by_trade ON slices (trade_id, slice_index)";

type TradeRow = (i64, String, String, String, String, String);
type SliceRow = (i64, i64, i64, String, String);

/// Trades and slices in a SQLite database.
///
/// Decimals are stored as text so they read back exactly. Timestamps are
/// fixed-width RFC 3339 in UTC, which keeps `ORDER BY timestamp` chronological.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        info!("Opened trade store at {}", path.display());
        Self::migrate(pool).await
    }

    /// Private database that lives as long as the store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // every pooled connection would get its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in [CREATE_TRADES, CREATE_SLICES, CREATE_SLICES_INDEX] {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), ErrorKind::ForeignKeyViolation)
                || db.message().contains("FOREIGN KEY constraint failed")
        }
        _ => false,
    }
}

fn parse_decimal(column: &'static str, value: String) -> Result<Decimal, StoreError> {
    Decimal::from_str(&value).map_err(|_| StoreError::Corrupt { column, value })
}

fn parse_side(value: String) -> Result<Side, StoreError> {
    match value.as_str() {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        _ => Err(StoreError::Corrupt {
            column: "side",
            value,
        }),
    }
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt {
            column: "timestamp",
            value,
        })
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = StoreError;

    fn try_from((id, timestamp, pair, side, price, volume): TradeRow) -> Result<Self, StoreError> {
        Ok(TradeRecord {
            id,
            timestamp: parse_timestamp(timestamp)?,
            pair,
            side: parse_side(side)?,
            price: parse_decimal("price", price)?,
            volume: parse_decimal("volume", volume)?,
        })
    }
}

impl TryFrom<SliceRow> for SliceRecord {
    type Error = StoreError;

    fn try_from((id, trade_id, index, size, weight): SliceRow) -> Result<Self, StoreError> {
        let index = usize::try_from(index).map_err(|_| StoreError::Corrupt {
            column: "slice_index",
            value: index.to_string(),
        })?;
        Ok(SliceRecord {
            id,
            trade_id,
            index,
            size: parse_decimal("size", size)?,
            weight: parse_decimal("weight", weight)?,
        })
    }
}

#[async_trait]
impl TradeStore for SqliteStore {
    async fn save_trade(
        &self,
        timestamp: DateTime<Utc>,
        pair: &str,
        side: Side,
        price: Decimal,
        volume: Decimal,
    ) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO trades (timestamp, pair, side, price, volume) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .bind(pair)
        .bind(side.to_string())
        .bind(price.to_string())
        .bind(volume.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn save_slice(
        &self,
        trade_id: i64,
        index: usize,
        size: Decimal,
        weight: Decimal,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO slices (trade_id, slice_index, size, weight) VALUES (?, ?, ?, ?)",
        )
        .bind(trade_id)
        .bind(index as i64)
        .bind(size.to_string())
        .bind(weight.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::UnknownTrade(trade_id)
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn list_trades(&self) -> Result<Vec<TradeRecord>, StoreError> {
        sqlx::query_as::<_, TradeRow>(
            "SELECT id, timestamp, pair, side, price, volume FROM trades ORDER BY timestamp, id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TradeRecord::try_from)
        .collect()
    }

    async fn list_slices(&self, trade_id: i64) -> Result<Vec<SliceRecord>, StoreError> {
        sqlx::query_as::<_, SliceRow>(
            "SELECT id, trade_id, slice_index, size, weight FROM slices \
             WHERE trade_id = ? ORDER BY slice_index",
        )
        .bind(trade_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(SliceRecord::try_from)
        .collect()
    }
}
