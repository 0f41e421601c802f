//! Whales repository — tracked wallets, upserted by address

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

/// A tracked whale wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WhaleRecord {
    pub address: String,
    pub alias: String,
    pub total_profit: f64,
    pub last_trade: String,
    /// ACTIVE, IDLE, ...
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Repository for the `whales` table
pub struct WhaleRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> WhaleRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert every whale by address in one transaction.
    /// Addresses absent from `records` are left in place.
    pub async fn upsert_all(&self, records: &[WhaleRecord]) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(
                r#"INSERT INTO whales (address, alias, total_profit, last_trade, status)
                   VALUES (?1, ?2, ?3, ?4, ?5)
                   ON CONFLICT(address) DO UPDATE SET
                     alias = excluded.alias,
                     total_profit = excluded.total_profit,
                     last_trade = excluded.last_trade,
                     status = excluded.status
                "#,
            )
            .bind(&record.address)
            .bind(&record.alias)
            .bind(record.total_profit)
            .bind(&record.last_trade)
            .bind(&record.status)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(upserted = records.len(), "Whales upserted");
        Ok(records.len())
    }

    /// All whales, most profitable first
    pub async fn list_by_profit(&self) -> DbResult<Vec<WhaleRecord>> {
        let records = sqlx::query_as::<_, WhaleRecord>(
            r#"SELECT address, alias, total_profit, last_trade, status, timestamp
               FROM whales
               ORDER BY total_profit DESC"#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM whales")
            .fetch_one(self.pool)
            .await?;

        Ok(row.0)
    }
}
