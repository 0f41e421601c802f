//! Signals repository — curated trading signals shown by the dashboard

use crate::DbResult;
use serde::{Deserialize, Serialize};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

/// A single signal row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SignalRecord {
    pub id: String,
    pub category: String,
    pub market: String,
    pub url: String,
    pub recommendation: String,
    pub analysis: String,
    /// Intended 0-100, not enforced by the store
    pub confidence: i64,
    pub bet_amount: f64,
    pub est_profit: f64,
    pub char_name: Option<String>,
    pub char_class: Option<String>,
    pub rarity: Option<String>,
    /// Assigned by the store on insert; ignored when writing
    #[serde(default)]
    pub timestamp: Option<String>,
}

const SELECT_SIGNALS: &str = r#"
    SELECT id, category, market, url, recommendation, analysis, confidence,
           bet_amount, est_profit, char_name, char_class, rarity, timestamp
    FROM signals
"#;

const INSERT_SIGNAL: &str = r#"
    INSERT INTO signals
        (id, category, market, url, recommendation, analysis, confidence,
         bet_amount, est_profit, char_name, char_class, rarity)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
"#;

const UPSERT_SIGNAL: &str = r#"
    INSERT INTO signals
        (id, category, market, url, recommendation, analysis, confidence,
         bet_amount, est_profit, char_name, char_class, rarity)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
    ON CONFLICT(id) DO UPDATE SET
        category = excluded.category,
        market = excluded.market,
        url = excluded.url,
        recommendation = excluded.recommendation,
        analysis = excluded.analysis,
        confidence = excluded.confidence,
        bet_amount = excluded.bet_amount,
        est_profit = excluded.est_profit,
        char_name = excluded.char_name,
        char_class = excluded.char_class,
        rarity = excluded.rarity
"#;

fn bind_signal<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    record: &'q SignalRecord,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(&record.id)
        .bind(&record.category)
        .bind(&record.market)
        .bind(&record.url)
        .bind(&record.recommendation)
        .bind(&record.analysis)
        .bind(record.confidence)
        .bind(record.bet_amount)
        .bind(record.est_profit)
        .bind(&record.char_name)
        .bind(&record.char_class)
        .bind(&record.rarity)
}

/// Repository for the `signals` table
pub struct SignalRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SignalRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the whole table with `records` in one transaction.
    ///
    /// Readers see either the previous set or the new one, never an empty or
    /// half-written table. On error the previous set is kept.
    pub async fn replace_all(&self, records: &[SignalRecord]) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM signals")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for record in records {
            bind_signal(sqlx::query(INSERT_SIGNAL), record)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(deleted, inserted = records.len(), "Signals replaced");
        Ok(records.len())
    }

    /// Insert or update a single signal (upsert by id). Other rows are untouched.
    pub async fn upsert(&self, record: &SignalRecord) -> DbResult<()> {
        bind_signal(sqlx::query(UPSERT_SIGNAL), record)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Get a signal by id
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SignalRecord>> {
        let sql = format!("{SELECT_SIGNALS} WHERE id = ?1");
        let record = sqlx::query_as::<_, SignalRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(record)
    }

    /// All signals, newest first (insertion order breaks timestamp ties)
    pub async fn list_recent(&self) -> DbResult<Vec<SignalRecord>> {
        let sql = format!("{SELECT_SIGNALS} ORDER BY timestamp DESC, rowid DESC");
        let records = sqlx::query_as::<_, SignalRecord>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM signals")
            .fetch_one(self.pool)
            .await?;

        Ok(row.0)
    }
}
