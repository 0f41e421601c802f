//! Persistence layer for Agora Watcher
//!
//! One SQLite file holds the `signals` and `whales` tables. The writer roles
//! (refresher, whale sync, injector) and the reader role (web server) open the
//! same file independently; SQLite locking is the only coordination.

pub mod repository;
pub mod retry;
pub mod schema;

pub use retry::{with_lock_retry, RetryPolicy};
pub use sqlx::sqlite::SqlitePool;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Default wait on a locked database before SQLite reports `SQLITE_BUSY`.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: String, reason: String },

    #[error("Schema conflict on table '{table}': expected columns [{expected}], found [{found}]")]
    SchemaConflict {
        table: String,
        expected: String,
        found: String,
    },

    #[error("Database is locked: {0}")]
    LockTimeout(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl DbError {
    /// True for contention errors that are worth retrying.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, DbError::LockTimeout(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => {
                // Extended result codes keep the primary code in the low byte
                // (SQLITE_BUSY = 5, SQLITE_LOCKED = 6).
                let primary = db_err
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);
                if matches!(primary, Some(5) | Some(6))
                    || db_err.message().contains("database is locked")
                {
                    DbError::LockTimeout(db_err.message().to_string())
                } else {
                    DbError::Sqlx(err)
                }
            }
            sqlx::Error::PoolTimedOut => DbError::LockTimeout("connection pool timed out".into()),
            _ => DbError::Sqlx(err),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Where the store lives and how connections behave.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub path: PathBuf,
    pub busy_timeout: Duration,
    pub max_connections: u32,
}

impl StoreOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            max_connections: 5,
        }
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

/// Database connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the store file described by `options`.
    pub async fn open(options: &StoreOptions) -> DbResult<Self> {
        let path = options.path.as_path();
        let unavailable = |reason: String| DbError::StorageUnavailable {
            path: path.display().to_string(),
            reason,
        };

        // Create parent directories if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| unavailable(e.to_string()))?;
        }

        let connect = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            // WAL lets the web server read while the refresher writes
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        debug!(
            path = %path.display(),
            busy_timeout_ms = options.busy_timeout.as_millis() as u64,
            "Store opened"
        );

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DbError::StorageUnavailable {
                path: ":memory:".into(),
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// Drop and recreate the `signals` table. Destroys every stored signal.
    pub async fn init_signals(&self) -> DbResult<()> {
        self.execute_script(schema::DROP_SIGNALS).await?;
        self.execute_script(schema::CREATE_SIGNALS).await?;
        self.verify_shape(schema::SIGNALS_TABLE, schema::SIGNAL_COLUMNS)
            .await?;
        self.execute_script(schema::SIGNAL_INDEXES).await?;
        info!("Signals table reset");
        Ok(())
    }

    /// Create the `whales` table if absent. Existing rows are kept.
    pub async fn init_whales(&self) -> DbResult<()> {
        self.execute_script(schema::CREATE_WHALES).await?;
        self.verify_shape(schema::WHALES_TABLE, schema::WHALE_COLUMNS)
            .await?;
        self.execute_script(schema::WHALE_INDEXES).await?;
        Ok(())
    }

    /// Non-destructive schema setup for the reader role: creates whatever is
    /// missing and checks that both tables have the expected shape.
    pub async fn ensure_schema(&self) -> DbResult<()> {
        self.execute_script(schema::CREATE_SIGNALS).await?;
        self.verify_shape(schema::SIGNALS_TABLE, schema::SIGNAL_COLUMNS)
            .await?;
        self.execute_script(schema::SIGNAL_INDEXES).await?;
        self.init_whales().await
    }

    /// Execute each statement of a script individually
    async fn execute_script(&self, script: &str) -> DbResult<()> {
        for statement in script.split(';') {
            // Strip comment-only lines, then check if any SQL remains
            let sql: String = statement
                .lines()
                .filter(|line| !line.trim().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n");
            let sql = sql.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Compare a table's column names with the expected set.
    async fn verify_shape(&self, table: &str, expected: &[&str]) -> DbResult<()> {
        let mut found: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?1)")
                .bind(table)
                .fetch_all(&self.pool)
                .await?;
        found.sort();

        let mut wanted: Vec<&str> = expected.to_vec();
        wanted.sort_unstable();

        if found.iter().map(String::as_str).eq(wanted.iter().copied()) {
            return Ok(());
        }

        Err(DbError::SchemaConflict {
            table: table.to_string(),
            expected: wanted.join(", "),
            found: found.join(", "),
        })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Clone the pool for use in spawned tasks
    pub fn pool_clone(&self) -> SqlitePool {
        self.pool.clone()
    }
}
