//! Signal Refresher — periodically replaces the `signals` table with a curated batch
//!
//! Each tick deletes every stored signal and inserts the batch inside one
//! transaction, then sleeps for the configured interval. The loop checks its
//! cancel flag every 500ms so Ctrl+C stops it between ticks.

use crate::batch::SignalBatch;
use chrono::{DateTime, Utc};
use persistence::repository::SignalRepository;
use persistence::{with_lock_retry, DbResult, RetryPolicy, SqlitePool};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
const CANCEL_POLL_MS: u64 = 500;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefreshStatus {
    Idle,
    Running,
    Stopped,
    Error,
}

/// Shared progress/state for the refresh loop
pub struct RefreshProgress {
    pub status: RwLock<RefreshStatus>,
    pub cancelled: AtomicBool,
    pub ticks: AtomicU64,
    pub failed_ticks: AtomicU64,
    pub last_rows: AtomicU64,
    pub last_tick_at: RwLock<Option<DateTime<Utc>>>,
    pub error_message: RwLock<Option<String>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RefreshProgress {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(RefreshStatus::Idle),
            cancelled: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            failed_ticks: AtomicU64::new(0),
            last_rows: AtomicU64::new(0),
            last_tick_at: RwLock::new(None),
            error_message: RwLock::new(None),
        }
    }

    /// Ask the loop to stop after the current tick
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> RefreshStatus {
        *read(&self.status)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn failed_ticks(&self) -> u64 {
        self.failed_ticks.load(Ordering::Relaxed)
    }

    pub fn last_tick_at(&self) -> Option<DateTime<Utc>> {
        *read(&self.last_tick_at)
    }

    pub fn error_message(&self) -> Option<String> {
        read(&self.error_message).clone()
    }

    fn set_status(&self, status: RefreshStatus) {
        *write(&self.status) = status;
    }

    fn record_tick(&self, rows: usize) -> u64 {
        self.last_rows.store(rows as u64, Ordering::Relaxed);
        *write(&self.last_tick_at) = Some(Utc::now());
        *write(&self.error_message) = None;
        self.set_status(RefreshStatus::Running);
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record_failure(&self, message: String) {
        self.failed_ticks.fetch_add(1, Ordering::Relaxed);
        *write(&self.error_message) = Some(message);
        self.set_status(RefreshStatus::Error);
    }

    /// Sleep for `total`, waking early if cancelled. Returns false when cancelled.
    async fn sleep_unless_cancelled(&self, total: Duration) -> bool {
        let slice = Duration::from_millis(CANCEL_POLL_MS);
        let mut remaining = total;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }
            let step = remaining.min(slice);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);
        }
        !self.is_cancelled()
    }
}

impl Default for RefreshProgress {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Refresher
// ---------------------------------------------------------------------------

pub struct SignalRefresher {
    pool: SqlitePool,
    batch: SignalBatch,
    interval: Duration,
    retry: RetryPolicy,
}

impl SignalRefresher {
    pub fn new(pool: SqlitePool, batch: SignalBatch) -> Self {
        Self {
            pool,
            batch,
            interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One tick: replace every stored signal with the batch.
    pub async fn run_cycle(&self) -> DbResult<usize> {
        let repo = SignalRepository::new(&self.pool);
        let records = self.batch.records();
        with_lock_retry(self.retry, || repo.replace_all(records)).await
    }

    /// Run ticks until `progress` is cancelled. A failed tick is logged and
    /// the loop carries on at the next interval.
    pub async fn run(&self, progress: &RefreshProgress) {
        info!(
            signals = self.batch.len(),
            interval_secs = self.interval.as_secs(),
            "Signal refresher starting"
        );
        progress.set_status(RefreshStatus::Running);

        loop {
            if progress.is_cancelled() {
                break;
            }

            match self.run_cycle().await {
                Ok(rows) => {
                    let tick = progress.record_tick(rows);
                    info!(tick, rows, "Signal refresh complete");
                }
                Err(e) => {
                    error!(error = %e, "Signal refresh failed");
                    progress.record_failure(e.to_string());
                }
            }

            if !progress.sleep_unless_cancelled(self.interval).await {
                break;
            }
        }

        progress.set_status(RefreshStatus::Stopped);
        info!(ticks = progress.ticks(), "Signal refresher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::Database;
    use std::sync::Arc;

    async fn setup() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.init_signals().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_cycle_writes_exactly_the_batch() {
        let db = setup().await;
        let refresher = SignalRefresher::new(db.pool_clone(), SignalBatch::curated());

        let rows = refresher.run_cycle().await.unwrap();
        assert_eq!(rows, 7);

        let mut stored: Vec<String> = SignalRepository::new(db.pool())
            .list_recent()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        stored.sort();
        let mut expected: Vec<String> = SignalBatch::curated()
            .records()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        expected.sort();
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn test_cycle_removes_rows_outside_the_batch() {
        let db = setup().await;
        let repo = SignalRepository::new(db.pool());
        repo.upsert(&crate::batch::urgent_signal()).await.unwrap();

        let refresher = SignalRefresher::new(db.pool_clone(), SignalBatch::curated());
        refresher.run_cycle().await.unwrap();

        assert!(repo.get_by_id("sig_99").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_repeated_cycles_do_not_accumulate() {
        let db = setup().await;
        let refresher = SignalRefresher::new(db.pool_clone(), SignalBatch::curated());
        for _ in 0..3 {
            refresher.run_cycle().await.unwrap();
        }
        assert_eq!(SignalRepository::new(db.pool()).count().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_stops_after_cancel() {
        let db = setup().await;
        let refresher = SignalRefresher::new(db.pool_clone(), SignalBatch::curated())
            .with_interval(Duration::from_millis(10));
        let progress = Arc::new(RefreshProgress::new());

        let task_progress = progress.clone();
        let handle = tokio::spawn(async move {
            refresher.run(&task_progress).await;
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            while progress.ticks() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("refresher should tick");

        progress.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("refresher should stop")
            .unwrap();

        assert_eq!(progress.status(), RefreshStatus::Stopped);
        assert!(progress.last_tick_at().is_some());
        assert_eq!(progress.failed_ticks(), 0);
    }

    #[tokio::test]
    async fn test_failed_tick_is_recorded_and_loop_continues() {
        // No schema: every tick fails with "no such table"
        let db = Database::in_memory().await.unwrap();
        let refresher = SignalRefresher::new(db.pool_clone(), SignalBatch::curated())
            .with_interval(Duration::from_millis(10));
        let progress = Arc::new(RefreshProgress::new());

        let task_progress = progress.clone();
        let handle = tokio::spawn(async move {
            refresher.run(&task_progress).await;
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            while progress.failed_ticks() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("refresher should keep ticking after failures");

        assert_eq!(progress.status(), RefreshStatus::Error);

        progress.cancel();
        handle.await.unwrap();

        assert_eq!(progress.ticks(), 0);
        assert!(progress.error_message().is_some());
        assert_eq!(progress.status(), RefreshStatus::Stopped);
    }

    #[tokio::test]
    async fn test_successful_tick_clears_error_status() {
        let db = Database::in_memory().await.unwrap();
        let refresher = SignalRefresher::new(db.pool_clone(), SignalBatch::curated())
            .with_interval(Duration::from_millis(10));
        let progress = Arc::new(RefreshProgress::new());

        let task_progress = progress.clone();
        let handle = tokio::spawn(async move {
            refresher.run(&task_progress).await;
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            while progress.failed_ticks() < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first tick should fail without a schema");

        db.init_signals().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while progress.ticks() < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("refresher should recover once the table exists");

        assert_eq!(progress.status(), RefreshStatus::Running);
        assert!(progress.error_message().is_none());

        progress.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_before_start_skips_all_ticks() {
        let db = setup().await;
        let refresher = SignalRefresher::new(db.pool_clone(), SignalBatch::curated());
        let progress = RefreshProgress::new();
        progress.cancel();

        refresher.run(&progress).await;

        assert_eq!(progress.ticks(), 0);
        assert_eq!(progress.status(), RefreshStatus::Stopped);
    }
}
