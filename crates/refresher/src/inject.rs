//! One-shot injector — upserts a single signal outside the refresh cycle
//!
//! Re-running is safe: the write is an upsert on the signal id. The injected
//! row only lives until the next refresher tick, which replaces the whole
//! table with its own batch. Because that replace is one transaction, an
//! injection that lands mid-tick is either removed by that tick or survives
//! until the following one; it is never half-applied.

use persistence::repository::{SignalRecord, SignalRepository};
use persistence::{with_lock_retry, DbResult, RetryPolicy, SqlitePool};
use tracing::info;

/// Id of the built-in urgent signal
pub const URGENT_SIGNAL_ID: &str = "sig_99";

/// Upsert `record` into `signals`, leaving every other row untouched.
pub async fn inject_signal(
    pool: &SqlitePool,
    record: &SignalRecord,
    retry: RetryPolicy,
) -> DbResult<()> {
    let repo = SignalRepository::new(pool);
    with_lock_retry(retry, || repo.upsert(record)).await?;
    info!(id = %record.id, market = %record.market, "Signal injected");
    Ok(())
}
