//! Whale sync — one-shot upsert of the curated whale list
//!
//! Unlike the signal refresher this never deletes: a whale dropped from the
//! batch stays in the store with its last synced values.

use crate::batch::WhaleBatch;
use persistence::repository::WhaleRepository;
use persistence::{with_lock_retry, Database, DbResult, RetryPolicy};
use tracing::info;

/// Create the `whales` table if absent, then upsert every whale in `batch`.
pub async fn sync_whales(db: &Database, batch: &WhaleBatch, retry: RetryPolicy) -> DbResult<usize> {
    info!(whales = batch.len(), "Tracking whale wallets");
    db.init_whales().await?;

    let repo = WhaleRepository::new(db.pool());
    let upserted = with_lock_retry(retry, || repo.upsert_all(batch.records())).await?;

    info!(upserted, "Whale list synced");
    Ok(upserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::repository::WhaleRecord;

    fn bumped_batch() -> WhaleBatch {
        let records: Vec<WhaleRecord> = WhaleBatch::curated()
            .records()
            .iter()
            .filter(|w| w.alias != "POLITICAL_SNIPER")
            .cloned()
            .map(|mut w| {
                if w.alias == "WHALE_ONE" {
                    w.total_profit = 2_500_000.0;
                }
                w
            })
            .collect();
        WhaleBatch::new(records).unwrap()
    }

    #[tokio::test]
    async fn test_second_sync_updates_values_by_address() {
        let db = Database::in_memory().await.unwrap();
        sync_whales(&db, &WhaleBatch::curated(), RetryPolicy::default())
            .await
            .unwrap();
        sync_whales(&db, &bumped_batch(), RetryPolicy::default())
            .await
            .unwrap();

        let whales = WhaleRepository::new(db.pool()).list_by_profit().await.unwrap();
        let whale_one: Vec<&WhaleRecord> =
            whales.iter().filter(|w| w.alias == "WHALE_ONE").collect();
        assert_eq!(whale_one.len(), 1);
        assert_eq!(whale_one[0].total_profit, 2_500_000.0);
    }

    #[tokio::test]
    async fn test_whales_missing_from_batch_are_kept() {
        let db = Database::in_memory().await.unwrap();
        sync_whales(&db, &WhaleBatch::curated(), RetryPolicy::default())
            .await
            .unwrap();
        sync_whales(&db, &bumped_batch(), RetryPolicy::default())
            .await
            .unwrap();

        let repo = WhaleRepository::new(db.pool());
        assert_eq!(repo.count().await.unwrap(), 4);
        let whales = repo.list_by_profit().await.unwrap();
        let sniper = whales
            .iter()
            .find(|w| w.alias == "POLITICAL_SNIPER")
            .expect("stale whale should remain");
        assert_eq!(sniper.total_profit, 450_000.0);
    }
}
