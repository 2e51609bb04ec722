//! Catalog sync pipeline: fetch, invalidate, upsert.
//!
//! One run per scheduler tick. Invalidation strictly precedes the durable
//! write so no reader can pair a pre-write bucket snapshot with the
//! post-write store once the run returns; a failed invalidation is logged
//! and the write proceeds (the fill path repairs the bucket). Nothing here
//! propagates an error — the scheduler must outlive every kind of bad run.

use std::sync::Arc;

use crate::cache::{MonthlyBucketCache, RedisSyncMetadataStore, SyncStatus};
use crate::metrics::Metrics;
use crate::persistence::EventStore;
use crate::provider::EventProvider;

/// Dedup-write ingestion pipeline.
pub struct SyncService {
    provider: Arc<dyn EventProvider>,
    cache: Arc<MonthlyBucketCache>,
    store: Arc<dyn EventStore>,
    metadata: Option<Arc<RedisSyncMetadataStore>>,
    metrics: Arc<Metrics>,
}

impl SyncService {
    /// Creates the pipeline. `metadata` is optional so one-shot and test
    /// runs can skip the Redis bookkeeping.
    #[must_use]
    pub fn new(
        provider: Arc<dyn EventProvider>,
        cache: Arc<MonthlyBucketCache>,
        store: Arc<dyn EventStore>,
        metadata: Option<Arc<RedisSyncMetadataStore>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            provider,
            cache,
            store,
            metadata,
            metrics,
        }
    }

    /// Runs one sync pass. Never returns an error; failures are logged,
    /// counted, and retried by the next tick.
    pub async fn sync_once(&self) {
        self.metrics.record_sync_attempt();

        let events = self.provider.fetch_online_events().await;
        if events.is_empty() {
            tracing::debug!("no online events from the provider, nothing to sync");
            self.record_metadata(SyncStatus::Empty, 0).await;
            return;
        }

        // Invalidation must complete before the upsert begins; a reader
        // may see (old store, no bucket) or (new store, fresh bucket), but
        // never a stale bucket over the new store.
        if let Err(error) = self.cache.invalidate(&events).await {
            tracing::warn!(
                %error,
                "bucket invalidation failed; stale buckets expire via TTL or the next fill"
            );
        }

        match self.store.upsert_batch(&events).await {
            Ok(outcome) => {
                tracing::info!(
                    fetched = events.len(),
                    inserted = outcome.inserted,
                    updated = outcome.updated,
                    "catalog sync completed"
                );
                self.record_metadata(SyncStatus::Ok, events.len() as u64).await;
            }
            Err(error) => {
                self.metrics.record_sync_failure();
                tracing::error!(%error, "catalog sync failed to persist events");
                self.record_metadata(SyncStatus::Failed, 0).await;
            }
        }
    }

    async fn record_metadata(&self, status: SyncStatus, event_count: u64) {
        if let Some(metadata) = &self.metadata {
            let now = chrono::Utc::now().naive_utc();
            metadata.record(status, now, event_count).await;
        }
    }
}
