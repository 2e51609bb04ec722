//! Bounded asynchronous bucket-fill queue.
//!
//! The composer's critical path never waits on a cache write: it enqueues a
//! job and returns. A single worker task drains the queue and writes month
//! snapshots with the tier-appropriate TTL. When the queue is full the job
//! is shed with a warning — fills are best-effort, and the next miss
//! repopulates whatever was lost.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::strategy::ttl_for_month;
use super::BucketStore;
use crate::config::CacheConfig;
use crate::domain::{BucketMonth, Event};
use crate::error::MarketplaceError;
use crate::metrics::Metrics;
use crate::persistence::EventStore;

/// One unit of background cache work.
#[derive(Debug)]
pub enum FillJob {
    /// Write a prepared full-month snapshot.
    Snapshot {
        month: BucketMonth,
        events: Vec<Event>,
    },
    /// Re-read the month's full range from the durable store, then write
    /// the snapshot. Used when the caller's data cannot prove completeness
    /// for the month.
    Refresh { month: BucketMonth },
}

/// Sending half of the fill queue; cheap to clone.
#[derive(Clone)]
pub struct FillQueue {
    tx: mpsc::Sender<FillJob>,
    metrics: Arc<Metrics>,
}

impl FillQueue {
    /// Enqueues a job without blocking. On overflow the job is dropped and
    /// counted; the bucket stays absent until the next miss.
    pub fn enqueue(&self, job: FillJob) {
        if self.tx.try_send(job).is_err() {
            self.metrics.record_fill_job_dropped();
            tracing::warn!("fill queue full, shedding bucket fill job");
        }
    }
}

/// Spawns the fill worker and returns the queue handle.
///
/// The worker stops once every [`FillQueue`] clone is dropped.
#[must_use]
pub fn spawn_fill_worker(
    buckets: Arc<dyn BucketStore>,
    store: Arc<dyn EventStore>,
    config: CacheConfig,
    metrics: Arc<Metrics>,
) -> FillQueue {
    let (tx, mut rx) = mpsc::channel::<FillJob>(config.fill_queue_capacity.max(1));

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            if let Err(error) = run_job(job, buckets.as_ref(), store.as_ref(), &config).await {
                tracing::warn!(%error, "bucket fill job failed");
            }
        }
        tracing::debug!("fill worker stopped");
    });

    FillQueue { tx, metrics }
}

async fn run_job(
    job: FillJob,
    buckets: &dyn BucketStore,
    store: &dyn EventStore,
    config: &CacheConfig,
) -> Result<(), MarketplaceError> {
    match job {
        FillJob::Snapshot { month, events } => put_snapshot(buckets, config, month, events).await,
        FillJob::Refresh { month } => {
            let events = store
                .find_overlapping(month.first_moment(), month.last_moment())
                .await?;
            put_snapshot(buckets, config, month, events).await
        }
    }
}

async fn put_snapshot(
    buckets: &dyn BucketStore,
    config: &CacheConfig,
    month: BucketMonth,
    events: Vec<Event>,
) -> Result<(), MarketplaceError> {
    let today = chrono::Utc::now().date_naive();
    let ttl = ttl_for_month(month, today, config);
    buckets.put(month, &events, ttl).await
}
