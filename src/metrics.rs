//! Process metrics: cache and sync counters plus an upstream latency
//! histogram.
//!
//! Plain atomics behind an `Arc`; every subsystem increments its own
//! counters and the stats endpoint serves a point-in-time snapshot. The
//! active bucket count is not tracked here — it is read live from the
//! bucket store, which owns that number.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;

/// Upper bucket bounds of the upstream latency histogram, in milliseconds.
/// Observations above the last bound land in the implicit overflow bucket.
const LATENCY_BOUNDS_MS: [u64; 10] = [10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000];

/// Shared metrics registry.
#[derive(Debug, Default)]
pub struct Metrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_errors: AtomicU64,
    invalidations: AtomicU64,
    fill_jobs_dropped: AtomicU64,
    sync_attempts: AtomicU64,
    sync_failures: AtomicU64,
    upstream_latency: LatencyHistogram,
}

impl Metrics {
    /// Records a per-month bucket hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a per-month bucket miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a bucket store transport or decode failure.
    pub fn record_cache_error(&self) {
        self.cache_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` deleted buckets from one invalidation pass.
    pub fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a fill job shed because the queue was full.
    pub fn record_fill_job_dropped(&self) {
        self.fill_jobs_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the start of one sync run.
    pub fn record_sync_attempt(&self) {
        self.sync_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed sync run.
    pub fn record_sync_failure(&self) {
        self.sync_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the wall-clock latency of one upstream attempt.
    pub fn record_upstream_latency(&self, elapsed: Duration) {
        self.upstream_latency.record(elapsed);
    }

    /// Point-in-time snapshot of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_errors: self.cache_errors.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            fill_jobs_dropped: self.fill_jobs_dropped.load(Ordering::Relaxed),
            sync_attempts: self.sync_attempts.load(Ordering::Relaxed),
            sync_failures: self.sync_failures.load(Ordering::Relaxed),
            upstream_latency: self.upstream_latency.snapshot(),
        }
    }
}

/// Fixed-bucket latency histogram.
#[derive(Debug)]
struct LatencyHistogram {
    buckets: [AtomicU64; LATENCY_BOUNDS_MS.len()],
    overflow: AtomicU64,
    sum_ms: AtomicU64,
    observations: AtomicU64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            overflow: AtomicU64::new(0),
            sum_ms: AtomicU64::new(0),
            observations: AtomicU64::new(0),
        }
    }
}

impl LatencyHistogram {
    fn record(&self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match LATENCY_BOUNDS_MS.iter().position(|bound| ms <= *bound) {
            Some(index) => self.buckets[index].fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
        self.sum_ms.fetch_add(ms, Ordering::Relaxed);
        self.observations.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LatencySnapshot {
        let buckets = LATENCY_BOUNDS_MS
            .iter()
            .zip(&self.buckets)
            .map(|(bound, count)| LatencyBucket {
                le_ms: *bound,
                count: count.load(Ordering::Relaxed),
            })
            .collect();
        LatencySnapshot {
            buckets,
            overflow: self.overflow.load(Ordering::Relaxed),
            sum_ms: self.sum_ms.load(Ordering::Relaxed),
            observations: self.observations.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot served by the stats endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_errors: u64,
    pub invalidations: u64,
    pub fill_jobs_dropped: u64,
    pub sync_attempts: u64,
    pub sync_failures: u64,
    pub upstream_latency: LatencySnapshot,
}

/// One histogram bucket: observations at or below `le_ms`.
#[derive(Debug, Serialize, ToSchema)]
pub struct LatencyBucket {
    pub le_ms: u64,
    pub count: u64,
}

/// Snapshot of the upstream latency histogram.
#[derive(Debug, Serialize, ToSchema)]
pub struct LatencySnapshot {
    pub buckets: Vec<LatencyBucket>,
    pub overflow: u64,
    pub sum_ms: u64,
    pub observations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::default();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_invalidations(3);
        metrics.record_sync_attempt();
        metrics.record_sync_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits, 2);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_errors, 0);
        assert_eq!(snapshot.invalidations, 3);
        assert_eq!(snapshot.sync_attempts, 1);
        assert_eq!(snapshot.sync_failures, 1);
    }

    #[test]
    fn latency_lands_in_the_right_bucket() {
        let metrics = Metrics::default();
        metrics.record_upstream_latency(Duration::from_millis(8));
        metrics.record_upstream_latency(Duration::from_millis(10));
        metrics.record_upstream_latency(Duration::from_millis(700));
        metrics.record_upstream_latency(Duration::from_secs(60));

        let snapshot = metrics.snapshot().upstream_latency;
        assert_eq!(snapshot.observations, 4);
        // 8ms and 10ms both fall in the le=10 bucket (bounds are inclusive).
        assert_eq!(snapshot.buckets[0].count, 2);
        // 700ms lands in le=1000.
        let le_1000 = snapshot
            .buckets
            .iter()
            .find(|b| b.le_ms == 1_000)
            .map(|b| b.count);
        assert_eq!(le_1000, Some(1));
        // 60s exceeds every bound.
        assert_eq!(snapshot.overflow, 1);
    }
}
