//! Periodic, non-overlapping driver of the sync pipeline.
//!
//! One interval loop on its own task. Each run is awaited before the next
//! tick is taken and missed ticks are skipped, so two runs can never
//! overlap. Runs execute inside their own spawned task: a panic inside the
//! pipeline surfaces as a `JoinError` here, is logged, and the loop keeps
//! ticking.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::SyncConfig;
use crate::service::SyncService;

/// Runs the sync loop until the shutdown signal fires. Spawn this on its
/// own task; when `config.enabled` is false it returns immediately.
pub async fn run_scheduler(
    sync: Arc<SyncService>,
    config: SyncConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    if !config.enabled {
        tracing::info!("sync scheduler disabled by configuration");
        return;
    }

    let mut ticker = tokio::time::interval(config.interval);
    // Ticks firing while a run is still executing are dropped, not queued.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(interval_ms = config.interval.as_millis() as u64, "sync scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sync = Arc::clone(&sync);
                let run = tokio::spawn(async move { sync.sync_once().await });
                if let Err(error) = run.await {
                    if error.is_panic() {
                        tracing::error!("sync run panicked; scheduler continues");
                    } else {
                        tracing::warn!(%error, "sync run was cancelled");
                    }
                }
            }
            _ = shutdown.changed() => {
                tracing::info!("sync scheduler shutting down");
                return;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::fakes::{MemoryBucketStore, MemoryEventStore};
    use crate::cache::fill::spawn_fill_worker;
    use crate::cache::{BucketStore, MonthlyBucketCache};
    use crate::config::CacheConfig;
    use crate::domain::event::tests::make_event;
    use crate::domain::Event;
    use crate::metrics::Metrics;
    use crate::persistence::EventStore;
    use crate::provider::EventProvider;

    /// Provider that panics on its first fetch, then serves one event.
    struct PanicsOnceProvider {
        fetches: Mutex<u32>,
    }

    #[async_trait]
    impl EventProvider for PanicsOnceProvider {
        async fn fetch_online_events(&self) -> Vec<Event> {
            let count = {
                let Ok(mut fetches) = self.fetches.lock() else {
                    return Vec::new();
                };
                *fetches += 1;
                *fetches
            };
            assert!(count > 1, "injected first-run panic");
            vec![make_event("Show", "2024-12-15T20:00:00", "2024-12-15T23:00:00")]
        }
    }

    fn test_config() -> CacheConfig {
        CacheConfig {
            key_prefix: "fever:events:month:".to_owned(),
            ttl_hours: 6,
            current_month_ttl_hours: 2,
            long_term_ttl_hours: 168,
            enable_tiered_ttl: true,
            max_months_per_query: 24,
            fill_queue_capacity: 64,
        }
    }

    fn sync_with(provider: Arc<dyn EventProvider>) -> (Arc<SyncService>, Arc<MemoryEventStore>) {
        let buckets = Arc::new(MemoryBucketStore::new());
        let store = Arc::new(MemoryEventStore::new());
        let metrics = Arc::new(Metrics::default());
        let fill_queue = spawn_fill_worker(
            Arc::clone(&buckets) as Arc<dyn BucketStore>,
            Arc::clone(&store) as Arc<dyn EventStore>,
            test_config(),
            Arc::clone(&metrics),
        );
        let cache = Arc::new(MonthlyBucketCache::new(
            Arc::clone(&buckets) as Arc<dyn BucketStore>,
            Arc::clone(&store) as Arc<dyn EventStore>,
            fill_queue,
            test_config(),
            Arc::clone(&metrics),
        ));
        let sync = Arc::new(SyncService::new(
            provider,
            cache,
            Arc::clone(&store) as Arc<dyn EventStore>,
            None,
            metrics,
        ));
        (sync, store)
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_scheduler_returns_immediately() {
        let (sync, store) = sync_with(Arc::new(PanicsOnceProvider {
            fetches: Mutex::new(1), // never panics, never called anyway
        }));
        let (_tx, rx) = watch::channel(false);
        let config = SyncConfig {
            enabled: false,
            interval: Duration::from_millis(10),
        };

        run_scheduler(sync, config, rx).await;
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_survives_a_panicking_run() {
        let (sync, store) = sync_with(Arc::new(PanicsOnceProvider {
            fetches: Mutex::new(0),
        }));
        let (tx, rx) = watch::channel(false);
        let config = SyncConfig {
            enabled: true,
            interval: Duration::from_millis(100),
        };

        let scheduler = tokio::spawn(run_scheduler(sync, config, rx));

        // First tick panics inside the run; second tick succeeds.
        tokio::time::sleep(Duration::from_millis(250)).await;
        let _ = tx.send(true);
        let Ok(()) = scheduler.await else {
            panic!("scheduler task itself must not die");
        };

        assert_eq!(store.stored().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_loop() {
        let (sync, _store) = sync_with(Arc::new(PanicsOnceProvider {
            fetches: Mutex::new(1),
        }));
        let (tx, rx) = watch::channel(false);
        let config = SyncConfig {
            enabled: true,
            interval: Duration::from_secs(3600),
        };

        let scheduler = tokio::spawn(run_scheduler(sync, config, rx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = tx.send(true);
        let Ok(()) = scheduler.await else {
            panic!("scheduler did not stop cleanly");
        };
    }
}
