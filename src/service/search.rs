//! Range query composer.
//!
//! Glues the bucket cache and the durable store into one answer. The cache
//! strategy reports hits, misses, and failures distinctly; the composer
//! backfills after a miss and falls back silently after a failure. Its
//! critical path never waits on a cache write.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::cache::MonthlyBucketCache;
use crate::domain::Event;
use crate::error::MarketplaceError;
use crate::persistence::EventStore;

/// Composes cache-first range queries with durable-store fallback.
pub struct SearchService {
    cache: Arc<MonthlyBucketCache>,
    store: Arc<dyn EventStore>,
}

impl SearchService {
    /// Creates the composer.
    #[must_use]
    pub fn new(cache: Arc<MonthlyBucketCache>, store: Arc<dyn EventStore>) -> Self {
        Self { cache, store }
    }

    /// Returns every stored event overlapping `[starts_at, ends_at]`,
    /// chronologically ordered. Only online events exist in the store, so
    /// no further filtering happens here.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::InvalidRange`] for an inverted window
    /// and [`MarketplaceError::Store`] when the durable store is
    /// unreachable; cache trouble alone never fails a request.
    pub async fn search(
        &self,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    ) -> Result<Vec<Event>, MarketplaceError> {
        if starts_at > ends_at {
            tracing::warn!(%starts_at, %ends_at, "rejecting inverted search window");
            return Err(MarketplaceError::InvalidRange { starts_at, ends_at });
        }

        match self.cache.query(starts_at, ends_at).await {
            Ok(Some(events)) => {
                tracing::debug!(events = events.len(), "search answered from buckets");
                Ok(events)
            }
            Ok(None) => {
                let events = self.store.find_overlapping(starts_at, ends_at).await?;
                // Best-effort backfill; the response does not wait for it.
                self.cache.fill(starts_at, ends_at, &events);
                tracing::debug!(events = events.len(), "search answered from the durable store");
                Ok(events)
            }
            Err(error) => {
                tracing::warn!(%error, "bucket cache unavailable, serving from the durable store");
                self.store.find_overlapping(starts_at, ends_at).await
            }
        }
    }
}
