//! Month-bucket cache: Redis adapter, monthly strategy, async fill queue,
//! and sync metadata.
//!
//! The cache is a read accelerator in front of the durable store, never a
//! source of truth (deleting any bucket loses nothing). A present bucket is
//! a complete snapshot of every stored event intersecting its month; an
//! empty snapshot is a legal positive entry.

pub mod bucket_store;
pub mod fill;
pub mod strategy;
pub mod sync_metadata;

#[cfg(test)]
pub(crate) mod fakes;

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{BucketMonth, Event};
use crate::error::MarketplaceError;

pub use bucket_store::{connect_redis, RedisBucketStore};
pub use fill::{spawn_fill_worker, FillQueue};
pub use strategy::MonthlyBucketCache;
pub use sync_metadata::{RedisSyncMetadataStore, SyncMetadata, SyncStatus};

/// Month-keyed KV store holding bucket snapshots.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Reads a month's snapshot. `Ok(None)` means absent; a present empty
    /// snapshot is a hit.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Cache`] on transport or decode failure.
    async fn get(&self, month: BucketMonth) -> Result<Option<Vec<Event>>, MarketplaceError>;

    /// Writes a month's full snapshot with the given TTL.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Cache`] on transport failure.
    async fn put(
        &self,
        month: BucketMonth,
        events: &[Event],
        ttl: Duration,
    ) -> Result<(), MarketplaceError>;

    /// Deletes a month's snapshot; reports whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Cache`] on transport failure.
    async fn delete(&self, month: BucketMonth) -> Result<bool, MarketplaceError>;

    /// Approximate number of live bucket keys under the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Cache`] on transport failure.
    async fn count(&self) -> Result<u64, MarketplaceError>;
}
