//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::cache::{BucketStore, RedisSyncMetadataStore};
use crate::metrics::Metrics;
use crate::provider::ProviderClient;
use crate::service::SearchService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Range query composer.
    pub search: Arc<SearchService>,
    /// Provider client, exposed for breaker reporting.
    pub provider: Arc<ProviderClient>,
    /// Bucket store, exposed for the live bucket count.
    pub buckets: Arc<dyn BucketStore>,
    /// Sync metadata reader; absent in one-shot and test runs.
    pub sync_metadata: Option<Arc<RedisSyncMetadataStore>>,
    /// Process metrics.
    pub metrics: Arc<Metrics>,
}
