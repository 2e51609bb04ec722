//! Stats endpoint payload.

use serde::Serialize;
use utoipa::ToSchema;

use crate::cache::SyncMetadata;
use crate::metrics::MetricsSnapshot;
use crate::provider::CircuitState;

/// Operational statistics served by `GET /stats`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Process counters and the upstream latency histogram.
    pub metrics: MetricsSnapshot,
    /// Approximate number of live month buckets.
    pub active_buckets: u64,
    /// Provider circuit breaker state.
    pub breaker: BreakerReport,
    /// Last-known sync run metadata, when Redis bookkeeping is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncMetadata>,
}

/// Circuit breaker view.
#[derive(Debug, Serialize, ToSchema)]
pub struct BreakerReport {
    pub state: CircuitState,
    pub transitions: u64,
}
