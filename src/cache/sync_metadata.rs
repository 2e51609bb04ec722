//! Sync run metadata in Redis.
//!
//! Records when the last catalog sync ran, how it ended, and how many events
//! it carried, so operators can tell a quiet upstream from a broken
//! pipeline. Everything here is best-effort: a metadata failure is logged
//! and never propagated into the sync path.

use chrono::NaiveDateTime;
use redis::aio::ConnectionManager;
use serde::Serialize;
use utoipa::ToSchema;

const LAST_SYNC_KEY: &str = "fever:sync:last_sync";
const SYNC_STATUS_KEY: &str = "fever:sync:status";
const EVENT_COUNT_KEY: &str = "fever:sync:event_count";
const METADATA_TTL_SECS: u64 = 24 * 60 * 60;

/// How a sync run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Events were fetched and upserted.
    Ok,
    /// The upstream had nothing to sync (or the breaker was open).
    Empty,
    /// The durable write failed.
    Failed,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Empty => "EMPTY",
            Self::Failed => "FAILED",
        }
    }
}

/// Last-known sync state, as read back from Redis.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncMetadata {
    /// When the last run finished, if known.
    pub last_sync: Option<NaiveDateTime>,
    /// Status string of the last run, if known.
    pub status: Option<String>,
    /// Events carried by the last successful run, if known.
    pub event_count: Option<u64>,
}

/// Redis-backed sync metadata store.
#[derive(Clone)]
pub struct RedisSyncMetadataStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisSyncMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSyncMetadataStore").finish_non_exhaustive()
    }
}

impl RedisSyncMetadataStore {
    /// Creates a store over an existing managed connection.
    #[must_use]
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Records the outcome of a sync run. Best-effort; failures are logged.
    pub async fn record(&self, status: SyncStatus, at: NaiveDateTime, event_count: u64) {
        self.set(SYNC_STATUS_KEY, status.as_str().to_owned()).await;
        self.set(LAST_SYNC_KEY, at.format("%Y-%m-%dT%H:%M:%S").to_string())
            .await;
        self.set(EVENT_COUNT_KEY, event_count.to_string()).await;
    }

    /// Reads back the last-known sync state. Unreadable fields come back as
    /// `None`.
    pub async fn report(&self) -> SyncMetadata {
        let last_sync = self
            .get(LAST_SYNC_KEY)
            .await
            .and_then(|raw| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S").ok());
        let status = self.get(SYNC_STATUS_KEY).await;
        let event_count = self
            .get(EVENT_COUNT_KEY)
            .await
            .and_then(|raw| raw.parse().ok());
        SyncMetadata {
            last_sync,
            status,
            event_count,
        }
    }

    async fn set(&self, key: &str, value: String) {
        let mut conn = self.conn.clone();
        let result = redis::cmd("SETEX")
            .arg(key)
            .arg(METADATA_TTL_SECS)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await;
        if let Err(error) = result {
            tracing::warn!(key, %error, "failed to update sync metadata");
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match redis::cmd("GET").arg(key).query_async(&mut conn).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(key, %error, "failed to read sync metadata");
                None
            }
        }
    }
}
