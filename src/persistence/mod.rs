//! Persistence layer: the durable event store over PostgreSQL.
//!
//! The durable store is the source of truth; the bucket cache in front of it
//! may be dropped at any time without data loss. Concrete access goes
//! through `sqlx::PgPool`.
//!
//! Expected schema (managed by external migration tooling):
//!
//! ```text
//! events(
//!     id          UUID PRIMARY KEY,
//!     title       TEXT NOT NULL,
//!     start_date  DATE NOT NULL,
//!     start_time  TIME NOT NULL,
//!     end_date    DATE NOT NULL,
//!     end_time    TIME NOT NULL,
//!     min_price   NUMERIC NOT NULL,
//!     max_price   NUMERIC NOT NULL,
//!     event_hash  TEXT NOT NULL UNIQUE,
//!     created_at  TIMESTAMPTZ NOT NULL,
//!     updated_at  TIMESTAMPTZ NOT NULL
//! )
//! indexes: (start_date, start_time); (start_date, end_date); UNIQUE(event_hash)
//! ```

pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::domain::Event;
use crate::error::MarketplaceError;

pub use postgres::PostgresEventStore;

/// Outcome of a batch upsert: rows freshly inserted vs. rows whose mutable
/// fields were overwritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
}

/// The durable event store.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Returns every event whose `[start_ts, end_ts]` intersects the closed
    /// window `[from, to]`, ordered ascending by `(start_date, start_time)`
    /// with ties broken by id.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Store`] on transport failure.
    async fn find_overlapping(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Event>, MarketplaceError>;

    /// Upserts the batch in a single transaction, keyed by content hash:
    /// unseen hashes insert with the provided id; seen hashes overwrite the
    /// mutable fields and refresh `updated_at`, preserving the original id.
    /// All-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Store`] on transport failure; the
    /// transaction is rolled back.
    async fn upsert_batch(&self, events: &[Event]) -> Result<UpsertOutcome, MarketplaceError>;
}
