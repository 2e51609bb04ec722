//! PostgreSQL implementation of the durable event store.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use super::models::EventRow;
use super::{EventStore, UpsertOutcome};
use crate::domain::Event;
use crate::error::MarketplaceError;

/// Overlap query on the split date/time columns. Postgres row-wise
/// comparison keeps the predicate index-friendly on
/// `(start_date, start_time)`.
const FIND_OVERLAPPING_SQL: &str = "\
    SELECT id, title, start_date, start_time, end_date, end_time, min_price, max_price \
    FROM events \
    WHERE (start_date, start_time) <= ($1, $2) \
      AND (end_date, end_time) >= ($3, $4) \
    ORDER BY start_date, start_time, id";

/// Hash-keyed upsert. `created_at` and `id` are only written on insert, so
/// re-seen events keep their identity; `RETURNING created_at = updated_at`
/// distinguishes inserts from updates (`NOW()` is constant within a
/// transaction).
const UPSERT_SQL: &str = "\
    INSERT INTO events ( \
        id, title, start_date, start_time, end_date, end_time, \
        min_price, max_price, event_hash, created_at, updated_at \
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW()) \
    ON CONFLICT (event_hash) DO UPDATE SET \
        title = EXCLUDED.title, \
        start_date = EXCLUDED.start_date, \
        start_time = EXCLUDED.start_time, \
        end_date = EXCLUDED.end_date, \
        end_time = EXCLUDED.end_time, \
        min_price = EXCLUDED.min_price, \
        max_price = EXCLUDED.max_price, \
        updated_at = NOW() \
    RETURNING created_at = updated_at";

/// PostgreSQL-backed event store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn find_overlapping(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Event>, MarketplaceError> {
        let rows = sqlx::query_as::<_, EventRow>(FIND_OVERLAPPING_SQL)
            .bind(to.date())
            .bind(to.time())
            .bind(from.date())
            .bind(from.time())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MarketplaceError::Store(e.to_string()))?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn upsert_batch(&self, events: &[Event]) -> Result<UpsertOutcome, MarketplaceError> {
        if events.is_empty() {
            return Ok(UpsertOutcome::default());
        }

        let batch = dedupe_last_write_wins(events);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MarketplaceError::Store(e.to_string()))?;

        let mut outcome = UpsertOutcome::default();
        for event in batch {
            let freshly_inserted: bool = sqlx::query_scalar(UPSERT_SQL)
                .bind(event.id.as_uuid())
                .bind(&event.title)
                .bind(event.start_date)
                .bind(event.start_time)
                .bind(event.end_date)
                .bind(event.end_time)
                .bind(&event.min_price)
                .bind(&event.max_price)
                .bind(event.content_hash())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| MarketplaceError::Store(e.to_string()))?;

            if freshly_inserted {
                outcome.inserted += 1;
            } else {
                outcome.updated += 1;
            }
        }

        tx.commit()
            .await
            .map_err(|e| MarketplaceError::Store(e.to_string()))?;

        tracing::debug!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            "event batch upserted"
        );
        Ok(outcome)
    }
}

/// Collapses in-batch hash duplicates before the round trip: the last
/// occurrence of each hash wins, and the surviving rows are emitted in hash
/// order so conflict resolution is deterministic regardless of input order.
/// Postgres rejects a statement touching the same conflict target twice, so
/// this must happen client-side.
fn dedupe_last_write_wins(events: &[Event]) -> Vec<&Event> {
    let mut by_hash = std::collections::BTreeMap::new();
    for event in events {
        by_hash.insert(event.content_hash(), event);
    }
    by_hash.into_values().collect()
}
