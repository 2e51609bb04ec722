//! Monthly bucket cache strategy: decomposition, partial-hit assembly,
//! tiered TTLs, and invalidation.
//!
//! A query window decomposes into the inclusive list of months it touches.
//! Each present month bucket is authoritative for its month, so a query is
//! answered by combining cached months with one durable-store read covering
//! the rest. The strategy reports misses and failures distinctly: a miss
//! sends the composer to the durable store with a follow-up fill, a failure
//! sends it there with no write-back.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use super::fill::{FillJob, FillQueue};
use super::BucketStore;
use crate::config::CacheConfig;
use crate::domain::{BucketMonth, Event};
use crate::error::MarketplaceError;
use crate::metrics::Metrics;
use crate::persistence::EventStore;

const SECS_PER_HOUR: u64 = 3_600;

/// Month-bucket read/write/invalidate strategy over a [`BucketStore`], with
/// the durable store backing partial hits.
pub struct MonthlyBucketCache {
    buckets: Arc<dyn BucketStore>,
    store: Arc<dyn EventStore>,
    fill_queue: FillQueue,
    config: CacheConfig,
    metrics: Arc<Metrics>,
}

impl MonthlyBucketCache {
    /// Creates the strategy.
    #[must_use]
    pub fn new(
        buckets: Arc<dyn BucketStore>,
        store: Arc<dyn EventStore>,
        fill_queue: FillQueue,
        config: CacheConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            buckets,
            store,
            fill_queue,
            config,
            metrics,
        }
    }

    /// Answers the window from buckets where possible.
    ///
    /// Returns `Ok(Some(events))` on a full or partial hit (globally
    /// ordered, deduplicated), `Ok(None)` on a complete miss or when the
    /// window decomposes into more than `max_months_per_query` months.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Cache`] on bucket transport/decode
    /// failure and [`MarketplaceError::Store`] if the partial-hit durable
    /// read fails. Callers fall back to the durable store without a
    /// write-back.
    pub async fn query(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Option<Vec<Event>>, MarketplaceError> {
        let months = BucketMonth::span(from, to);
        if months.len() > self.config.max_months_per_query {
            tracing::debug!(
                months = months.len(),
                max = self.config.max_months_per_query,
                "window spans too many months, bypassing the bucket cache"
            );
            return Ok(None);
        }

        let mut cached_events: Vec<Event> = Vec::new();
        let mut cached_months: usize = 0;
        let mut missed_months: Vec<BucketMonth> = Vec::new();

        for month in &months {
            match self.buckets.get(*month).await {
                Ok(Some(events)) => {
                    self.metrics.record_cache_hit();
                    cached_months += 1;
                    cached_events.extend(events);
                }
                Ok(None) => {
                    self.metrics.record_cache_miss();
                    missed_months.push(*month);
                }
                Err(error) => {
                    self.metrics.record_cache_error();
                    return Err(error);
                }
            }
        }

        if missed_months.is_empty() {
            let result = finalize(cached_events, from, to);
            tracing::debug!(events = result.len(), months = months.len(), "full bucket hit");
            return Ok(Some(result));
        }

        if cached_months == 0 {
            return Ok(None);
        }

        // Partial hit: one durable read over the whole window, narrowed to
        // events starting in a missed month — cached months stay
        // authoritative for everything that starts inside them.
        let durable = self.store.find_overlapping(from, to).await?;
        let missed_set: HashSet<BucketMonth> = missed_months.iter().copied().collect();
        cached_events.extend(
            durable
                .into_iter()
                .filter(|event| missed_set.contains(&BucketMonth::from_date(event.start_date))),
        );

        let result = finalize(cached_events, from, to);

        for month in &missed_months {
            self.fill_queue.enqueue(FillJob::Refresh { month: *month });
        }

        tracing::debug!(
            events = result.len(),
            cached = cached_months,
            missed = missed_months.len(),
            "partial bucket hit"
        );
        Ok(Some(result))
    }

    /// Backfills the window's months after a composer-level miss. Months
    /// fully covered by `[from, to]` are snapshotted from `events` (the
    /// window read saw everything intersecting them); edge months are
    /// re-read from the durable store so a present bucket is never a
    /// partial snapshot. Enqueue-only — the caller never waits.
    pub fn fill(&self, from: NaiveDateTime, to: NaiveDateTime, events: &[Event]) {
        for month in BucketMonth::span(from, to) {
            if from <= month.first_moment() && month.last_moment() <= to {
                let snapshot: Vec<Event> = events
                    .iter()
                    .filter(|event| touches_month(event, month))
                    .cloned()
                    .collect();
                self.fill_queue.enqueue(FillJob::Snapshot {
                    month,
                    events: snapshot,
                });
            } else {
                self.fill_queue.enqueue(FillJob::Refresh { month });
            }
        }
    }

    /// Deletes every bucket whose month is touched by any of the events'
    /// `[start_date, end_date]` intervals. Returns the number of buckets
    /// that existed and were removed.
    ///
    /// # Errors
    ///
    /// Returns the first delete failure after attempting every affected
    /// month; callers log it and continue (the durable write must not be
    /// blocked by cache trouble).
    pub async fn invalidate(&self, events: &[Event]) -> Result<u64, MarketplaceError> {
        let mut affected: BTreeSet<BucketMonth> = BTreeSet::new();
        for event in events {
            affected.extend(BucketMonth::touched_by(event));
        }

        let mut deleted: u64 = 0;
        let mut first_error = None;
        for month in affected {
            match self.buckets.delete(month).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(%month, %error, "bucket invalidation failed");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        self.metrics.record_invalidations(deleted);
        tracing::debug!(deleted, events = events.len(), "invalidated monthly buckets");

        match first_error {
            Some(error) => Err(error),
            None => Ok(deleted),
        }
    }
}

/// Whether the event's `[start_date, end_date]` interval touches the month.
fn touches_month(event: &Event, month: BucketMonth) -> bool {
    BucketMonth::from_date(event.start_date) <= month
        && month <= BucketMonth::from_date(event.end_date)
}

/// Overlap-filters, deduplicates by id, and sorts into the global result
/// order.
fn finalize(events: Vec<Event>, from: NaiveDateTime, to: NaiveDateTime) -> Vec<Event> {
    let mut seen = HashSet::new();
    let mut result: Vec<Event> = events
        .into_iter()
        .filter(|event| event.overlaps(from, to))
        .filter(|event| seen.insert(event.id))
        .collect();
    result.sort_by_key(Event::chronological_key);
    result
}

/// TTL for a bucket written now, by month age: the current month changes
/// often and expires fast, deep-past months barely change and live long.
pub(crate) fn ttl_for_month(month: BucketMonth, today: NaiveDate, config: &CacheConfig) -> Duration {
    if !config.enable_tiered_ttl {
        return Duration::from_secs(config.ttl_hours * SECS_PER_HOUR);
    }

    let months_ago = month.months_until(BucketMonth::from_date(today));
    let hours = if months_ago == 0 {
        config.current_month_ttl_hours
    } else if months_ago <= 3 {
        config.ttl_hours
    } else {
        config.long_term_ttl_hours
    };
    Duration::from_secs(hours * SECS_PER_HOUR)
}
