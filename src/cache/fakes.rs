//! In-memory fakes of the store traits for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::BucketStore;
use crate::domain::{BucketMonth, Event};
use crate::error::MarketplaceError;
use crate::persistence::{EventStore, UpsertOutcome};

/// Shared chronological call journal, for tests asserting cross-component
/// ordering (e.g. invalidation-before-upsert).
pub(crate) type CallJournal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Option<CallJournal>, entry: String) {
    if let Some(journal) = journal {
        if let Ok(mut entries) = journal.lock() {
            entries.push(entry);
        }
    }
}

/// In-memory [`BucketStore`] with failure injection and call counters.
#[derive(Default)]
pub(crate) struct MemoryBucketStore {
    buckets: Mutex<HashMap<BucketMonth, (Vec<Event>, Duration)>>,
    fail: AtomicBool,
    get_calls: AtomicU64,
    put_calls: AtomicU64,
    delete_calls: AtomicU64,
    journal: Option<CallJournal>,
}

impl MemoryBucketStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Pre-populates a month snapshot (zero TTL marker).
    pub(crate) fn seed(&self, month: BucketMonth, events: Vec<Event>) {
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets.insert(month, (events, Duration::ZERO));
        }
    }

    /// Every subsequent operation fails with a cache error.
    pub(crate) fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn contents(&self, month: BucketMonth) -> Option<Vec<Event>> {
        self.buckets
            .lock()
            .ok()
            .and_then(|buckets| buckets.get(&month).map(|(events, _)| events.clone()))
    }

    pub(crate) fn ttl_of(&self, month: BucketMonth) -> Option<Duration> {
        self.buckets
            .lock()
            .ok()
            .and_then(|buckets| buckets.get(&month).map(|(_, ttl)| *ttl))
    }

    pub(crate) fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn put_calls(&self) -> u64 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_calls(&self) -> u64 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: &str) -> Result<(), MarketplaceError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(MarketplaceError::Cache(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn get(&self, month: BucketMonth) -> Result<Option<Vec<Event>>, MarketplaceError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        record(&self.journal, format!("bucket.get {month}"));
        self.check("get")?;
        Ok(self.contents(month))
    }

    async fn put(
        &self,
        month: BucketMonth,
        events: &[Event],
        ttl: Duration,
    ) -> Result<(), MarketplaceError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        record(&self.journal, format!("bucket.put {month}"));
        self.check("put")?;
        if let Ok(mut buckets) = self.buckets.lock() {
            buckets.insert(month, (events.to_vec(), ttl));
        }
        Ok(())
    }

    async fn delete(&self, month: BucketMonth) -> Result<bool, MarketplaceError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        record(&self.journal, format!("bucket.delete {month}"));
        self.check("delete")?;
        let existed = self
            .buckets
            .lock()
            .ok()
            .is_some_and(|mut buckets| buckets.remove(&month).is_some());
        Ok(existed)
    }

    async fn count(&self) -> Result<u64, MarketplaceError> {
        self.check("count")?;
        let count = self.buckets.lock().map(|buckets| buckets.len()).unwrap_or(0);
        Ok(count as u64)
    }
}

/// In-memory [`EventStore`] with failure injection and call counters.
/// Upserts follow the hash semantics: a re-seen hash overwrites mutable
/// fields and keeps the original id.
#[derive(Default)]
pub(crate) struct MemoryEventStore {
    events: Mutex<Vec<Event>>,
    fail_find: AtomicBool,
    fail_upsert: AtomicBool,
    find_calls: AtomicU64,
    upsert_calls: AtomicU64,
    journal: Option<CallJournal>,
}

impl MemoryEventStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_journal(journal: CallJournal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    pub(crate) fn seed(&self, events: Vec<Event>) {
        if let Ok(mut stored) = self.events.lock() {
            stored.extend(events);
        }
    }

    pub(crate) fn fail_finds(&self) {
        self.fail_find.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_upserts(&self) {
        self.fail_upsert.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stored(&self) -> Vec<Event> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub(crate) fn find_calls(&self) -> u64 {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn upsert_calls(&self) -> u64 {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn find_overlapping(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Event>, MarketplaceError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        record(&self.journal, "store.find".to_owned());
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(MarketplaceError::Store("injected find failure".to_owned()));
        }
        let mut result: Vec<Event> = self
            .events
            .lock()
            .map(|events| {
                events
                    .iter()
                    .filter(|event| event.overlaps(from, to))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        result.sort_by_key(Event::chronological_key);
        Ok(result)
    }

    async fn upsert_batch(&self, events: &[Event]) -> Result<UpsertOutcome, MarketplaceError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        record(&self.journal, "store.upsert".to_owned());
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(MarketplaceError::Store("injected upsert failure".to_owned()));
        }
        let mut outcome = UpsertOutcome::default();
        if let Ok(mut stored) = self.events.lock() {
            for event in events {
                let hash = event.content_hash();
                if let Some(existing) = stored.iter_mut().find(|e| e.content_hash() == hash) {
                    existing.title = event.title.clone();
                    existing.min_price = event.min_price.clone();
                    existing.max_price = event.max_price.clone();
                    outcome.updated += 1;
                } else {
                    stored.push(event.clone());
                    outcome.inserted += 1;
                }
            }
        }
        Ok(outcome)
    }
}
