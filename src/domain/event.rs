//! The marketplace event record and its business-key hash.
//!
//! [`EventId`] is a newtype wrapper around [`uuid::Uuid`] (v4) providing
//! type safety so that event identifiers cannot be confused with other UUIDs.
//!
//! [`Event::content_hash`] is the dedup key for ingestion: two events with
//! the same title and start/end date-times are the same business event no
//! matter which sync produced them. Prices and the generated id are
//! deliberately excluded so a price change updates the existing row instead
//! of creating a new one.

use std::fmt;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Separator between hash input fields. ASCII unit separator — a control
/// character that cannot appear in a title, so field boundaries are
/// unambiguous.
const HASH_FIELD_SEP: char = '\u{1f}';

/// Unique identifier for a marketplace event.
///
/// Wraps a UUID v4. Generated once when the mapper first produces the event;
/// the durable store preserves the id of the first insert and ignores the
/// fresh id on a hash conflict.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(transparent)]
pub struct EventId(uuid::Uuid);

impl EventId {
    /// Creates a new random `EventId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates an `EventId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for EventId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<EventId> for uuid::Uuid {
    fn from(id: EventId) -> Self {
        id.0
    }
}

/// An online marketplace event.
///
/// Immutable value once created. The lifespan is the closed interval
/// `[start_ts, end_ts]` in naive civil time; the mapper guarantees
/// `start_ts <= end_ts` and `0 <= min_price <= max_price` before an event
/// enters the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
    pub min_price: BigDecimal,
    pub max_price: BigDecimal,
}

impl Event {
    /// Civil timestamp at which the event starts.
    #[must_use]
    pub fn start_ts(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }

    /// Civil timestamp at which the event ends.
    #[must_use]
    pub fn end_ts(&self) -> NaiveDateTime {
        self.end_date.and_time(self.end_time)
    }

    /// Closed-interval overlap with the window `[from, to]`.
    #[must_use]
    pub fn overlaps(&self, from: NaiveDateTime, to: NaiveDateTime) -> bool {
        self.start_ts() <= to && self.end_ts() >= from
    }

    /// Sort key for query results: chronological by start, ties broken by id
    /// so ordering is deterministic across calls.
    #[must_use]
    pub fn chronological_key(&self) -> (NaiveDate, NaiveTime, EventId) {
        (self.start_date, self.start_time, self.id)
    }

    /// Stable business-key digest of the hash-forming fields.
    ///
    /// SHA-256 over `title`, `start_date`, `start_time`, `end_date`,
    /// `end_time` (in that order, `\u{1F}`-separated, dates as `%Y-%m-%d`,
    /// times as `%H:%M:%S`), rendered as lowercase hex. Identical across
    /// processes and platforms. The id and prices are not part of the hash.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let canonical = format!(
            "{title}{sep}{sd}{sep}{st}{sep}{ed}{sep}{et}",
            title = self.title,
            sep = HASH_FIELD_SEP,
            sd = self.start_date.format("%Y-%m-%d"),
            st = self.start_time.format("%H:%M:%S"),
            ed = self.end_date.format("%Y-%m-%d"),
            et = self.end_time.format("%H:%M:%S"),
        );
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use std::str::FromStr;

    use super::*;

    /// Parses a `"YYYY-MM-DDTHH:MM:SS"` literal. Shared by cache and
    /// service tests.
    pub(crate) fn ts(s: &str) -> NaiveDateTime {
        let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") else {
            panic!("bad timestamp literal in test");
        };
        t
    }

    /// Builds an event with the given title and start/end timestamps
    /// (`"YYYY-MM-DDTHH:MM:SS"`). Shared by cache and service tests.
    pub(crate) fn make_event(title: &str, start: &str, end: &str) -> Event {
        let start = ts(start);
        let end = ts(end);
        Event {
            id: EventId::new(),
            title: title.to_owned(),
            start_date: start.date(),
            start_time: start.time(),
            end_date: end.date(),
            end_time: end.time(),
            min_price: BigDecimal::from(25),
            max_price: BigDecimal::from(100),
        }
    }

    #[test]
    fn hash_is_deterministic_across_instances() {
        let a = make_event("ConcertMadrid", "2024-12-15T20:00:00", "2024-12-15T23:00:00");
        let mut b = a.clone();
        b.id = EventId::new();
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn hash_ignores_id_and_prices() {
        let a = make_event("ConcertMadrid", "2024-12-15T20:00:00", "2024-12-15T23:00:00");
        let mut b = a.clone();
        b.id = EventId::new();
        let Ok(price) = BigDecimal::from_str("30.50") else {
            panic!("bad decimal in test");
        };
        b.min_price = price;
        b.max_price = BigDecimal::from(999);
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn hash_changes_with_title_and_times() {
        let base = make_event("ConcertMadrid", "2024-12-15T20:00:00", "2024-12-15T23:00:00");
        let renamed = make_event("TheaterShow", "2024-12-15T20:00:00", "2024-12-15T23:00:00");
        let moved = make_event("ConcertMadrid", "2024-12-15T21:00:00", "2024-12-15T23:00:00");
        assert_ne!(base.content_hash(), renamed.content_hash());
        assert_ne!(base.content_hash(), moved.content_hash());
    }

    #[test]
    fn hash_separator_prevents_boundary_ambiguity() {
        // Without a separator "ab" + "2024-..." and "a" + "b2024-..." could
        // collide; the unit separator keeps field boundaries distinct.
        let a = make_event("Show 2024", "2024-12-15T20:00:00", "2024-12-15T23:00:00");
        let b = make_event("Show", "2024-12-15T20:00:00", "2024-12-15T23:00:00");
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn overlap_is_closed_interval() {
        let event = make_event("E", "2024-12-15T20:00:00", "2024-12-15T23:00:00");
        // Window ending exactly at the event start still matches.
        assert!(event.overlaps(ts("2024-12-01T00:00:00"), ts("2024-12-15T20:00:00")));
        // Window starting exactly at the event end still matches.
        assert!(event.overlaps(ts("2024-12-15T23:00:00"), ts("2024-12-31T00:00:00")));
        // Fully before / fully after do not.
        assert!(!event.overlaps(ts("2024-12-01T00:00:00"), ts("2024-12-15T19:59:59")));
        assert!(!event.overlaps(ts("2024-12-15T23:00:01"), ts("2024-12-31T00:00:00")));
    }

    #[test]
    fn chronological_key_orders_by_start_then_id() {
        let mut events = vec![
            make_event("late", "2024-12-15T22:00:00", "2024-12-15T23:00:00"),
            make_event("early", "2024-12-15T20:00:00", "2024-12-15T21:00:00"),
            make_event("next-day", "2024-12-16T19:00:00", "2024-12-16T20:00:00"),
        ];
        events.sort_by_key(Event::chronological_key);
        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "late", "next-day"]);
    }

    #[test]
    fn event_id_serde_round_trip() {
        let id = EventId::new();
        let json = serde_json::to_string(&id).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        let Ok(back) = serde_json::from_str::<EventId>(&json) else {
            panic!("deserialization failed");
        };
        assert_eq!(id, back);
    }
}
