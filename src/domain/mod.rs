//! Domain layer: the event model, its identity and content hash, and
//! calendar-month arithmetic.
//!
//! Everything here is plain data with no I/O. Timestamps are naive civil
//! date-times (no timezone); comparisons are lexicographic.

pub mod event;
pub mod month;

pub use event::{Event, EventId};
pub use month::BucketMonth;
