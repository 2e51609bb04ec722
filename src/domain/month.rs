//! Calendar-month keys for the bucket cache.
//!
//! A [`BucketMonth`] identifies one calendar month; it is the key space of
//! the bucket store and the unit of cache invalidation. Month decomposition
//! of a query window is the inclusive sequence from the month of `from` to
//! the month of `to`.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::Event;

/// A calendar month (year + month), the bucket cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketMonth {
    year: i32,
    /// 1-based month, always in `1..=12`.
    month: u32,
}

impl BucketMonth {
    /// Creates a month from its components. Returns `None` unless
    /// `month` is in `1..=12`.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing the given date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month containing the given civil timestamp.
    #[must_use]
    pub fn from_datetime(ts: NaiveDateTime) -> Self {
        Self::from_date(ts.date())
    }

    /// First day of the month (the canonical bucket key date).
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        // month is 1..=12 by construction, day 1 always exists
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    /// First instant of the month, `00:00:00` on the first day.
    #[must_use]
    pub fn first_moment(&self) -> NaiveDateTime {
        self.first_day().and_time(NaiveTime::MIN)
    }

    /// Last instant of the month at second resolution, `23:59:59` on the
    /// last day.
    #[must_use]
    pub fn last_moment(&self) -> NaiveDateTime {
        let last_day = self.succ().first_day().pred_opt().unwrap_or(NaiveDate::MAX);
        last_day.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
    }

    /// The following calendar month.
    #[must_use]
    pub const fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Signed number of whole calendar months from `self` to `other`
    /// (positive when `other` is later).
    #[must_use]
    pub const fn months_until(&self, other: Self) -> i64 {
        (other.year as i64 - self.year as i64) * 12 + (other.month as i64 - self.month as i64)
    }

    /// Inclusive month decomposition of the window `[from, to]`.
    ///
    /// Callers guarantee `from <= to`; an inverted window yields an empty
    /// sequence.
    #[must_use]
    pub fn span(from: NaiveDateTime, to: NaiveDateTime) -> Vec<Self> {
        let last = Self::from_datetime(to);
        let mut current = Self::from_datetime(from);
        let mut months = Vec::new();
        while current <= last {
            months.push(current);
            current = current.succ();
        }
        months
    }

    /// Every month the event's `[start_date, end_date]` interval touches.
    /// An event spanning months belongs to all of them.
    #[must_use]
    pub fn touched_by(event: &Event) -> Vec<Self> {
        let last = Self::from_date(event.end_date);
        let mut current = Self::from_date(event.start_date);
        let mut months = Vec::new();
        while current <= last {
            months.push(current);
            current = current.succ();
        }
        months
    }
}

impl fmt::Display for BucketMonth {
    /// Renders as `YYYY-MM`, the wire form used in bucket keys.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::event::tests::{make_event, ts};

    fn month(year: i32, month: u32) -> BucketMonth {
        let Some(m) = BucketMonth::new(year, month) else {
            panic!("bad month in test");
        };
        m
    }

    #[test]
    fn new_rejects_out_of_range_months() {
        assert!(BucketMonth::new(2024, 0).is_none());
        assert!(BucketMonth::new(2024, 13).is_none());
        assert!(BucketMonth::new(2024, 12).is_some());
    }

    #[test]
    fn span_within_one_month() {
        let months = BucketMonth::span(ts("2024-12-01T10:00:00"), ts("2024-12-31T23:59:00"));
        assert_eq!(months, vec![month(2024, 12)]);
    }

    #[test]
    fn span_is_inclusive_and_crosses_years() {
        let months = BucketMonth::span(ts("2024-11-15T00:00:00"), ts("2025-01-10T00:00:00"));
        assert_eq!(months, vec![month(2024, 11), month(2024, 12), month(2025, 1)]);
    }

    #[test]
    fn span_of_inverted_window_is_empty() {
        let months = BucketMonth::span(ts("2025-01-01T00:00:00"), ts("2024-12-01T00:00:00"));
        assert!(months.is_empty());
    }

    #[test]
    fn touched_by_covers_every_spanned_month() {
        let event = make_event("long", "2024-11-20T10:00:00", "2025-01-05T22:00:00");
        let months = BucketMonth::touched_by(&event);
        assert_eq!(months, vec![month(2024, 11), month(2024, 12), month(2025, 1)]);
    }

    #[test]
    fn months_until_is_signed() {
        assert_eq!(month(2024, 10).months_until(month(2025, 1)), 3);
        assert_eq!(month(2025, 1).months_until(month(2024, 10)), -3);
        assert_eq!(month(2024, 12).months_until(month(2024, 12)), 0);
    }

    #[test]
    fn first_and_last_moments_bound_the_month() {
        let december = month(2024, 12);
        assert_eq!(december.first_moment(), ts("2024-12-01T00:00:00"));
        assert_eq!(december.last_moment(), ts("2024-12-31T23:59:59"));
        // Leap February
        assert_eq!(month(2024, 2).last_moment(), ts("2024-02-29T23:59:59"));
    }

    #[test]
    fn display_is_year_dash_month() {
        assert_eq!(month(2024, 3).to_string(), "2024-03");
        assert_eq!(month(2025, 12).to_string(), "2025-12");
    }
}
