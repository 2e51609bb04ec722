//! Row types for the `events` table.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{Event, EventId};

/// A row from the `events` table, column-for-column.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
    pub min_price: BigDecimal,
    pub max_price: BigDecimal,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            start_date: row.start_date,
            start_time: row.start_time,
            end_date: row.end_date,
            end_time: row.end_time,
            min_price: row.min_price,
            max_price: row.max_price,
        }
    }
}
