//! Search response envelope.
//!
//! Every `/search` answer — success or error — carries the same envelope
//! `{"data":{"events":[…]}}`. Dates render as `YYYY-MM-DD`, times as
//! `HH:MM:SS`, prices as decimal strings with exactly two fractional
//! digits.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Event;

/// Top-level `/search` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub data: EventData,
}

/// Inner payload of the envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventData {
    pub events: Vec<EventDto>,
}

/// One event on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EventDto {
    /// Canonical UUID string.
    pub id: String,
    pub title: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `HH:MM:SS`.
    pub start_time: String,
    /// `YYYY-MM-DD`.
    pub end_date: String,
    /// `HH:MM:SS`.
    pub end_time: String,
    /// Decimal with two fractional digits, e.g. `"25.00"`.
    pub min_price: String,
    /// Decimal with two fractional digits, e.g. `"100.00"`.
    pub max_price: String,
}

impl SearchResponse {
    /// Wraps domain events in the response envelope.
    #[must_use]
    pub fn from_events(events: &[Event]) -> Self {
        Self {
            data: EventData {
                events: events.iter().map(EventDto::from_event).collect(),
            },
        }
    }

    /// The empty envelope used for error responses and empty results.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            data: EventData { events: Vec::new() },
        }
    }
}

impl EventDto {
    /// Renders a domain event in wire formats.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        Self {
            id: event.id.to_string(),
            title: event.title.clone(),
            start_date: event.start_date.format("%Y-%m-%d").to_string(),
            start_time: event.start_time.format("%H:%M:%S").to_string(),
            end_date: event.end_date.format("%Y-%m-%d").to_string(),
            end_time: event.end_time.format("%H:%M:%S").to_string(),
            min_price: render_price(&event.min_price),
            max_price: render_price(&event.max_price),
        }
    }
}

/// Renders a price with exactly two fractional digits.
fn render_price(price: &BigDecimal) -> String {
    price.with_scale(2).to_string()
}
