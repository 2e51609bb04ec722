//! Maps the decoded XML catalog to domain events.
//!
//! Only base plans with `sell_mode == "online"` are considered; each of
//! their plans becomes one event. Data-quality problems (missing title,
//! unparseable dates, inverted intervals, malformed zone numbers) drop the
//! affected record with a warning and never abort the batch.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;

use super::xml::{Plan, PlanList, Zone};
use crate::domain::{Event, EventId};

const PLAN_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Produces one event per plan of every online base plan, dropping
/// records that fail validation.
#[must_use]
pub fn map_online_events(catalog: &PlanList) -> Vec<Event> {
    let Some(output) = &catalog.output else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for base_plan in &output.base_plans {
        if base_plan.sell_mode.as_deref() != Some("online") {
            continue;
        }
        let title = match base_plan.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => {
                tracing::warn!("dropping online base plan without a title");
                continue;
            }
        };
        for plan in &base_plan.plans {
            if let Some(event) = map_plan(title, plan) {
                events.push(event);
            }
        }
    }
    events
}

fn map_plan(title: &str, plan: &Plan) -> Option<Event> {
    let start = parse_plan_date(title, "plan_start_date", plan.plan_start_date.as_deref())?;
    let end = parse_plan_date(title, "plan_end_date", plan.plan_end_date.as_deref())?;
    if start > end {
        tracing::warn!(title, %start, %end, "dropping plan with inverted interval");
        return None;
    }

    let (min_price, max_price) = price_range(title, &plan.zones);

    Some(Event {
        id: EventId::new(),
        title: title.to_owned(),
        start_date: start.date(),
        start_time: start.time(),
        end_date: end.date(),
        end_time: end.time(),
        min_price,
        max_price,
    })
}

fn parse_plan_date(title: &str, field: &str, raw: Option<&str>) -> Option<NaiveDateTime> {
    let Some(raw) = raw else {
        tracing::warn!(title, field, "dropping plan with missing date");
        return None;
    };
    match NaiveDateTime::parse_from_str(raw, PLAN_DATE_FORMAT) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            tracing::warn!(title, field, raw, %error, "dropping plan with unparseable date");
            None
        }
    }
}

/// Min/max price over zones with remaining capacity; `(0, 0)` when no zone
/// qualifies. A zone with malformed numbers is skipped, not fatal.
fn price_range(title: &str, zones: &[Zone]) -> (BigDecimal, BigDecimal) {
    let mut min_price: Option<BigDecimal> = None;
    let mut max_price: Option<BigDecimal> = None;

    for zone in zones {
        let capacity: u64 = match zone.capacity.as_deref().map(str::parse) {
            Some(Ok(capacity)) => capacity,
            _ => {
                tracing::warn!(title, "skipping zone with missing or malformed capacity");
                continue;
            }
        };
        if capacity == 0 {
            continue;
        }
        let price = match zone.price.as_deref().map(BigDecimal::from_str) {
            Some(Ok(price)) if price >= BigDecimal::from(0) => price,
            _ => {
                tracing::warn!(title, "skipping zone with missing or malformed price");
                continue;
            }
        };

        min_price = Some(match min_price {
            Some(current) => current.min(price.clone()),
            None => price.clone(),
        });
        max_price = Some(match max_price {
            Some(current) => current.max(price),
            None => price,
        });
    }

    (
        min_price.unwrap_or_else(|| BigDecimal::from(0)),
        max_price.unwrap_or_else(|| BigDecimal::from(0)),
    )
}
