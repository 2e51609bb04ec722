//! `GET /search` — time-range event search.

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDateTime;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::dto::SearchResponse;
use crate::app_state::AppState;
use crate::error::MarketplaceError;

const PARAM_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Query parameters of `GET /search`. Kept as raw strings so parse
/// failures produce the contract's empty-envelope 400 instead of the
/// extractor's default rejection.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Window start, ISO local date-time (`2024-12-01T10:00:00`).
    pub starts_at: Option<String>,
    /// Window end, ISO local date-time.
    pub ends_at: Option<String>,
}

/// `GET /search` — every online event overlapping the window.
///
/// # Errors
///
/// `400` with the empty envelope on missing/unparseable parameters or an
/// inverted window; `500` with the empty envelope when the durable store
/// is unreachable.
#[utoipa::path(
    get,
    path = "/search",
    tag = "Search",
    summary = "Search events by time window",
    description = "Returns every online event whose lifespan overlaps [starts_at, ends_at], ordered by start date and time.",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching events", body = SearchResponse),
        (status = 400, description = "Invalid parameters; body is the empty envelope", body = SearchResponse),
        (status = 500, description = "Durable store unavailable; body is the empty envelope", body = SearchResponse),
    )
)]
pub async fn search_events(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, MarketplaceError> {
    let starts_at = parse_param("starts_at", params.starts_at.as_deref())?;
    let ends_at = parse_param("ends_at", params.ends_at.as_deref())?;

    tracing::info!(%starts_at, %ends_at, "searching events");
    let events = state.search.search(starts_at, ends_at).await?;
    tracing::info!(found = events.len(), "search completed");

    Ok(Json(SearchResponse::from_events(&events)))
}

fn parse_param(name: &str, raw: Option<&str>) -> Result<NaiveDateTime, MarketplaceError> {
    let Some(raw) = raw else {
        return Err(MarketplaceError::InvalidParams(format!("{name} is required")));
    };
    NaiveDateTime::parse_from_str(raw, PARAM_DATE_FORMAT)
        .map_err(|e| MarketplaceError::InvalidParams(format!("{name}: {e}")))
}
