//! HTTP layer: route handlers, DTOs, and router composition.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI documentation for the marketplace REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "fever-marketplace",
        version = "0.1.0",
        description = "Online-event marketplace read service: time-range search over a month-bucket cache and durable store.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Search", description = "Time-range event search"),
        (name = "System", description = "Health check and service statistics"),
    ),
    paths(
        handlers::search::search_events,
        handlers::system::health_handler,
        handlers::system::stats_handler,
    ),
    components(schemas(
        dto::SearchResponse,
        dto::EventData,
        dto::EventDto,
        dto::StatsResponse,
        dto::BreakerReport,
        crate::cache::SyncMetadata,
        crate::metrics::MetricsSnapshot,
        crate::metrics::LatencySnapshot,
        crate::metrics::LatencyBucket,
        crate::provider::CircuitState,
    ))
)]
#[derive(Debug)]
pub struct ApiDoc;

/// Builds the complete router: the search endpoint plus system routes.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes())
}
