//! System endpoints: health check and operational statistics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::{BreakerReport, StatsResponse};
use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /stats` — Cache, sync, and breaker statistics.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "System",
    summary = "Operational statistics",
    description = "Returns cache counters, the live bucket count, upstream breaker state, and last-sync metadata.",
    responses(
        (status = 200, description = "Current statistics", body = StatsResponse),
    )
)]
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let active_buckets = match state.buckets.count().await {
        Ok(count) => count,
        Err(error) => {
            tracing::warn!(%error, "failed to count live buckets");
            0
        }
    };
    let sync = match &state.sync_metadata {
        Some(metadata) => Some(metadata.report().await),
        None => None,
    };

    Json(StatsResponse {
        metrics: state.metrics.snapshot(),
        active_buckets,
        breaker: BreakerReport {
            state: state.provider.breaker_state(),
            transitions: state.provider.breaker_transitions(),
        },
        sync,
    })
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
}
