//! Central error type with HTTP status mapping.
//!
//! [`MarketplaceError`] is the single error enum for the service. Downstream
//! failures (cache, provider, decode, breaker) are contained before they
//! reach a handler; only validation errors and durable-store failures map to
//! client-visible statuses. Per the search contract, error bodies are the
//! empty envelope `{"data":{"events":[]}}` — never a structured error
//! object.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;

use crate::api::dto::SearchResponse;

/// Service-wide error enum.
#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    /// The requested window is inverted (`starts_at` after `ends_at`).
    #[error("invalid range: starts_at {starts_at} is after ends_at {ends_at}")]
    InvalidRange {
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    },

    /// Missing or unparseable request parameters.
    #[error("invalid search parameters: {0}")]
    InvalidParams(String),

    /// Durable store transport failure.
    #[error("durable store error: {0}")]
    Store(String),

    /// Bucket store transport or snapshot-decode failure.
    #[error("bucket store error: {0}")]
    Cache(String),

    /// Upstream provider transport failure.
    #[error("provider transport error: {0}")]
    Provider(String),

    /// Upstream provider answered with a non-success status.
    #[error("provider returned status {0}")]
    ProviderStatus(u16),

    /// The provider catalog could not be decoded.
    #[error("catalog decode error: {0}")]
    Decode(String),

    /// The named circuit breaker is open and the call was not attempted.
    #[error("circuit breaker open for {0}")]
    CircuitOpen(&'static str),
}

impl MarketplaceError {
    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRange { .. } | Self::InvalidParams(_) => StatusCode::BAD_REQUEST,
            Self::Store(_)
            | Self::Cache(_)
            | Self::Provider(_)
            | Self::ProviderStatus(_)
            | Self::Decode(_)
            | Self::CircuitOpen(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether a provider-path failure is worth another attempt: transport
    /// errors, 5xx answers, and undecodable catalogs are transient; anything
    /// else is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(_) | Self::Decode(_) => true,
            Self::ProviderStatus(status) => *status >= 500,
            _ => false,
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = axum::Json(SearchResponse::empty()).into_response();
        *response.status_mut() = status;
        response
    }
}
