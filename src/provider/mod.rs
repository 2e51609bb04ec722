//! Upstream provider: typed XML catalog fetch with timeout, retry, and a
//! circuit breaker, plus the XML-to-domain mapper.

pub mod breaker;
pub mod client;
pub mod mapper;
pub mod xml;

use async_trait::async_trait;

use crate::domain::Event;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitState};
pub use client::ProviderClient;

/// Source of online events.
///
/// An empty result is a legitimate steady state — an upstream with nothing
/// for sale and a tripped breaker look the same here, and the sync pipeline
/// treats them the same.
#[async_trait]
pub trait EventProvider: Send + Sync {
    /// Fetches, decodes, and maps the upstream catalog to online events.
    async fn fetch_online_events(&self) -> Vec<Event>;
}
