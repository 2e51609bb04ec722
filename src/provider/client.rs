//! HTTP client for the upstream event catalog.
//!
//! One public operation, [`ProviderClient::fetch_online_events`], layered
//! outer-to-inner as: wall-clock timeout over the whole call, retry with
//! exponential backoff, circuit breaker around each attempt. Transport
//! errors, 5xx answers, and undecodable documents are retried; a tripped
//! breaker fails fast. Every terminal failure degrades to an empty list —
//! at this layer a broken upstream and an empty upstream look identical,
//! and the sync pipeline treats them the same.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::breaker::CircuitBreaker;
use super::{mapper, xml, CircuitState, EventProvider};
use crate::config::ProviderConfig;
use crate::domain::Event;
use crate::error::MarketplaceError;
use crate::metrics::Metrics;

/// Resilient client for `<base_url>/api/events`.
pub struct ProviderClient {
    http: reqwest::Client,
    endpoint: String,
    config: ProviderConfig,
    breaker: CircuitBreaker,
    metrics: Arc<Metrics>,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    /// Builds the client and its breaker from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Provider`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: ProviderConfig, metrics: Arc<Metrics>) -> Result<Self, MarketplaceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketplaceError::Provider(e.to_string()))?;
        let endpoint = format!("{}/api/events", config.base_url.trim_end_matches('/'));
        let breaker = CircuitBreaker::new("external-provider", config.breaker.clone());

        Ok(Self {
            http,
            endpoint,
            config,
            breaker,
            metrics,
        })
    }

    /// Current breaker state, for health reporting.
    #[must_use]
    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Breaker state transitions since startup.
    #[must_use]
    pub fn breaker_transitions(&self) -> u64 {
        self.breaker.transitions()
    }

    async fn fetch_with_retry(&self) -> Result<Vec<Event>, MarketplaceError> {
        let retry = &self.config.retry;
        let mut wait = retry.initial_wait;
        let mut attempt: u32 = 1;

        loop {
            if !self.breaker.try_acquire() {
                return Err(MarketplaceError::CircuitOpen("external-provider"));
            }
            match self.fetch_once().await {
                Ok(events) => {
                    self.breaker.record_success();
                    return Ok(events);
                }
                Err(error) => {
                    self.breaker.record_failure();
                    if attempt >= retry.max_attempts.max(1) || !error.is_retryable() {
                        return Err(error);
                    }
                    tracing::debug!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        %error,
                        "provider fetch failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    wait = wait.mul_f64(retry.multiplier);
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<Vec<Event>, MarketplaceError> {
        let started = Instant::now();
        let outcome = self.request_catalog().await;
        self.metrics.record_upstream_latency(started.elapsed());

        let body = outcome?;
        let catalog = xml::decode_catalog(&body)?;
        Ok(mapper::map_online_events(&catalog))
    }

    async fn request_catalog(&self) -> Result<String, MarketplaceError> {
        let response = self
            .http
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| MarketplaceError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketplaceError::ProviderStatus(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| MarketplaceError::Provider(e.to_string()))
    }
}

#[async_trait]
impl EventProvider for ProviderClient {
    async fn fetch_online_events(&self) -> Vec<Event> {
        match tokio::time::timeout(self.config.timeout, self.fetch_with_retry()).await {
            Ok(Ok(events)) => {
                tracing::debug!(events = events.len(), "provider catalog fetched");
                events
            }
            Ok(Err(MarketplaceError::CircuitOpen(component))) => {
                tracing::warn!(component, "provider circuit open, returning empty catalog");
                Vec::new()
            }
            Ok(Err(error)) => {
                tracing::warn!(%error, "provider fetch failed, returning empty catalog");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    budget_ms = self.config.timeout.as_millis() as u64,
                    "provider fetch exceeded its budget, returning empty catalog"
                );
                Vec::new()
            }
        }
    }
}
