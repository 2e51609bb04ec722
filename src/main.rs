//! fever-marketplace server entry point.
//!
//! Wires the stores, cache, provider client, sync scheduler, and the Axum
//! HTTP server.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use fever_marketplace::api;
use fever_marketplace::app_state::AppState;
use fever_marketplace::cache::{
    connect_redis, spawn_fill_worker, BucketStore, MonthlyBucketCache, RedisBucketStore,
    RedisSyncMetadataStore,
};
use fever_marketplace::config::MarketplaceConfig;
use fever_marketplace::metrics::Metrics;
use fever_marketplace::persistence::{EventStore, PostgresEventStore};
use fever_marketplace::provider::{EventProvider, ProviderClient};
use fever_marketplace::scheduler::run_scheduler;
use fever_marketplace::service::{SearchService, SyncService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = MarketplaceConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting fever-marketplace");

    // Durable store
    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database_acquire_timeout_secs,
        ))
        .connect(&config.database_url)
        .await?;
    let store: Arc<dyn EventStore> = Arc::new(PostgresEventStore::new(pg_pool));

    // Bucket store and sync metadata share one managed Redis connection
    let redis_conn = connect_redis(&config.redis_url).await?;
    let buckets: Arc<dyn BucketStore> = Arc::new(RedisBucketStore::new(
        redis_conn.clone(),
        config.cache.key_prefix.clone(),
    ));
    let sync_metadata = Arc::new(RedisSyncMetadataStore::new(redis_conn));

    // Cache strategy with its background fill worker
    let metrics = Arc::new(Metrics::default());
    let fill_queue = spawn_fill_worker(
        Arc::clone(&buckets),
        Arc::clone(&store),
        config.cache.clone(),
        Arc::clone(&metrics),
    );
    let cache = Arc::new(MonthlyBucketCache::new(
        Arc::clone(&buckets),
        Arc::clone(&store),
        fill_queue,
        config.cache.clone(),
        Arc::clone(&metrics),
    ));

    // Provider client and sync pipeline
    let provider = Arc::new(ProviderClient::new(
        config.provider.clone(),
        Arc::clone(&metrics),
    )?);
    let sync = Arc::new(SyncService::new(
        Arc::clone(&provider) as Arc<dyn EventProvider>,
        Arc::clone(&cache),
        Arc::clone(&store),
        Some(Arc::clone(&sync_metadata)),
        Arc::clone(&metrics),
    ));

    // Scheduler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(run_scheduler(sync, config.sync.clone(), shutdown_rx));

    // HTTP surface
    let search = Arc::new(SearchService::new(cache, Arc::clone(&store)));
    let app_state = AppState {
        search,
        provider,
        buckets,
        sync_metadata: Some(sync_metadata),
        metrics,
    };
    let app = api::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    Ok(())
}

/// Waits for ctrl-c, then tells the scheduler to stop before the server
/// drains.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
}
