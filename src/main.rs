use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_composer::api::{start_http_server, AppState};
use order_composer::config::Config;
use order_composer::directory::{GrpcAccountDirectory, GrpcProductDirectory};
use order_composer::metrics::Metrics;
use order_composer::store::PgOrderStore;
use order_composer::utils::{retry_with_backoff, RetryConfig};
use order_composer::OrderComposer;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides, e.g. RUST_LOG=debug
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_composer=debug")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    tracing::info!("🚀 Starting order composer");

    // === 1. Order storage ===
    let store = retry_with_backoff("connect_postgres", RetryConfig::aggressive(), |_attempt| {
        PgOrderStore::connect(&config.database_url, config.db_max_connections)
    })
    .await?;
    store.ensure_schema().await?;
    let store = Arc::new(store);

    // === 2. Remote directories (lazy, behind circuit breakers) ===
    let accounts = GrpcAccountDirectory::connect_lazy(&config.account_service_url, config.breaker())?;
    let catalog = GrpcProductDirectory::connect_lazy(&config.catalog_service_url, config.breaker())?;
    let breakers = vec![accounts.breaker().clone(), catalog.breaker().clone()];
    tracing::info!(
        account_service = %config.account_service_url,
        catalog_service = %config.catalog_service_url,
        "Directory clients configured"
    );

    // === 3. Metrics ===
    let metrics = Arc::new(Metrics::new()?);

    // === 4. Composer ===
    let composer = Arc::new(OrderComposer::new(
        Arc::new(accounts),
        Arc::new(catalog),
        store.clone(),
        metrics.clone(),
    ));

    // In-flight requests are cancelled as soon as shutdown begins.
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, cancelling in-flight requests");
            signal_token.cancel();
        }
    });

    let state = AppState {
        composer,
        metrics,
        store,
        breakers,
        request_timeout: config.request_timeout(),
        shutdown,
    }
    .into_data();

    start_http_server(state, config.http_port).await?;

    tracing::info!("Order composer stopped");
    Ok(())
}
