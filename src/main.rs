use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod auth;
mod config;
mod db;
mod domain;
mod metrics;
mod utils;

use api::AppState;
use config::AppConfig;
use db::{MemoryStore, PgStore};
use domain::catalog::CatalogReader;
use domain::customer::CustomerDirectory;
use domain::order::{OrderBuilder, OrderStore};
use utils::RetryConfig;

type Stores = (Arc<dyn CustomerDirectory>, Arc<dyn CatalogReader>, Arc<dyn OrderStore>);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env file; real environment variables win
    dotenvy::dotenv().ok();

    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,car_parts_orders=debug"))
        )
        .init();

    tracing::info!("🚀 Starting car parts order service");

    // === 1. Configuration ===
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        tax_rate = %config.tax_rate,
        checkout_max_attempts = config.checkout_max_attempts,
        persistent = config.database_url.is_some(),
        "Configuration loaded"
    );

    // === 2. Storage ===
    let (customers, catalog, orders) = open_stores(&config).await?;

    // === 3. Metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 4. HTTP server ===
    let state = web::Data::new(AppState::new(
        customers,
        catalog,
        orders,
        OrderBuilder::new(config.tax_rate),
        metrics,
        RetryConfig::request_path(config.checkout_max_attempts),
    ));

    tracing::info!("🌐 Listening on http://{}:{}", config.http_host, config.http_port);

    HttpServer::new(move || App::new().configure(api::configure(state.clone())))
        .bind((config.http_host.as_str(), config.http_port))
        .with_context(|| format!("failed to bind {}:{}", config.http_host, config.http_port))?
        .run()
        .await?;

    tracing::info!("👋 Shutdown complete");
    Ok(())
}

async fn open_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to Postgres...");
            let store = PgStore::connect(url, config.db_max_connections)
                .await
                .context("failed to connect to Postgres")?;
            db::schema::ensure_schema(store.pool()).await?;
            Ok(share(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store with demo data");
            let store = MemoryStore::new();
            store.seed_demo().await;
            Ok(share(store))
        }
    }
}

/// One backend behind all three collaborator traits
fn share<S>(store: S) -> Stores
where
    S: CustomerDirectory + CatalogReader + OrderStore + 'static,
{
    let store = Arc::new(store);
    let customers: Arc<dyn CustomerDirectory> = store.clone();
    let catalog: Arc<dyn CatalogReader> = store.clone();
    let orders: Arc<dyn OrderStore> = store;
    (customers, catalog, orders)
}
