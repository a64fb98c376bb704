use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use marketplace_engine::{
    config::{Config, StoreBackend},
    database::{fixtures, LedgerStore, PgLedgerStore},
    handlers,
    ledger::LedgerPolicy,
    metrics,
    services::MarketplaceService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    metrics::register_metrics(prometheus::default_registry())
        .map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    info!(
        "Starting Marketplace Engine on {}:{}",
        config.server.host, config.server.port
    );

    let store: Arc<dyn LedgerStore> = match config.database.backend {
        StoreBackend::Postgres => {
            let store = PgLedgerStore::new(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
                Duration::from_secs(config.database.acquire_timeout_secs),
            )
            .await
            .context("Failed to connect to database")?;

            if config.database.run_migrations {
                store.migrate().await.context("Failed to run migrations")?;
            }

            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store seeded with demo data; nothing is persisted");
            Arc::new(
                fixtures::demo_store()
                    .await
                    .context("Failed to seed in-memory store")?,
            )
        }
    };

    let service = Arc::new(MarketplaceService::new(
        store,
        LedgerPolicy::from(&config.ledger),
    ));

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(service.clone()))
            .configure(handlers::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
