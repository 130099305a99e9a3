use anyhow::Context;
use clap::Parser;
use sortie_orchestrator::{
    api::{self, AppState},
    config::Config,
    db,
    repository::{
        ExecutionRepository, InMemoryExecutionRepository, InMemoryInventoryRepository,
        InventoryRepository, PgExecutionRepository, PgInventoryRepository,
    },
    service::{ExecutionTracker, InventoryService},
};
use sortie_runner::AdhocRunner;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sortie_orchestrator=debug,sortie_runner=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    tracing::info!("Starting Sortie Orchestrator...");

    let (repo, inventory_repo): (Arc<dyn ExecutionRepository>, Arc<dyn InventoryRepository>) =
        match &config.database_url {
            Some(database_url) => {
                tracing::info!("Connecting to database...");

                let pool = db::create_pool(database_url)
                    .await
                    .context("Failed to create database pool")?;

                db::run_migrations(&pool)
                    .await
                    .context("Failed to run database migrations")?;

                (
                    Arc::new(PgExecutionRepository::new(pool.clone())),
                    Arc::new(PgInventoryRepository::new(pool)),
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, records are kept in memory");
                (
                    Arc::new(InMemoryExecutionRepository::new()),
                    Arc::new(InMemoryInventoryRepository::new()),
                )
            }
        };

    let runner = AdhocRunner::new(config.runner_config()).context("Failed to initialize runner")?;

    let inventories = InventoryService::new(inventory_repo);
    let tracker = ExecutionTracker::with_inventories(
        repo,
        Arc::new(runner),
        inventories.clone(),
        config.max_concurrent,
    );

    tracker
        .reconcile_interrupted()
        .await
        .context("Failed to reconcile interrupted executions")?;

    // Build router with all API endpoints
    let app = api::create_router(AppState {
        tracker: tracker.clone(),
        inventories,
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracker.shutdown().await;
    tracing::info!("Sortie Orchestrator stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
