//! FileHub maintenance process.
//!
//! Connects to the database and object store, wires the sharing services
//! and runs the scheduled sweeps (trash retention, expired grants) until
//! interrupted.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use filehub_core::config::AppConfig;
use filehub_core::error::AppError;
use filehub_database::DatabasePool;
use filehub_service::{Services, Stores};
use filehub_storage::StorageManager;
use filehub_worker::jobs::{CollaboratorSweepHandler, TrashSweepHandler};
use filehub_worker::{CronScheduler, JobExecutor};

#[tokio::main]
async fn main() {
    let env = std::env::var("FILEHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Maintenance process failed");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting FileHub maintenance v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;

    // ── Step 2: Object store ─────────────────────────────────────
    let storage = StorageManager::from_config(&config.storage).await?;
    if !storage.health_check().await {
        tracing::warn!(driver = %config.storage.driver, "Object store health check failed");
    }

    // ── Step 3: Services ─────────────────────────────────────────
    let services = Services::new(
        Stores::postgres(db.stores()),
        storage,
        config.sharing.clone(),
        config.upload.clone(),
        config.trash.clone(),
    );

    // ── Step 4: Scheduler ────────────────────────────────────────
    if !config.worker.enabled {
        tracing::info!("Background worker disabled; nothing to run");
        db.close().await;
        return Ok(());
    }

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(TrashSweepHandler::new(services.trash.clone())));
    executor.register(Arc::new(CollaboratorSweepHandler::new(
        services.collaborators.clone(),
    )));

    let scheduler = CronScheduler::new(Arc::new(executor)).await?;
    scheduler
        .register_default_tasks(&config.trash, &config.worker)
        .await?;
    scheduler.start().await?;

    // ── Step 5: Wait for shutdown ────────────────────────────────
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {e}")))?;
    tracing::info!("Shutdown signal received");

    scheduler.shutdown().await?;
    db.close().await;
    tracing::info!("FileHub maintenance stopped");
    Ok(())
}
