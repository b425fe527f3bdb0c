//! Harvest Dispatch — job scheduler and worker.
//!
//! Main entry point that wires the pipeline crates together and runs both
//! components until shutdown. Each component owns its broker connection and
//! reconnects independently.

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

use harvest_broker::QueueManager;
use harvest_core::config::AppConfig;
use harvest_core::error::AppError;
use harvest_pipeline::executor::JobExecutor;
use harvest_pipeline::jobs::CollectJobHandler;
use harvest_pipeline::{TickPublisher, TickScheduler, Worker};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Dispatch error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("HARVEST_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
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

/// Main dispatch run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Harvest Dispatch v{}", env!("CARGO_PKG_VERSION"));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Scheduler component ──────────────────────────────────────
    let mut scheduler = if config.scheduler.enabled {
        let queue =
            QueueManager::connect_with_retry(&config.broker, &[config.broker.work_queue.as_str()])
                .await;

        let publisher = Arc::new(TickPublisher::new(
            Arc::new(queue),
            config.broker.work_queue.clone(),
            config.scheduler.job_type.clone(),
        ));

        let scheduler = TickScheduler::new(publisher, config.scheduler.clone()).await?;
        scheduler.register_tick().await?;
        scheduler.start().await?;

        tracing::info!("Scheduler started");
        Some(scheduler)
    } else {
        tracing::info!("Scheduler disabled");
        None
    };

    // ── Worker component ─────────────────────────────────────────
    let worker_handle = if config.worker.enabled {
        let queue = QueueManager::connect_with_retry(
            &config.broker,
            &[
                config.broker.work_queue.as_str(),
                config.broker.dead_letter_queue.as_str(),
            ],
        )
        .await;

        let mut executor = JobExecutor::new();
        let collect = CollectJobHandler::new(&config.collector, config.scheduler.job_type.clone())?;
        executor.register(Arc::new(collect));

        let worker_id = format!("worker-{}", Uuid::new_v4());
        let worker = Worker::new(
            Arc::new(queue),
            Arc::new(executor),
            config.worker.clone(),
            config.broker.clone(),
            worker_id,
        );

        let cancel = shutdown_rx.clone();
        let handle = tokio::spawn(async move { worker.run(cancel).await });

        tracing::info!("Worker started");
        Some(handle)
    } else {
        tracing::info!("Worker disabled");
        None
    };

    // ── Graceful shutdown ────────────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    let _ = shutdown_tx.send(true);

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::error!("Scheduler shutdown error: {}", e);
        }
    }
    if let Some(handle) = worker_handle {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(30), handle).await;
    }

    tracing::info!("Harvest Dispatch shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
