#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::engine::HashEmbedder;
use server::fetch::ReqwestDispatch;
use server::service::{AppState, router};
use server::telemetry::{TelemetryProviders, init_telemetry};
use std::sync::Arc;
use strew::{EngineRegistry, FetchRunner, InferenceBackend, PoolConfig, WorkerPool};
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let mut registry = EngineRegistry::new();
    registry.register(
        config.embed_model.clone(),
        Arc::new(HashEmbedder::new(config.embed_dim)) as Arc<dyn InferenceBackend>,
    );

    let dispatch = ReqwestDispatch::new().context("building the outbound HTTP client")?;
    let search_pool = Arc::new(WorkerPool::start(
        PoolConfig::new(config.search_workers, config.search_queue_depth)
            .with_shutdown_timeout(config.shutdown_timeout),
        FetchRunner::new(Arc::new(dispatch)),
    )?);

    let state = AppState {
        config: config.clone(),
        registry: Arc::new(registry),
        search_pool: Arc::clone(&search_pool),
    };
    let app = router(state);

    let listener = TcpListener::bind(&config.server_addr).await?;
    log_startup_info(&config);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Connections are drained at this point; refuse new submissions, finish
    // in-flight units and fail whatever is still queued.
    search_pool.shutdown().await;
    flush_telemetry(providers);

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting dispatch service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting dispatch service on {} with {} search workers",
            config.server_addr,
            config.search_workers
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}

fn flush_telemetry(_providers: TelemetryProviders) {
    #[cfg(feature = "metrics")]
    {
        if let Err(err) = _providers.meter_provider.force_flush() {
            eprintln!("Error flushing metrics: {:#?}", err);
        }
        if let Err(err) = _providers.meter_provider.shutdown() {
            eprintln!("Error shutting down meter: {:#?}", err);
        }
    }
}
