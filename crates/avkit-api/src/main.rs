//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{error, info, warn};

use avkit_api::{create_router, metrics, ApiConfig, AppState};
use avkit_media::{check_ffmpeg, check_ffprobe};
use avkit_worker::{init_tracing, RetentionSweeper, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting avkit-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    info!(
        "API config: host={}, port={}, uploads={}, output={}, job timeout={}s",
        config.host,
        config.port,
        worker_config.upload_dir.display(),
        worker_config.output_dir.display(),
        worker_config.job_timeout.as_secs()
    );

    if let Err(e) = worker_config.ensure_dirs().await {
        error!("Failed to create working directories: {}", e);
        std::process::exit(1);
    }

    // Missing binaries only fail jobs, so the server still starts
    if let Err(e) = check_ffmpeg().and_then(|_| check_ffprobe()) {
        warn!("{}; conversions will fail until it is installed", e);
    }

    let metrics_handle = if config.metrics_enabled {
        let handle = metrics::init_metrics().context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics enabled at /metrics");
        Some(handle)
    } else {
        None
    };

    if worker_config.retention_enabled {
        let sweeper = RetentionSweeper::from_config(&worker_config);
        tokio::spawn(async move {
            sweeper.run().await;
        });
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    let state = AppState::new(config, worker_config);
    let app = create_router(state, metrics_handle);

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
