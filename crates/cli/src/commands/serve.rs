//! `serve` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cli::ServeArgs;
use crate::pipeline::{build_dispatcher, load_service_config};
use crate::server::{router, AppState};

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    let mut config = load_service_config(&args.service)?;

    // Apply CLI overrides
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(port) = args.metrics_port {
        config.server.metrics_port = port;
    }

    // Initialize Metrics (optional)
    let metrics = if config.server.export_prometheus {
        Some(observability::install_metrics_recorder()?)
    } else {
        if config.server.metrics_port != 0 {
            observability::init_metrics_only(config.server.metrics_port)?;
        }
        None
    };

    let dispatcher = Arc::new(build_dispatcher(&config).await?);
    let app = router(AppState {
        dispatcher: Arc::clone(&dispatcher),
        metrics,
    });

    let listener = TcpListener::bind(config.server.address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.address))?;

    info!(
        address = %config.server.address,
        sinks = ?dispatcher.sink_names(),
        "HTTP trigger listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    warn!("Received shutdown signal, stopping sinks...");
    dispatcher.shutdown().await;

    info!("Ride dispatch server finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
