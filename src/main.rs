//! MyTodos - todo service with threaded AI suggestions
//!
//! Standalone REST server; optionally serves the built frontend.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tracing::info;

use mytodos::config::{print_env_help, ServerConfig};
use mytodos::constants::GRACEFUL_SHUTDOWN_TIMEOUT_SECS;
use mytodos::handlers::{build_router, ServerState};
use mytodos::{metrics, middleware, tracing_setup};

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--help" || arg == "-h") {
        print_env_help();
        return Ok(());
    }

    // A missing .env file is fine; real environment variables still apply
    let dotenv = dotenvy::dotenv();

    let server_config = ServerConfig::from_env();
    tracing_setup::init_tracing(&server_config.log_level)?;
    if let Ok(path) = dotenv {
        info!("Loaded environment from {:?}", path);
    }

    metrics::register_metrics().context("failed to register metrics")?;
    info!("Metrics registered at /metrics");

    info!("Starting MyTodos server...");
    server_config.log();

    let state = Arc::new(ServerState::from_config(server_config.clone())?);

    let max_concurrent = server_config.max_concurrent_requests;
    info!("Concurrency limiting enabled: max_concurrent={}", max_concurrent);

    let cors = server_config.cors.to_layer();

    // Unknown non-API paths fall through to the single-page frontend
    if let Some(dir) = &server_config.static_dir {
        info!("Serving frontend from {:?}", dir);
    }

    let app = build_router(state)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                server_config.host, server_config.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    // In-flight requests get a bounded window to drain once the signal arrives
    let drain = async {
        server.await?;
        Ok::<(), std::io::Error>(())
    };
    tokio::pin!(drain);

    tokio::select! {
        res = &mut drain => res?,
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(Duration::from_secs(GRACEFUL_SHUTDOWN_TIMEOUT_SECS)).await;
        } => {
            tracing::error!(
                "Graceful shutdown timed out after {}s, forcing exit",
                GRACEFUL_SHUTDOWN_TIMEOUT_SECS
            );
            std::process::exit(1);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Handle graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received, starting graceful shutdown");
}
