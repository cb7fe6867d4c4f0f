//! Assessment server entry point.
//!
//! Builds the shared state and starts the Axum HTTP server with graceful
//! shutdown. A background worker evicting idle sessions runs alongside the
//! server and is cancelled on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use assessment_server::config::ServerConfig;
use assessment_server::routes::build_router;
use assessment_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment.
    let config = ServerConfig::from_env();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        otp_ttl_secs = config.otp_ttl.as_secs(),
        session_ttl_secs = config.session_ttl.as_secs(),
        log_otp = config.log_otp,
        "assessment server starting"
    );

    let state = Arc::new(AppState::new(&config));

    // Shutdown signal channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper_handle = {
        let state = Arc::clone(&state);
        let mut rx = shutdown_rx.clone();
        let interval = config.sweep_interval;
        let idle_ttl = config.session_ttl;
        tokio::spawn(async move {
            session_sweeper(state, &mut rx, interval, idle_ttl).await;
        })
    };

    let app = build_router(Arc::clone(&state), &config);

    // Bind and serve.
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "assessment server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    info!("waiting for background workers to stop");
    if tokio::time::timeout(Duration::from_secs(10), sweeper_handle)
        .await
        .is_err()
    {
        debug!("session sweeper did not stop in time");
    }

    info!("assessment server stopped");
    Ok(())
}

/// Background worker that periodically evicts idle sessions.
async fn session_sweeper(
    state: Arc<AppState>,
    shutdown: &mut watch::Receiver<bool>,
    interval: Duration,
    idle_ttl: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    info!(interval_secs = interval.as_secs(), "session sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let evicted = state.sessions.sweep_idle(idle_ttl).await;
                if evicted > 0 {
                    let remaining = state.sessions.len().await;
                    info!(evicted, remaining, "idle sessions evicted");
                }
            }
            _ = shutdown.changed() => {
                info!("session sweeper shutting down");
                return;
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM, then broadcast shutdown.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    if shutdown_tx.send(true).is_err() {
        debug!("no background workers listening for shutdown");
    }
}
