use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use watchwithfriends_server::config::DEFAULT_LOG_FILTER;
use watchwithfriends_server::{build_router, spawn_reconciler, Config, SessionCoordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Initialize tracing
    let (filter, filter_error) = match EnvFilter::try_new(config.log_filter()) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_LOG_FILTER), Some(e)),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(e) = filter_error {
        tracing::warn!(
            error = %e,
            filter = config.log_filter(),
            "Invalid log filter, using default"
        );
    }

    tracing::info!(
        environment = %config.common.environment,
        reconcile_interval_secs = config.reconcile_interval.as_secs(),
        "Starting Watch With Friends server"
    );

    let coordinator = SessionCoordinator::new();
    let shutdown = CancellationToken::new();

    let reconciler = spawn_reconciler(
        coordinator.clone(),
        config.reconcile_interval,
        shutdown.clone(),
    );

    let app = build_router(coordinator, &config);

    let addr = config.listener().socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Watch With Friends WebSocket server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    reconciler.await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM and cancel background jobs
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
