//! Entry point for the nbconvert-server binary.

use nbconvert_server::{build_app, config::ServerConfig, state::AppState};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    tracing::info!("Starting nbconvert-server");
    tracing::info!(
        port = config.port,
        log_level = %config.log_level,
        cache_policy = %config.cache_policy,
        plugin_dir = ?config.plugin_dir,
        "Configuration loaded"
    );
    if config.jwt_secret.is_empty() && !config.allow_dev_identity {
        tracing::warn!("JWT_SECRET is empty and ALLOW_DEV_IDENTITY is off; every request will be rejected");
    }

    // Build application state and router
    let addr = config.socket_addr();
    let app = build_app(AppState::new(config));

    // Create listener
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
