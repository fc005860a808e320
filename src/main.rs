//! Application entry point and server initialization
//! 
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database
//! - Starts the HTTP server with graceful shutdown support

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use linkcut::config::Config;
use linkcut::database::RedbStore;
use linkcut::rate_limit::RateLimits;
use linkcut::route::create_app;
use linkcut::state::AppState;

/// Application entry point
/// 
/// 1. Loads environment variables from .env file
/// 2. Reads configuration (see [`Config::from_env`])
/// 3. Opens the embedded database
/// 4. Creates the application state and router
/// 5. Starts the HTTP server with graceful shutdown handling
#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("linkcut=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");
    let port = config.port;
    let db_name = config.database_url.clone();

    let store = RedbStore::open(&db_name).expect("Failed to initialize database");
    let state = AppState::new(store, config);

    tokio::spawn(prune_rate_limits(
        state.limits.clone(),
        Duration::from_secs(state.config.rate_limit_window_secs.max(1)),
    ));

    let app = create_app(state).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind address");

    tracing::info!(port, database = %db_name, "server listening");

    // Connect info gives the throttle middleware the peer address.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Periodically forgets throttling windows that have ended
#[tracing::instrument(skip_all)]
async fn prune_rate_limits(limits: std::sync::Arc<RateLimits>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let removed = limits.prune(Instant::now());
        if removed > 0 {
            tracing::debug!(removed, "pruned rate limit windows");
        }
    }
}

/// Handles graceful shutdown signals
/// 
/// Returns when SIGINT (Ctrl+C) or, on Unix, SIGTERM is received. Open
/// connections are allowed to complete and no write transaction is cut off
/// midway.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };
    
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };
    
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, stopping server");
}
