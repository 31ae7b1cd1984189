use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recast_core::{
    app_dir, load_config, ConverterRegistry, HistoryStore, JobRunner, MediaConverter,
    SqliteHistoryStore,
};

use recast_server::api::create_router;
use recast_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("recastd {}", VERSION);

    // Determine config path
    let config_path = std::env::var("RECAST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| app_dir().join("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let mut config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Single port-selection variable, takes precedence over the file.
    if let Ok(port) = std::env::var("RECAST_PORT") {
        config.server.port = port
            .parse()
            .with_context(|| format!("Invalid RECAST_PORT: {}", port))?;
    }

    info!("Database path: {:?}", config.database.path);

    // Create history store
    let history: Arc<dyn HistoryStore> = Arc::new(
        SqliteHistoryStore::new(&config.database.path)
            .context("Failed to create history store")?,
    );
    info!("History store initialized");

    // Wire up converters, probing external tools once
    let registry = Arc::new(ConverterRegistry::with_defaults(&config.converter).await);
    info!("Converter registry initialized");

    // Media conversion degrades to per-file failures without ffmpeg;
    // surface that up front instead of at first use.
    if let Err(e) = MediaConverter::new(config.converter.clone()).validate().await {
        warn!("ffmpeg unavailable, media conversions will fail: {}", e);
    }

    // Create job runner
    let jobs = Arc::new(JobRunner::new(registry, Arc::clone(&history)));
    info!("Job runner initialized");

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), jobs, history));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
