//! stacks-promenade - public library site
//!
//! Serves location hours, nearest-location search and reference
//! appointment scheduling. Default port 5820.

use anyhow::{Context, Result};
use clap::Parser;
use stacks_common::clock::system_clock;
use stacks_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use stacks_promenade::services::{DisabledGeocodingClient, GeocodingClient, GoogleGeocodingClient};
use stacks_promenade::AppState;

const DEFAULT_PORT: u16 = 5820;

#[derive(Parser, Debug)]
#[command(name = "stacks-promenade")]
#[command(about = "Public library site")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "STACKS_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "STACKS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "STACKS_PROMENADE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    stacks_common::logging::init(&config.logging.level);

    info!(
        "Starting stacks-promenade v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(args.root_folder.as_deref(), &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = stacks_common::db::init_database(&db_path).await?;

    let geocoder: Arc<dyn GeocodingClient> = match config.geocoding.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Arc::new(
            GoogleGeocodingClient::new(config.geocoding.endpoint.clone(), key)
                .context("Failed to create geocoding client")?,
        ),
        _ => {
            warn!("No geocoding API key configured; nearest-location search is disabled");
            Arc::new(DisabledGeocodingClient)
        }
    };

    let state = AppState::new(db, system_clock(), geocoder);
    let app = stacks_promenade::build_router(state);

    let port = args
        .port
        .or(config.promenade.port)
        .unwrap_or(DEFAULT_PORT);
    let addr = format!("{}:{}", config.promenade.bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
