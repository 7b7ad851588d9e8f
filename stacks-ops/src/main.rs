//! stacks-ops - staff intranet
//!
//! Staff sign in through the directory handshake and manage section pages,
//! Promenade content, product inventory and their profiles. Default port 5810.

use anyhow::{Context, Result};
use clap::Parser;
use stacks_common::clock::system_clock;
use stacks_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use stacks_ops::auth::{sessions, AuthSettings, DirectoryService, NullDirectory, TomlDirectory};
use stacks_ops::AppState;

const DEFAULT_PORT: u16 = 5810;

/// How often expired sessions and cache entries are removed
const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Parser, Debug)]
#[command(name = "stacks-ops")]
#[command(about = "Staff intranet")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "STACKS_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database and profile pictures
    #[arg(short, long, env = "STACKS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "STACKS_OPS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;

    stacks_common::logging::init(&config.logging.level);

    info!(
        "Starting stacks-ops v{} [{}] built {} ({})",
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

    let auth = AuthSettings::from_config(&config.auth);
    if !auth.is_enabled() {
        warn!("No authentication redirect configured; requests run without a signed-in user");
    }

    let directory: Arc<dyn DirectoryService> = match config.directory.users_file.as_deref() {
        Some(path) => Arc::new(
            TomlDirectory::load(path)
                .with_context(|| format!("Failed to load directory from {}", path.display()))?,
        ),
        None => {
            warn!("No directory file configured; user details will not be refreshed at sign-in");
            Arc::new(NullDirectory)
        }
    };

    let state = AppState::new(
        db,
        system_clock(),
        auth,
        directory,
        initializer.root_folder().to_path_buf(),
    );
    tokio::spawn(purge_expired(state.clone()));

    let app = stacks_ops::build_router(state);

    let port = args.port.or(config.ops.port).unwrap_or(DEFAULT_PORT);
    let addr = format!("{}:{}", config.ops.bind, port);

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

async fn purge_expired(state: AppState) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
        interval.tick().await;

        match sessions::purge_expired(&state.db, state.clock.now()).await {
            Ok(0) => {}
            Ok(n) => info!("Removed {} expired sessions", n),
            Err(e) => warn!("Failed to purge sessions: {}", e),
        }
        if let Err(e) = state.cache.purge_expired().await {
            warn!("Failed to purge cache: {}", e);
        }
    }
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
