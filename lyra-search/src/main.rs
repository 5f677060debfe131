//! lyra-search - Song Search Microservice
//!
//! **Module Identity:**
//! - Name: lyra-search
//! - Port: 5760 (default)
//!
//! Answers song searches from the result cache, the local song store and,
//! when local confidence is low, the Genius API. Also serves autocomplete.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lyra_common::config::{
    default_config_path, load_toml_config, resolve_root_folder, TomlConfig, DATABASE_FILE_NAME,
    ROOT_FOLDER_ENV,
};
use lyra_search::services::GeniusClient;
use lyra_search::AppState;

/// Command-line arguments for lyra-search
#[derive(Parser, Debug)]
#[command(name = "lyra-search")]
#[command(about = "Song search and suggestion microservice for Lyra")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides TOML)
    #[arg(short, long, env = "LYRA_SEARCH_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is needed before tracing for the default log level
    let config_path = match args.config.clone() {
        Some(path) => Some(path),
        None => default_config_path("lyra-search").ok(),
    };
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TomlConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=info", toml_config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lyra-search v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => warn!("Could not determine config directory, using defaults"),
    }

    // Root folder and database
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml_config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;

    let db_path = root_folder.join(DATABASE_FILE_NAME);
    info!("Database: {}", db_path.display());

    let db_pool = lyra_search::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    lyra_search::db::songs::index_unindexed_songs(&db_pool)
        .await
        .context("Failed to index songs for search")?;

    // Remote provider
    let token = lyra_search::config::resolve_genius_token(&toml_config);
    let genius = GeniusClient::new(
        token,
        toml_config.genius_base_url.clone(),
        toml_config.search.genius_requests_per_second,
    )
    .context("Failed to create Genius client")?;

    let state = AppState::new(db_pool, Arc::new(genius), &toml_config.search);
    let app = lyra_search::build_router(state);

    let port = args.port.unwrap_or(toml_config.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
