//! bgcull-sync - Catalog sync and caching service
//!
//! Keeps two derived datasets (expansion links, box dimensions) cached on disk,
//! fills them from the catalog in the background on request, and orders the
//! interview queue from the cached expansion links.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bgcull_common::config::{default_config_path, RootFolderInitializer, RootFolderResolver, TomlConfig};
use bgcull_sync::catalog::{CatalogClient, HttpCatalog};
use bgcull_sync::config::{resolve_catalog_token, CATALOG_TOKEN_ENV};
use bgcull_sync::sync::dimensions::DIMENSIONS_FILE;
use bgcull_sync::sync::expansions::EXPANSIONS_FILE;
use bgcull_sync::sync::{DimensionSync, ExpansionSync, SyncTiming};
use bgcull_sync::{build_router, AppState};

const MODULE_NAME: &str = "bgcull-sync";
const DEFAULT_PORT: u16 = 5760;

/// Command-line arguments for bgcull-sync
#[derive(Parser, Debug)]
#[command(name = "bgcull-sync")]
#[command(about = "Catalog sync and cache service for bgcull")]
#[command(version)]
struct Args {
    /// Port to listen on (default 5760)
    #[arg(short, long, env = "BGCULL_PORT")]
    port: Option<u16>,

    /// Root folder holding the cache directory
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog session token
    #[arg(long, env = CATALOG_TOKEN_ENV, hide_env_values = true)]
    catalog_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => default_config_path(MODULE_NAME).context("Failed to locate config file")?,
    };
    let toml_config = TomlConfig::load_or_default(&config_path);

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bgcull-sync (Catalog Sync) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config_path.display());

    // Step 1: Resolve root folder and create the cache directory
    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &toml_config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directories_exist()
        .context("Failed to initialize root folder")?;
    let cache_dir = initializer.cache_dir();
    info!("Root folder: {}", initializer.root_folder().display());
    info!("Cache directory: {}", cache_dir.display());

    // Step 2: Catalog client
    let auth_token = resolve_catalog_token(args.catalog_token.as_deref(), &toml_config);
    let transport = HttpCatalog::new(
        toml_config.catalog.base_url.clone(),
        auth_token,
        Duration::from_secs(toml_config.catalog.timeout_secs),
    )
    .context("Failed to build catalog HTTP client")?;
    let timing = SyncTiming::default();
    let catalog = CatalogClient::with_retry_ladder(Arc::new(transport), timing.retry_ladder.clone());

    // Step 3: Sync coordinators (one per dataset, shared by all handlers)
    let expansions = ExpansionSync::new(cache_dir.join(EXPANSIONS_FILE), catalog.clone(), &timing);
    let dimensions = DimensionSync::new(cache_dir.join(DIMENSIONS_FILE), catalog, &timing);

    let state = AppState::new(expansions, dimensions);
    let app = build_router(state);

    // Step 4: Serve
    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
