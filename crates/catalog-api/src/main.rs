//! Catalog read API server.

use anyhow::{Context, Result};
use catalog_api::{start_server, AniListClient, AppState, RequestRateLimiter};
use clap::Parser;
use shared::{Config, LogConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Port to listen on (overrides [server].port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Initialize logging
    shared::logging::init(LogConfig::for_component(
        "catalog-api",
        &config.logging,
        args.verbose,
    ))?;

    info!("Catalog API starting");
    info!(config_file = %args.config.display(), "Loaded configuration");
    info!(
        window_secs = config.rate_limit.window_secs,
        max_requests = config.rate_limit.max_requests,
        "Rate limiting /api"
    );
    info!(
        endpoint = %config.upstream.endpoint,
        cache_enabled = config.upstream.cache.enabled,
        cache_ttl_secs = config.upstream.cache.ttl_secs,
        "Upstream catalog"
    );

    let catalog = AniListClient::new(&config.upstream).context("Failed to create AniList client")?;
    let limiter = RequestRateLimiter::from_config(&config.rate_limit);
    let state = Arc::new(AppState::new(catalog, limiter, config.pagination.clone()));

    start_server(&config.bind_addr(), state, shutdown_signal()).await?;

    info!("Catalog API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
