//! Livescore Server
//!
//! Aggregates live sporting-event data from several unreliable upstream
//! providers and serves snapshots and WebSocket live updates.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use livescore_core::processors::{Aggregator, AggregatorContext, SourceSlot};
use livescore_core::sources::{HttpJsonSource, SourceAdapter};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Livescore - live sports score aggregation server
#[derive(Parser, Debug)]
#[command(name = "livescore-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "LIVESCORE_CONFIG", default_value = "./livescore.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.json_logs);

    tracing::info!("Starting livescore-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!(
        sources = loaded_config.sources.len(),
        "Configuration loaded from {:?}",
        args.config
    );

    // Build the aggregation pipeline
    let slots: Vec<SourceSlot> = loaded_config
        .sources
        .iter()
        .map(|source| {
            let adapter: Arc<dyn SourceAdapter> = Arc::new(HttpJsonSource::new(source));
            SourceSlot::new(adapter, source.always_show)
        })
        .collect();
    let ctx = AggregatorContext::from_config(
        loaded_config.sources.iter().map(|s| s.id.clone()),
        &loaded_config.cache,
        &loaded_config.rate_limits,
        loaded_config.retry,
    );
    let cache = ctx.cache.clone();
    let aggregator = Arc::new(Aggregator::new(slots, ctx));

    // Background tasks stop when this flips to true
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = cache.spawn_sweeper(loaded_config.cache.sweep_interval, shutdown_rx.clone());
    spawn_config_reload_handler(aggregator.clone(), config_loader, shutdown_rx.clone());

    // Build the router
    let state = AppState::new(aggregator, shutdown_rx);
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", loaded_config.listen);
    let result = run_server(router, loaded_config.listen, shutdown_tx).await;

    // The shutdown sender is gone once run_server returns, which also stops
    // the sweeper on the error path.
    let _ = sweeper.await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
