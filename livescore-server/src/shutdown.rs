//! Signal handling for graceful shutdown and config reload.

use crate::config::ConfigLoader;
use livescore_core::processors::Aggregator;
use livescore_core::shutdown::stopped;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers, falling back to Ctrl+C");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Spawns a task that listens for SIGHUP and reloads the configuration.
///
/// Rate limits and the retry policy are applied in place. Changes to the
/// source list, cache TTLs or listen address need a restart and are only
/// logged. The task exits when `shutdown_rx` flips to `true`.
pub fn spawn_config_reload_handler(
    aggregator: Arc<Aggregator>,
    config_loader: Arc<ConfigLoader>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(sighup) => sighup,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler, config reload disabled");
                return;
            }
        };

        loop {
            tokio::select! {
                biased;

                _ = stopped(&mut shutdown_rx) => {
                    tracing::debug!("Config reload handler shutting down");
                    break;
                }

                _ = sighup.recv() => {
                    tracing::info!(path = ?config_loader.path(), "Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded_config) => {
                            let running: Vec<&str> = aggregator.source_ids().collect();
                            let reloaded: Vec<&str> =
                                loaded_config.sources.iter().map(|s| s.id.as_str()).collect();
                            if running != reloaded {
                                tracing::warn!(
                                    ?running,
                                    ?reloaded,
                                    "Source list changed, restart to apply"
                                );
                            }

                            aggregator
                                .context()
                                .reload(&loaded_config.rate_limits, loaded_config.retry)
                                .await;
                            tracing::info!("Configuration reloaded successfully");
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
            }
        }
    });
}
