//! TOML file configuration structures.
//!
//! These structs directly map to the `livescore.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub rate_limits: Vec<RateLimitConfig>,
    /// Upstream providers, in league priority order.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Cache TTLs, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub short_ttl_secs: u64,
    pub medium_ttl_secs: u64,
    pub long_ttl_secs: u64,
    pub stale_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            short_ttl_secs: 30,
            medium_ttl_secs: 300,
            long_ttl_secs: 900,
            stale_ttl_secs: 600,
            sweep_interval_secs: 60,
        }
    }
}

/// Retry policy for upstream fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay after the first failed attempt; doubles after each further one.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            base_delay_ms: 500,
        }
    }
}

/// Minimum interval between requests to one upstream host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub host: String,
    pub min_interval_ms: u64,
}

/// One upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub base_url: Url,
    /// Show the league even when it has no games.
    #[serde(default)]
    pub always_show: bool,
}
