//! Configuration module for livescore-server.
//!
//! Handles loading configuration from TOML files and CLI arguments, and
//! converting it into the runtime types of `livescore-core`.

pub mod file;

use crate::config::file::FileConfig;
use livescore_core::config::{CacheConfig, RateLimitConfig, RetryPolicy, SourceConfig};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub cache: CacheConfig,
    pub retry: RetryPolicy,
    pub rate_limits: Vec<RateLimitConfig>,
    /// Sources in league priority order.
    pub sources: Vec<SourceConfig>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Read, validate and convert the configuration file.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.parse(&config_content)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn parse(&self, config_content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.sources.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one [[sources]] entry is required".into(),
        ));
    }

    for (i, source) in config.sources.iter().enumerate() {
        if source.id.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "source #{} has an empty id",
                i + 1
            )));
        }
        if config.sources[..i].iter().any(|s| s.id == source.id) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate source id {}",
                source.id
            )));
        }
        if source.base_url.cannot_be_a_base() {
            return Err(ConfigError::ValidationError(format!(
                "source {} has an invalid base_url {}",
                source.id, source.base_url
            )));
        }
    }

    let cache = &config.cache;
    let ttls = [
        ("short_ttl_secs", cache.short_ttl_secs),
        ("medium_ttl_secs", cache.medium_ttl_secs),
        ("long_ttl_secs", cache.long_ttl_secs),
        ("stale_ttl_secs", cache.stale_ttl_secs),
        ("sweep_interval_secs", cache.sweep_interval_secs),
    ];
    for (name, value) in ttls {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "cache.{name} must be positive"
            )));
        }
    }

    if config.rate_limits.iter().any(|l| l.host.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "rate limit with an empty host".into(),
        ));
    }

    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    let cache = file_config.cache;
    LoadedConfig {
        listen: file_config.server.listen,
        cache: CacheConfig {
            short_ttl: Duration::from_secs(cache.short_ttl_secs),
            medium_ttl: Duration::from_secs(cache.medium_ttl_secs),
            long_ttl: Duration::from_secs(cache.long_ttl_secs),
            stale_ttl: Duration::from_secs(cache.stale_ttl_secs),
            sweep_interval: Duration::from_secs(cache.sweep_interval_secs),
        },
        retry: RetryPolicy::new(
            file_config.retry.retries,
            Duration::from_millis(file_config.retry.base_delay_ms),
        ),
        rate_limits: file_config
            .rate_limits
            .into_iter()
            .map(|l| RateLimitConfig {
                host: l.host.trim().to_string(),
                min_interval: Duration::from_millis(l.min_interval_ms),
            })
            .collect(),
        sources: file_config.sources.into_iter().map(convert_source).collect(),
    }
}

fn convert_source(s: file::SourceConfig) -> SourceConfig {
    let mut base_url = s.base_url;
    if !base_url.path().ends_with('/') {
        let path = format!("{}/", base_url.path());
        base_url.set_path(&path);
    }
    SourceConfig {
        id: s.id,
        name: s.name,
        base_url,
        always_show: s.always_show,
    }
}
