//! Configuration management for the catalog services.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Read API rate limiting
    pub rate_limit: RateLimitConfig,

    /// Upstream GraphQL API settings
    pub upstream: UpstreamConfig,

    /// Paging and query bounds for read routes
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Client-side feed settings
    #[serde(default)]
    pub feed: FeedConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Fixed-window rate limiting for the read API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds
    pub window_secs: u64,

    /// Maximum requests per identity per window
    pub max_requests: u32,
}

/// Upstream catalog API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// GraphQL endpoint
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries for failed requests
    pub max_retries: u32,

    /// Retry delay in milliseconds (doubled per attempt)
    pub retry_delay_ms: u64,

    /// Response cache settings
    pub cache: CacheConfig,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching
    pub enabled: bool,

    /// Entry lifetime in seconds
    pub ttl_secs: u64,

    /// Maximum number of cached responses
    pub max_entries: usize,
}

/// Paging bounds shared by all read routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub max_page: u32,
    pub per_page: u32,
    pub per_page_staff: u32,
    pub max_query_length: usize,
    pub min_query_length: usize,
    pub max_compare_ids: usize,
}

/// Client feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL of the read API
    pub base_url: String,

    /// Quiet period before a filter/search change is issued
    pub debounce_ms: u64,

    /// Optional watchdog for a single page fetch
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_page: 500,
            per_page: 20,
            per_page_staff: 24,
            max_query_length: 100,
            min_query_length: 2,
            max_compare_ids: 6,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            debounce_ms: 300,
            fetch_timeout_secs: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: 60,
            },
            upstream: UpstreamConfig {
                endpoint: "https://graphql.anilist.co".to_string(),
                timeout_secs: 30,
                max_retries: 2,
                retry_delay_ms: 500,
                cache: CacheConfig {
                    enabled: true,
                    ttl_secs: 30 * 60,
                    max_entries: 500,
                },
            },
            pagination: PaginationConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl FeedConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Socket address string for the read API
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
