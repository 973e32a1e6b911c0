//! Logging infrastructure for the catalog services.
//!
//! Structured `tracing` output to the console and to daily-rotated files,
//! with per-crate levels and an optional JSON file format.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log directory path
    pub log_dir: String,
    /// Component name (used for log file naming)
    pub component: String,
    /// Default log level
    pub default_level: Level,
    /// Enable console output
    pub console: bool,
    /// Enable file output
    pub file: bool,
    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            component: "catalog".to_string(),
            default_level: Level::INFO,
            console: true,
            file: true,
            json_format: false,
        }
    }
}

impl LogConfig {
    /// Build a log config for `component` from the `[logging]` section.
    ///
    /// `verbose` forces DEBUG regardless of the configured level.
    pub fn for_component(component: &str, logging: &LoggingConfig, verbose: bool) -> Self {
        let default_level = if verbose {
            Level::DEBUG
        } else {
            parse_level(&logging.default_level)
        };

        Self {
            log_dir: logging.log_dir.clone(),
            component: component.to_string(),
            default_level,
            console: logging.console,
            file: logging.file,
            json_format: logging.json_format,
        }
    }

    /// Filter directive used when `RUST_LOG` is unset
    fn default_directive(&self) -> String {
        let level = self.default_level;
        format!(
            "{}={level},shared={level},catalog_feed={level},catalog_api={level},hyper=warn,reqwest=warn,h2=warn",
            self.component.replace('-', "_"),
        )
    }
}

/// Parse a level name, falling back to INFO for anything unrecognised
pub fn parse_level(name: &str) -> Level {
    name.trim().parse().unwrap_or(Level::INFO)
}

/// Initialize logging with the given configuration
///
/// Sets up tracing with:
/// - Daily file rotation per component
/// - Structured logging with contextual fields
/// - Crate-specific log levels, overridable through `RUST_LOG`
/// - Optional JSON formatting
pub fn init(config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let mut layers = Vec::new();

    if config.console {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stdout)
            .boxed();
        layers.push(console_layer);
    }

    if config.file {
        let log_dir = Path::new(&config.log_dir);
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", config.log_dir))?;

        let file_appender = tracing_appender::rolling::daily(log_dir, &config.component);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(file_appender)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_appender)
                .boxed()
        };

        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(
        component = %config.component,
        log_dir = %config.log_dir,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config() {
        let config = LogConfig::default();
        assert_eq!(config.component, "catalog");
        assert_eq!(config.default_level, Level::INFO);
        assert!(config.console);
        assert!(config.file);
    }

    #[test]
    fn test_for_component() {
        let logging = crate::Config::default().logging;

        let quiet = LogConfig::for_component("catalog-api", &logging, false);
        assert_eq!(quiet.default_level, Level::INFO);
        assert_eq!(quiet.component, "catalog-api");

        let verbose = LogConfig::for_component("catalog-api", &logging, true);
        assert_eq!(verbose.default_level, Level::DEBUG);
    }

    #[test]
    fn test_default_directive_uses_crate_name() {
        let config = LogConfig {
            component: "catalog-feed".to_string(),
            default_level: Level::WARN,
            ..Default::default()
        };
        let directive = config.default_directive();
        assert!(directive.starts_with("catalog_feed=WARN"));
        assert!(directive.contains("reqwest=warn"));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" TRACE "), Level::TRACE);
        assert_eq!(parse_level("loud"), Level::INFO);
    }
}
