//! Shared library for the catalog workspace.
//!
//! This crate provides common functionality used by the read API and its
//! clients:
//! - Configuration management
//! - Logging infrastructure
//! - Wire models for paginated listings and quick search

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use logging::LogConfig;
pub use models::*;
