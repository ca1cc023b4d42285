//! Configuration module for the CDH exporter.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (listen address, telemetry path)
//! - Upstream settings (API address, credential, components, timeouts)
//! - Log settings (level, output format)

mod app;
mod validation;

pub use app::{AppConfig, LogConfig, LogFormat, ServerConfig, UpstreamConfig};
pub use validation::{ConfigError, expand_env_vars, parse_duration, validate_namespace};

// Re-export constants
pub use app::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SCRAPE_TIMEOUT};
