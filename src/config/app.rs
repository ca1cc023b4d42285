//! Application configuration structures.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::validation::{ConfigError, expand_env_vars, validate_namespace};

// =============================================================================
// Constants
// =============================================================================

/// Default per-request upstream timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on the wait for a collector's scrape lock (60 seconds).
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(60);

fn default_components() -> Vec<String> {
    ["hbase", "hdfs", "zookeeper", "yarn"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port` or `:port` (default: ":9232").
    pub listen_address: String,

    /// Path the metrics are served on (default: "/metrics").
    pub telemetry_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: ":9232".to_string(),
            telemetry_path: "/metrics".to_string(),
        }
    }
}

impl ServerConfig {
    /// Resolve the listen address; a bare `:port` binds every interface.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if the address does not parse.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let address = self.listen_address.trim();
        let address = if address.starts_with(':') {
            format!("0.0.0.0{address}")
        } else {
            address.to_string()
        };
        address.parse().map_err(|_| {
            invalid(format!(
                "invalid server listen address: '{}'",
                self.listen_address
            ))
        })
    }
}

// =============================================================================
// Upstream Configuration
// =============================================================================

/// Cloudera Manager API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// API address, `host:port` with an optional scheme (default: "127.0.0.1:7180").
    pub address: String,

    /// REST API version path segment (default: "v33").
    pub api_version: String,

    /// Cluster whose services are monitored (default: "Cluster 1").
    pub cluster_name: String,

    /// Service components to report health for.
    pub components: Vec<String>,

    /// Pre-encoded `Authorization` header value; `${VAR}` references are expanded.
    #[serde(skip_serializing)]
    pub credential: String,

    /// Timeout of a single upstream request (default: 30s).
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Bound on the wait for a collector's scrape lock (default: 60s).
    #[serde(with = "humantime_serde")]
    pub scrape_timeout: Duration,

    /// Upstream fetches in flight within one health pass (default: 1).
    pub max_concurrent_fetches: usize,

    /// Metric name prefix (default: "cdh").
    pub namespace: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7180".to_string(),
            api_version: "v33".to_string(),
            cluster_name: "Cluster 1".to_string(),
            components: default_components(),
            credential: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            scrape_timeout: DEFAULT_SCRAPE_TIMEOUT,
            max_concurrent_fetches: 1,
            namespace: "cdh".to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Credential with environment references expanded.
    pub fn credential(&self) -> String {
        expand_env_vars(&self.credential)
    }

    /// Replace the component list, trimming names and skipping empty ones.
    pub fn set_components<S: AsRef<str>>(&mut self, components: &[S]) {
        self.components = components
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(invalid("upstream address must not be empty"));
        }
        if self.api_version.trim().is_empty() {
            return Err(invalid("upstream api_version must not be empty"));
        }
        if self.cluster_name.trim().is_empty() {
            return Err(invalid("upstream cluster_name must not be empty"));
        }
        if self.components.is_empty() {
            return Err(invalid("at least one upstream component is required"));
        }
        if let Some(component) = self.components.iter().find(|c| c.trim().is_empty()) {
            return Err(invalid(format!("invalid upstream component: '{component}'")));
        }
        if self.credential().trim().is_empty() {
            return Err(invalid("upstream credential must not be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid("upstream request_timeout must be non-zero"));
        }
        if self.scrape_timeout.is_zero() {
            return Err(invalid("upstream scrape_timeout must be non-zero"));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(invalid("upstream max_concurrent_fetches must be positive"));
        }
        validate_namespace(&self.namespace)
    }
}

// =============================================================================
// Log Configuration
// =============================================================================

/// Log output format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset (default: "info").
    pub level: String,

    /// Output format (default: text).
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web server configuration.
    pub server: ServerConfig,

    /// Upstream API configuration.
    pub upstream: UpstreamConfig,

    /// Logging configuration.
    pub log: LogConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// The result is not validated; apply overrides first, then call
    /// [`AppConfig::validate`].
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        let path = &self.server.telemetry_path;
        if !path.starts_with('/') || path == "/" || path == "/healthz" {
            return Err(invalid(format!("invalid telemetry path: '{path}'")));
        }

        self.upstream.validate()?;

        if self.log.level.trim().is_empty() {
            return Err(invalid("log level must not be empty"));
        }

        Ok(())
    }
}
