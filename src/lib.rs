//! cdh-exporter - Cloudera Manager metrics bridge
//!
//! Translates the Cloudera Manager REST API into Prometheus metrics. Every
//! scrape issues fresh upstream queries; nothing is retained between scrapes
//! except the timeseries schema, discovered once at startup.
//!
//! # Architecture
//!
//! - **Upstream**: typed REST endpoints, wire records and the HTTP [`Transport`]
//! - **Collectors**: [`HealthCollector`] (service/role health checks as ordinal
//!   gauges) and [`TimeseriesCollector`] (schema-driven timeseries values)
//! - **Metrics**: per-scrape sample channel and text exposition encoding
//! - **Server**: Axum router serving the landing page and telemetry path
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cdh_exporter::{
//!     AppConfig, CollectorRegistry, HealthCollector, HttpTransport, TimeseriesCollector,
//!     Transport,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
//!     "Basic YWRtaW46YWRtaW4=",
//!     config.upstream.request_timeout,
//! )?);
//!
//! let mut registry = CollectorRegistry::new(&config.upstream.namespace)?;
//! registry.register(HealthCollector::new(&config.upstream, transport.clone())?);
//! registry.register(TimeseriesCollector::discover(&config.upstream, transport).await?);
//!
//! let exposition = registry.gather().await?;
//! println!("{exposition}");
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod metrics;
pub mod server;
pub mod upstream;

pub use collector::{
    Collector, CollectorError, CollectorRegistry, HealthCollector, HealthStatus,
    TimeseriesCollector,
};
pub use config::{AppConfig, ConfigError, LogConfig, LogFormat, ServerConfig, UpstreamConfig};
pub use metrics::{ErrorKind, ExporterMetrics, MetricDesc, MetricSink, Sample};
pub use upstream::{Endpoints, HttpMethod, HttpTransport, Transport, TransportError, UpstreamRequest};
