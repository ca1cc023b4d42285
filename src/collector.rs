//! Collector Layer
//!
//! Scrape-driven collectors that translate upstream API state into gauge
//! samples. Each collector serializes its own scrapes; different collectors
//! run concurrently.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing scrape-time collectors
//! - [`HealthCollector`]: Service and role health checks as ordinal gauges
//! - [`TimeseriesCollector`]: Schema-driven current timeseries values
//! - [`CollectorRegistry`]: Fans a scrape out to every collector and encodes the result
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cdh_exporter::{CollectorRegistry, HealthCollector, HttpTransport, UpstreamConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = UpstreamConfig::default();
//! let transport = Arc::new(HttpTransport::new("Basic YWRtaW46YWRtaW4=", config.request_timeout)?);
//!
//! let mut registry = CollectorRegistry::new(&config.namespace)?;
//! registry.register(HealthCollector::new(&config, transport)?);
//! let text = registry.gather().await?;
//! # Ok(())
//! # }
//! ```

pub mod health;
mod registry;
mod status;
pub mod timeseries;
mod traits;

pub use health::HealthCollector;
pub use registry::CollectorRegistry;
pub use status::{HealthStatus, ordinal};
pub use timeseries::TimeseriesCollector;
pub use traits::{Collector, CollectorError};
