//! Schema-driven timeseries collector.
//!
//! The metric schema is discovered once when the collector is built. Every
//! scrape then queries the current SERVICE and ROLE values and exports the
//! series whose metric name the schema declares.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::collector::health::HEALTH_METRIC_NAMES;
use crate::collector::traits::lock_scrape;
use crate::collector::{Collector, CollectorError};
use crate::config::UpstreamConfig;
use crate::metrics::{EXPORTER_METRIC_NAMES, ErrorKind, MetricDesc, MetricSink};
use crate::upstream::model::{
    DecodeError, MetricSchemaEntry, TimeseriesAttributes, TimeseriesSample, decode_items,
};
use crate::upstream::{Endpoints, TimeseriesCategory, TimeseriesQuery, Transport, UpstreamRequest};

/// Collector name used in logs and exporter metrics.
const COLLECTOR_NAME: &str = "timeseries";

/// Query order within one scrape.
const CATEGORIES: [TimeseriesCategory; 2] = [TimeseriesCategory::Service, TimeseriesCategory::Role];

/// Timeseries collector backed by a fixed metric schema.
pub struct TimeseriesCollector {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    scrape_timeout: Duration,
    metrics: HashMap<String, Arc<MetricDesc>>,
    scrape_lock: Mutex<()>,
}

impl TimeseriesCollector {
    /// Discover the metric schema and build the collector.
    ///
    /// An unreachable or malformed schema listing leaves the collector with
    /// no metrics; it still scrapes but exports nothing.
    ///
    /// # Errors
    /// Returns `CollectorError::Address` for an unusable upstream address.
    pub async fn discover(
        config: &UpstreamConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CollectorError> {
        let endpoints = Endpoints::new(&config.address, &config.api_version)?;
        let body = transport
            .fetch(UpstreamRequest::get(endpoints.timeseries_schema()))
            .await;

        let schema = match decode_items(&body) {
            Ok(items) => items
                .into_iter()
                .filter_map(|item| match MetricSchemaEntry::from_value(item) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping malformed schema entry");
                        None
                    }
                })
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, "Timeseries schema unavailable, no metrics registered");
                Vec::new()
            }
        };

        Self::from_schema(config, transport, schema)
    }

    /// Build the collector from an already fetched schema.
    ///
    /// Duplicate names keep their first entry. Names that are not valid
    /// metric names, or that match a health or exporter family, are dropped.
    pub fn from_schema(
        config: &UpstreamConfig,
        transport: Arc<dyn Transport>,
        schema: Vec<MetricSchemaEntry>,
    ) -> Result<Self, CollectorError> {
        let mut metrics = HashMap::with_capacity(schema.len());
        for entry in schema {
            if metrics.contains_key(&entry.name) {
                tracing::debug!(metric = %entry.name, "Duplicate schema entry ignored");
                continue;
            }
            if is_reserved(&entry.name) {
                tracing::warn!(metric = %entry.name, "Dropping schema metric that shadows a built-in family");
                continue;
            }
            match MetricDesc::new(
                &config.namespace,
                &entry.name,
                &entry.description,
                &TimeseriesAttributes::LABEL_NAMES,
            ) {
                Ok(desc) => {
                    metrics.insert(entry.name, Arc::new(desc));
                }
                Err(e) => {
                    tracing::warn!(metric = %entry.name, error = %e, "Dropping invalid schema metric");
                }
            }
        }

        tracing::info!(metrics = metrics.len(), "Timeseries schema loaded");

        Ok(Self {
            transport,
            endpoints: Endpoints::new(&config.address, &config.api_version)?,
            scrape_timeout: config.scrape_timeout,
            metrics,
            scrape_lock: Mutex::new(()),
        })
    }

    /// Number of metrics the schema declared.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    async fn query(&self, category: TimeseriesCategory) -> Vec<u8> {
        let body = match TimeseriesQuery::new(category, Utc::now()).to_body() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(%category, error = %e, "Failed to encode timeseries query");
                return Vec::new();
            }
        };
        self.transport
            .fetch(UpstreamRequest::post(self.endpoints.timeseries(), body))
            .await
    }

    fn emit_category(&self, sink: &MetricSink, category: TimeseriesCategory, body: &[u8]) {
        let items = match decode_items(body) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(%category, error = %e, "Skipping timeseries response");
                sink.record_error(e.kind());
                return;
            }
        };

        for item in items {
            let series = match TimeseriesSample::series_of(item) {
                Ok(series) => series,
                Err(e) => {
                    record_decode_error(sink, category, &e);
                    continue;
                }
            };

            for value in series {
                match TimeseriesSample::from_value(value, category) {
                    Ok(Some(sample)) => self.emit_sample(sink, sample),
                    Ok(None) => {}
                    Err(e) => record_decode_error(sink, category, &e),
                }
            }
        }
    }

    fn emit_sample(&self, sink: &MetricSink, sample: TimeseriesSample) {
        let Some(desc) = self.metrics.get(&sample.metric_name) else {
            tracing::debug!(metric = %sample.metric_name, "Metric not in schema");
            sink.record_error(ErrorKind::SchemaMiss);
            return;
        };
        sink.emit(desc, sample.value, sample.attributes.label_values());
    }
}

/// Whether `name` is already taken by a health or exporter family.
fn is_reserved(name: &str) -> bool {
    HEALTH_METRIC_NAMES
        .iter()
        .chain(EXPORTER_METRIC_NAMES.iter())
        .any(|reserved| *reserved == name)
}

fn record_decode_error(sink: &MetricSink, category: TimeseriesCategory, e: &DecodeError) {
    tracing::warn!(%category, error = %e, "Skipping malformed timeseries");
    sink.record_error(e.kind());
}

impl std::fmt::Debug for TimeseriesCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeseriesCollector")
            .field("endpoints", &self.endpoints)
            .field("metrics", &self.metrics.len())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Collector for TimeseriesCollector {
    fn name(&self) -> &str {
        COLLECTOR_NAME
    }

    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        let mut descs: Vec<Arc<MetricDesc>> = self.metrics.values().cloned().collect();
        descs.sort_by(|a, b| a.fq_name().cmp(b.fq_name()));
        descs
    }

    async fn collect(&self, sink: &MetricSink) -> Result<(), CollectorError> {
        let _guard = lock_scrape(&self.scrape_lock, self.scrape_timeout).await?;

        for category in CATEGORIES {
            let body = self.query(category).await;
            self.emit_category(sink, category, &body);
        }
        Ok(())
    }
}
