//! Collector registry for scrape-time collection.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;

use crate::collector::Collector;
use crate::metrics::{ExporterMetrics, ExpositionError, MetricDesc, MetricSink, Sample, encode};

/// Registry running every registered collector on each scrape.
///
/// Collectors run concurrently; each serializes its own scrapes. Samples are
/// buffered for the duration of one scrape and encoded together with the
/// exporter's own metrics.
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
    metrics: ExporterMetrics,
}

impl CollectorRegistry {
    /// Create an empty registry whose exporter metrics use `namespace`.
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        Ok(Self {
            collectors: Vec::new(),
            metrics: ExporterMetrics::new(namespace)?,
        })
    }

    /// Register a collector.
    pub fn register<C: Collector>(&mut self, collector: C) {
        let name = collector.name().to_string();
        self.metrics.init_collector(&name);
        tracing::info!(
            collector = %name,
            metrics = collector.describe().len(),
            "Collector registered"
        );
        self.collectors.push(Arc::new(collector));
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Descriptors of every registered collector, in registration order.
    pub fn describe(&self) -> Vec<Arc<MetricDesc>> {
        self.collectors.iter().flat_map(|c| c.describe()).collect()
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }

    /// Run one scrape of every collector and encode the result.
    ///
    /// A collector that fails contributes no samples; the scrape as a whole
    /// still succeeds.
    pub async fn gather(&self) -> Result<String, ExpositionError> {
        let samples = self.collect_samples().await;
        encode(samples, self.metrics.gather())
    }

    /// Run one scrape of every collector and return the raw samples.
    pub async fn collect_samples(&self) -> Vec<Sample> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        join_all(self.collectors.iter().map(|collector| {
            let sink = MetricSink::new(collector.name(), tx.clone(), self.metrics.clone());
            async move { run_collection(collector.as_ref(), &sink).await }
        }))
        .await;
        drop(tx);

        let mut samples = Vec::new();
        while let Some(sample) = rx.recv().await {
            samples.push(sample);
        }
        samples
    }
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.collectors.iter().map(|c| c.name()).collect();
        f.debug_struct("CollectorRegistry")
            .field("collectors", &names)
            .finish_non_exhaustive()
    }
}

/// Execute a single collection and record its outcome.
async fn run_collection(collector: &dyn Collector, sink: &MetricSink) {
    let name = collector.name();
    let start = Instant::now();
    tracing::debug!(collector = %name, "Running collection");

    let result = collector.collect(sink).await;
    let elapsed = start.elapsed();
    sink.metrics().observe_duration(name, elapsed);

    match result {
        Ok(()) => {
            tracing::debug!(
                collector = %name,
                duration_ms = elapsed.as_millis(),
                "Collection succeeded"
            );
        }
        Err(e) => {
            tracing::error!(collector = %name, error = %e, "Collection failed");
            if let Some(kind) = e.kind() {
                sink.record_error(kind);
            }
        }
    }
}
