//! Per-scrape sample channel.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::desc::MetricDesc;
use super::exporter::{ErrorKind, ExporterMetrics};

/// One gauge reading emitted during a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub desc: Arc<MetricDesc>,
    pub value: f64,
    pub label_values: Vec<String>,
}

impl Sample {
    /// Value of the label `name`, if the descriptor declares it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names()
            .iter()
            .position(|label| label == name)
            .and_then(|idx| self.label_values.get(idx))
            .map(String::as_str)
    }
}

/// Write handle a collector receives for one scrape.
///
/// Samples go into an unbounded channel drained by the exposition encoder
/// once every collector has finished. Swallowed failures are counted against
/// the owning collector.
#[derive(Clone)]
pub struct MetricSink {
    collector: String,
    tx: mpsc::UnboundedSender<Sample>,
    metrics: ExporterMetrics,
}

impl MetricSink {
    pub fn new(
        collector: impl Into<String>,
        tx: mpsc::UnboundedSender<Sample>,
        metrics: ExporterMetrics,
    ) -> Self {
        Self {
            collector: collector.into(),
            tx,
            metrics,
        }
    }

    /// Create a sink together with the receiving end of its channel.
    pub fn channel(
        collector: impl Into<String>,
        metrics: ExporterMetrics,
    ) -> (Self, mpsc::UnboundedReceiver<Sample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(collector, tx, metrics), rx)
    }

    /// Name of the collector this sink belongs to.
    pub fn collector(&self) -> &str {
        &self.collector
    }

    /// Emit a gauge reading for `desc`.
    ///
    /// Readings whose label count does not match the descriptor are dropped.
    pub fn emit(&self, desc: &Arc<MetricDesc>, value: f64, label_values: Vec<String>) {
        if label_values.len() != desc.label_names().len() {
            tracing::warn!(
                collector = %self.collector,
                metric = %desc.fq_name(),
                expected = desc.label_names().len(),
                actual = label_values.len(),
                "Dropping sample with mismatched label count"
            );
            return;
        }

        let sample = Sample {
            desc: Arc::clone(desc),
            value,
            label_values,
        };
        if self.tx.send(sample).is_err() {
            tracing::debug!(collector = %self.collector, "Sample receiver dropped");
        }
    }

    /// Count a swallowed failure against this sink's collector.
    pub fn record_error(&self, kind: ErrorKind) {
        self.metrics.record_error(&self.collector, kind);
    }

    pub fn metrics(&self) -> &ExporterMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for MetricSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricSink")
            .field("collector", &self.collector)
            .finish_non_exhaustive()
    }
}
