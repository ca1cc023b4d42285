//! The exporter's own metrics.
//!
//! Upstream failures never fail a scrape; they thin out the affected metric
//! families instead. These long-lived series let operators tell an empty
//! family apart from a broken collector.

use std::time::Duration;

use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, IntCounterVec, Opts, Registry};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};

/// Unprefixed names of the exporter's own families.
pub(crate) const METRIC_NAMES: [&str; 2] = [
    "exporter_scrape_errors_total",
    "exporter_scrape_duration_seconds",
];

/// Classification of a swallowed scrape failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Transport failure or empty upstream body.
    EmptyResponse,
    /// Payload with an unexpected shape or a missing field.
    Decode,
    /// Timeseries metric name absent from the discovered schema.
    SchemaMiss,
    /// Health token outside the known vocabulary.
    UnknownStatus,
    /// Queued scrape gave up waiting for the collector's scrape lock.
    LockTimeout,
}

/// Scrape error counter and scrape duration gauge, labeled per collector.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    scrape_errors: IntCounterVec,
    scrape_duration: GaugeVec,
}

impl ExporterMetrics {
    /// Create the exporter metrics under `namespace`.
    ///
    /// # Errors
    /// Returns a Prometheus error if the namespace yields invalid metric names.
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let scrape_errors = IntCounterVec::new(
            Opts::new(
                "scrape_errors_total",
                "Upstream failures swallowed during scrapes, by collector and kind",
            )
            .namespace(namespace)
            .subsystem("exporter"),
            &["collector", "kind"],
        )?;
        let scrape_duration = GaugeVec::new(
            Opts::new(
                "scrape_duration_seconds",
                "Duration of the last scrape of each collector",
            )
            .namespace(namespace)
            .subsystem("exporter"),
            &["collector"],
        )?;

        registry.register(Box::new(scrape_errors.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;

        Ok(Self {
            registry,
            scrape_errors,
            scrape_duration,
        })
    }

    /// Expose every error kind for `collector` at zero.
    pub fn init_collector(&self, collector: &str) {
        for kind in ErrorKind::iter() {
            self.scrape_errors
                .with_label_values(&[collector, kind.as_ref()])
                .inc_by(0);
        }
    }

    pub fn record_error(&self, collector: &str, kind: ErrorKind) {
        self.scrape_errors
            .with_label_values(&[collector, kind.as_ref()])
            .inc();
    }

    pub fn observe_duration(&self, collector: &str, elapsed: Duration) {
        self.scrape_duration
            .with_label_values(&[collector])
            .set(elapsed.as_secs_f64());
    }

    /// Current error count for `collector` and `kind`.
    pub fn error_count(&self, collector: &str, kind: ErrorKind) -> u64 {
        self.scrape_errors
            .with_label_values(&[collector, kind.as_ref()])
            .get()
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl std::fmt::Debug for ExporterMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterMetrics").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Encoder;

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(ErrorKind::EmptyResponse.as_ref(), "empty_response");
        assert_eq!(ErrorKind::SchemaMiss.as_ref(), "schema_miss");
        assert_eq!(ErrorKind::LockTimeout.to_string(), "lock_timeout");
        assert_eq!(ErrorKind::iter().count(), 5);
    }

    #[test]
    fn test_record_and_read_errors() {
        let metrics = ExporterMetrics::new("cdh").unwrap();
        metrics.init_collector("health");
        assert_eq!(metrics.error_count("health", ErrorKind::Decode), 0);

        metrics.record_error("health", ErrorKind::Decode);
        metrics.record_error("health", ErrorKind::Decode);
        assert_eq!(metrics.error_count("health", ErrorKind::Decode), 2);
        assert_eq!(metrics.error_count("health", ErrorKind::SchemaMiss), 0);
    }

    #[test]
    fn test_gather_encodes_exporter_series() {
        let metrics = ExporterMetrics::new("cdh").unwrap();
        metrics.init_collector("timeseries");
        metrics.observe_duration("timeseries", Duration::from_millis(250));

        let mut buffer = Vec::new();
        prometheus::TextEncoder::new()
            .encode(&metrics.gather(), &mut buffer)
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains(
            "cdh_exporter_scrape_errors_total{collector=\"timeseries\",kind=\"decode\"} 0"
        ));
        assert!(
            text.contains("cdh_exporter_scrape_duration_seconds{collector=\"timeseries\"} 0.25")
        );
        for name in METRIC_NAMES {
            assert!(text.contains(&format!("# TYPE cdh_{name} ")), "{name} not exported");
        }
    }
}
