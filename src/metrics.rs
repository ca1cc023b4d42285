//! Metrics Layer
//!
//! Per-scrape sample flow from collectors to the text exposition:
//!
//! - [`MetricDesc`]: validated metric family descriptor (name, help, label names)
//! - [`MetricSink`]: channel handle collectors emit [`Sample`]s and errors through
//! - [`ExporterMetrics`]: the exporter's own long-lived scrape error and duration metrics
//! - [`encode`]: turns drained samples into the Prometheus text format

mod desc;
mod encoder;
mod exporter;
mod sink;

pub use desc::MetricDesc;
pub use encoder::{ExpositionError, TEXT_CONTENT_TYPE, encode};
pub use exporter::{ErrorKind, ExporterMetrics};
pub(crate) use exporter::METRIC_NAMES as EXPORTER_METRIC_NAMES;
pub use sink::{MetricSink, Sample};
