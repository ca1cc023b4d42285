//! Prometheus text exposition of drained samples.

use std::collections::HashMap;
use std::string::FromUtf8Error;

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

use super::sink::Sample;

/// Content type of the text exposition format.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors raised while encoding a scrape.
#[derive(Debug, Error)]
pub enum ExpositionError {
    /// Prometheus rejected a family or failed to encode.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    /// Encoder produced invalid UTF-8.
    #[error("invalid UTF-8 in exposition: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Encode `samples` plus pre-gathered `extra` families as text.
///
/// Samples are grouped into one gauge family per descriptor. A family whose
/// name collides with one already registered is skipped with a warning, as
/// is a sample whose labels the family rejects.
pub fn encode(samples: Vec<Sample>, extra: Vec<MetricFamily>) -> Result<String, ExpositionError> {
    let registry = Registry::new();
    let mut families: HashMap<String, Option<GaugeVec>> = HashMap::new();

    for sample in samples {
        let desc = &sample.desc;
        let family = families
            .entry(desc.fq_name().to_string())
            .or_insert_with(|| {
                let label_names: Vec<&str> =
                    desc.label_names().iter().map(String::as_str).collect();
                let family = GaugeVec::new(Opts::new(desc.fq_name(), desc.help()), &label_names)
                    .and_then(|family| {
                        registry.register(Box::new(family.clone()))?;
                        Ok(family)
                    });
                match family {
                    Ok(family) => Some(family),
                    Err(e) => {
                        tracing::warn!(metric = %desc.fq_name(), error = %e, "Skipping metric family");
                        None
                    }
                }
            });

        let Some(family) = family else {
            continue;
        };

        let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        match family.get_metric_with_label_values(&values) {
            Ok(gauge) => gauge.set(sample.value),
            Err(e) => {
                tracing::warn!(metric = %desc.fq_name(), error = %e, "Skipping sample");
            }
        }
    }

    let mut gathered = registry.gather();
    gathered.extend(extra);

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&gathered, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
