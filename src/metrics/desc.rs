//! Metric family descriptors.

use std::collections::HashMap;

use prometheus::core::Desc;

/// Descriptor of one gauge family: fully-qualified name, help and label names.
///
/// Construction runs the same validation the Prometheus registry applies, so
/// a descriptor that exists can always be turned into a metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    fq_name: String,
    help: String,
    label_names: Vec<String>,
}

impl MetricDesc {
    /// Create a descriptor named `{namespace}_{name}`.
    ///
    /// An empty `help` falls back to the metric name.
    ///
    /// # Errors
    /// Returns a Prometheus error if the name or a label name is invalid.
    pub fn new(
        namespace: &str,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<Self, prometheus::Error> {
        let fq_name = if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}_{name}")
        };
        let help = if help.trim().is_empty() {
            name.to_string()
        } else {
            help.to_string()
        };
        let label_names: Vec<String> = label_names.iter().map(|l| l.to_string()).collect();

        Desc::new(
            fq_name.clone(),
            help.clone(),
            label_names.clone(),
            HashMap::new(),
        )?;

        Ok(Self {
            fq_name,
            help,
            label_names,
        })
    }

    /// Fully-qualified metric name.
    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desc_new() {
        let desc = MetricDesc::new("cdh", "cpu_user", "CPU", &["entity_name"]).unwrap();
        assert_eq!(desc.fq_name(), "cdh_cpu_user");
        assert_eq!(desc.help(), "CPU");
        assert_eq!(desc.label_names(), ["entity_name".to_string()]);
    }

    #[test]
    fn test_desc_empty_help_falls_back_to_name() {
        let desc = MetricDesc::new("cdh", "cpu_user", " ", &[]).unwrap();
        assert_eq!(desc.help(), "cpu_user");
    }

    #[test]
    fn test_desc_without_namespace() {
        let desc = MetricDesc::new("", "up", "Exporter up", &[]).unwrap();
        assert_eq!(desc.fq_name(), "up");
    }

    #[test]
    fn test_desc_rejects_invalid_names() {
        assert!(MetricDesc::new("cdh", "cpu-user", "CPU", &[]).is_err());
        assert!(MetricDesc::new("cdh", "cpu_user", "CPU", &["bad-label"]).is_err());
    }
}
