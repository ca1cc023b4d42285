//! Service and role health collector.
//!
//! Walks the health tree of every monitored component on each scrape and
//! exports each summary and health check as an ordinal gauge.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use url::Url;

use crate::collector::status::HealthStatus;
use crate::collector::traits::lock_scrape;
use crate::collector::{Collector, CollectorError};
use crate::config::UpstreamConfig;
use crate::metrics::{ErrorKind, MetricDesc, MetricSink};
use crate::upstream::model::{HealthCheck, Role, Service, decode_items};
use crate::upstream::{Endpoints, Transport, UpstreamRequest};

/// Collector name used in logs and exporter metrics.
const COLLECTOR_NAME: &str = "health";

/// Unprefixed names of the four health families.
pub(crate) const METRIC_NAMES: [&str; 4] = [
    "service_state",
    "service_state_summary",
    "service_role_state",
    "service_role_state_summary",
];

const SERVICE_STATE_LABELS: [&str; 3] = ["service_type", "health_check_name", "explanation"];
const SERVICE_SUMMARY_LABELS: [&str; 1] = ["service_type"];
const ROLE_STATE_LABELS: [&str; 7] = [
    "role_type",
    "cluster_name",
    "host_name",
    "service_type",
    "health_check_name",
    "explanation",
    "role_name",
];
const ROLE_SUMMARY_LABELS: [&str; 5] = [
    "role_type",
    "cluster_name",
    "host_name",
    "role_name",
    "service_type",
];

/// The four gauge families this collector emits.
#[derive(Debug)]
struct HealthDescs {
    service_state: Arc<MetricDesc>,
    service_state_summary: Arc<MetricDesc>,
    role_state: Arc<MetricDesc>,
    role_state_summary: Arc<MetricDesc>,
}

impl HealthDescs {
    fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let desc = |name: &str, subject: &str, labels: &[&str]| {
            MetricDesc::new(
                namespace,
                name,
                &format!("{subject}, {}", HealthStatus::LEGEND),
                labels,
            )
            .map(Arc::new)
        };

        Ok(Self {
            service_state: desc(
                METRIC_NAMES[0],
                "Service health check status",
                &SERVICE_STATE_LABELS,
            )?,
            service_state_summary: desc(
                METRIC_NAMES[1],
                "Service summary health status",
                &SERVICE_SUMMARY_LABELS,
            )?,
            role_state: desc(
                METRIC_NAMES[2],
                "Service role health check status",
                &ROLE_STATE_LABELS,
            )?,
            role_state_summary: desc(
                METRIC_NAMES[3],
                "Service role summary health status",
                &ROLE_SUMMARY_LABELS,
            )?,
        })
    }
}

/// Service and role health collector.
///
/// One scrape issues two passes over the configured components: first the
/// service resources, then the role lists. Each component's and each role's
/// metrics are emitted all-or-nothing.
pub struct HealthCollector {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    cluster_name: String,
    components: Vec<String>,
    max_concurrent_fetches: usize,
    scrape_timeout: Duration,
    descs: HealthDescs,
    scrape_lock: Mutex<()>,
}

impl HealthCollector {
    /// Create a health collector for the components in `config`.
    ///
    /// # Errors
    /// Returns `CollectorError::Address` for an unusable upstream address or
    /// `CollectorError::Descriptor` for an invalid metric namespace.
    pub fn new(
        config: &UpstreamConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, CollectorError> {
        Ok(Self {
            transport,
            endpoints: Endpoints::new(&config.address, &config.api_version)?,
            cluster_name: config.cluster_name.clone(),
            components: config.components.clone(),
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            scrape_timeout: config.scrape_timeout,
            descs: HealthDescs::new(&config.namespace)?,
            scrape_lock: Mutex::new(()),
        })
    }

    /// Build one request per component, in configured order.
    fn requests(&self, url_for: impl Fn(&str) -> Url) -> Vec<(String, Url)> {
        self.components
            .iter()
            .map(|component| (component.clone(), url_for(component)))
            .collect()
    }

    /// Fetch every request, preserving request order.
    async fn fetch_all(&self, requests: Vec<(String, Url)>) -> Vec<(String, Vec<u8>)> {
        stream::iter(requests)
            .map(|(component, url)| {
                let transport = Arc::clone(&self.transport);
                async move {
                    let body = transport.fetch(UpstreamRequest::get(url)).await;
                    (component, body)
                }
            })
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await
    }

    fn status(&self, sink: &MetricSink, token: &str) -> f64 {
        let status = HealthStatus::from_token(token);
        if status == HealthStatus::Unknown {
            sink.record_error(ErrorKind::UnknownStatus);
        }
        status.ordinal()
    }

    fn emit_service(&self, sink: &MetricSink, component: &str, body: &[u8]) {
        let service = match Service::decode(body) {
            Ok(service) => service,
            Err(e) => {
                tracing::warn!(component, error = %e, "Skipping service health");
                sink.record_error(e.kind());
                return;
            }
        };

        sink.emit(
            &self.descs.service_state_summary,
            self.status(sink, &service.health_summary),
            vec![service.service_type.clone()],
        );

        for HealthCheck {
            name,
            summary,
            explanation,
        } in &service.health_checks
        {
            sink.emit(
                &self.descs.service_state,
                self.status(sink, summary),
                vec![
                    service.service_type.clone(),
                    name.clone(),
                    explanation.clone(),
                ],
            );
        }
    }

    fn emit_roles(&self, sink: &MetricSink, component: &str, body: &[u8]) {
        let items = match decode_items(body) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(component, error = %e, "Skipping role health");
                sink.record_error(e.kind());
                return;
            }
        };

        for item in items {
            match Role::from_value(item) {
                Ok(role) => self.emit_role(sink, &role),
                Err(e) => {
                    tracing::warn!(component, error = %e, "Skipping malformed role");
                    sink.record_error(e.kind());
                }
            }
        }
    }

    fn emit_role(&self, sink: &MetricSink, role: &Role) {
        sink.emit(
            &self.descs.role_state_summary,
            self.status(sink, &role.health_summary),
            vec![
                role.role_type.clone(),
                role.cluster_name.clone(),
                role.host_name.clone(),
                role.name.clone(),
                role.service_type.clone(),
            ],
        );

        for check in &role.health_checks {
            sink.emit(
                &self.descs.role_state,
                self.status(sink, &check.summary),
                vec![
                    role.role_type.clone(),
                    role.cluster_name.clone(),
                    role.host_name.clone(),
                    role.service_type.clone(),
                    check.name.clone(),
                    check.explanation.clone(),
                    role.name.clone(),
                ],
            );
        }
    }
}

impl std::fmt::Debug for HealthCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCollector")
            .field("endpoints", &self.endpoints)
            .field("cluster_name", &self.cluster_name)
            .field("components", &self.components)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Collector for HealthCollector {
    fn name(&self) -> &str {
        COLLECTOR_NAME
    }

    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            Arc::clone(&self.descs.service_state),
            Arc::clone(&self.descs.service_state_summary),
            Arc::clone(&self.descs.role_state),
            Arc::clone(&self.descs.role_state_summary),
        ]
    }

    async fn collect(&self, sink: &MetricSink) -> Result<(), CollectorError> {
        let _guard = lock_scrape(&self.scrape_lock, self.scrape_timeout).await?;
        let cluster = self.cluster_name.as_str();

        let services = self
            .fetch_all(self.requests(|component| self.endpoints.service(cluster, component)))
            .await;
        for (component, body) in &services {
            self.emit_service(sink, component, body);
        }

        let roles = self
            .fetch_all(self.requests(|component| self.endpoints.roles(cluster, component)))
            .await;
        for (component, body) in &roles {
            self.emit_roles(sink, component, body);
        }

        tracing::debug!(
            components = self.components.len(),
            "Health scrape complete"
        );
        Ok(())
    }
}
