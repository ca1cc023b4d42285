//! Upstream wire records and validated domain types.
//!
//! Wire records (`Api*`) mirror the JSON the API returns with every field
//! optional, so decoding never fails on a missing key. Conversion into the
//! domain types then checks the fields the exporter actually needs and
//! reports the first one that is absent.
//!
//! List responses are decoded element by element: a malformed element is
//! reported on its own and never spoils its siblings.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::metrics::ErrorKind;

/// Errors raised while decoding an upstream payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The upstream returned nothing (transport failure or empty body).
    #[error("empty response body")]
    Empty,

    /// The payload is not valid JSON or has an unexpected shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

impl DecodeError {
    /// Scrape error kind recorded for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty => ErrorKind::EmptyResponse,
            Self::Json(_) | Self::MissingField(_) => ErrorKind::Decode,
        }
    }
}

/// Granularity of a timeseries query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeseriesCategory {
    Service,
    Role,
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, DecodeError> {
    if body.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(serde_json::from_slice(body)?)
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, DecodeError> {
    value.ok_or(DecodeError::MissingField(field))
}

// =============================================================================
// Wire records
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiList {
    items: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiHealthCheck {
    name: Option<String>,
    summary: Option<String>,
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiService {
    #[serde(rename = "type")]
    service_type: Option<String>,
    health_summary: Option<String>,
    health_checks: Option<Vec<ApiHealthCheck>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiServiceRef {
    cluster_name: Option<String>,
    service_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiHostRef {
    hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRole {
    #[serde(rename = "type")]
    role_type: Option<String>,
    name: Option<String>,
    health_summary: Option<String>,
    health_checks: Option<Vec<ApiHealthCheck>>,
    service_ref: Option<ApiServiceRef>,
    host_ref: Option<ApiHostRef>,
}

#[derive(Debug, Deserialize)]
struct ApiSchemaEntry {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTimeseriesResponse {
    time_series: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiTimeseries {
    metadata: Option<ApiTimeseriesMetadata>,
    data: Option<Vec<ApiDataPoint>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTimeseriesMetadata {
    metric_name: Option<String>,
    attributes: Option<ApiAttributes>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttributes {
    entity_name: Option<String>,
    service_type: Option<String>,
    category: Option<String>,
    hostname: Option<String>,
    role_type: Option<String>,
    service_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiDataPoint {
    timestamp: Option<String>,
    value: Option<f64>,
}

/// Decode a `{"items": [...]}` envelope into its raw elements.
pub fn decode_items(body: &[u8]) -> Result<Vec<serde_json::Value>, DecodeError> {
    let list: ApiList = decode_body(body)?;
    require(list.items, "items")
}

// =============================================================================
// Health
// =============================================================================

/// A single health check reported by a service or role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub name: String,
    pub summary: String,
    pub explanation: String,
}

impl HealthCheck {
    fn from_api(check: ApiHealthCheck) -> Result<Self, DecodeError> {
        Ok(Self {
            name: require(check.name, "healthChecks[].name")?,
            summary: require(check.summary, "healthChecks[].summary")?,
            explanation: check.explanation.unwrap_or_default(),
        })
    }
}

fn health_checks(checks: Option<Vec<ApiHealthCheck>>) -> Result<Vec<HealthCheck>, DecodeError> {
    checks
        .unwrap_or_default()
        .into_iter()
        .map(HealthCheck::from_api)
        .collect()
}

/// A monitored service with its aggregate and per-check health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub service_type: String,
    pub health_summary: String,
    pub health_checks: Vec<HealthCheck>,
}

impl Service {
    /// Decode a service resource body.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let service: ApiService = decode_body(body)?;
        Ok(Self {
            service_type: require(service.service_type, "type")?,
            health_summary: require(service.health_summary, "healthSummary")?,
            health_checks: health_checks(service.health_checks)?,
        })
    }
}

/// A role instance of a service, placed on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub role_type: String,
    pub name: String,
    pub cluster_name: String,
    pub host_name: String,
    pub service_type: String,
    pub health_summary: String,
    pub health_checks: Vec<HealthCheck>,
}

impl Role {
    /// Decode one element of a role list.
    pub fn from_value(value: serde_json::Value) -> Result<Self, DecodeError> {
        let role: ApiRole = serde_json::from_value(value)?;
        let service_ref = require(role.service_ref, "serviceRef")?;
        let host_ref = require(role.host_ref, "hostRef")?;

        Ok(Self {
            role_type: require(role.role_type, "type")?,
            name: require(role.name, "name")?,
            cluster_name: require(service_ref.cluster_name, "serviceRef.clusterName")?,
            host_name: require(host_ref.hostname, "hostRef.hostname")?,
            service_type: require(service_ref.service_type, "serviceRef.serviceType")?,
            health_summary: require(role.health_summary, "healthSummary")?,
            health_checks: health_checks(role.health_checks)?,
        })
    }
}

// =============================================================================
// Timeseries
// =============================================================================

/// One entry of the timeseries schema listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSchemaEntry {
    pub name: String,
    pub description: String,
}

impl MetricSchemaEntry {
    /// Decode one element of the schema listing.
    pub fn from_value(value: serde_json::Value) -> Result<Self, DecodeError> {
        let entry: ApiSchemaEntry = serde_json::from_value(value)?;
        Ok(Self {
            name: require(entry.name, "name")?,
            description: entry.description.unwrap_or_default(),
        })
    }
}

/// Labels carried by a timeseries sample, in exposition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeseriesAttributes {
    pub entity_name: String,
    pub service_type: String,
    pub category: String,
    pub hostname: String,
    pub role_type: String,
    pub service_name: String,
}

impl TimeseriesAttributes {
    /// Label names matching [`TimeseriesAttributes::label_values`].
    pub const LABEL_NAMES: [&'static str; 6] = [
        "entity_name",
        "service_type",
        "category",
        "hostname",
        "role_type",
        "service_name",
    ];

    fn from_api(
        attributes: ApiAttributes,
        category: TimeseriesCategory,
    ) -> Result<Self, DecodeError> {
        // Service-scoped entities have no host or role at this granularity.
        let (hostname, role_type) = match category {
            TimeseriesCategory::Service => (String::new(), String::new()),
            TimeseriesCategory::Role => (
                require(attributes.hostname, "attributes.hostname")?,
                require(attributes.role_type, "attributes.roleType")?,
            ),
        };

        Ok(Self {
            entity_name: require(attributes.entity_name, "attributes.entityName")?,
            service_type: require(attributes.service_type, "attributes.serviceType")?,
            category: require(attributes.category, "attributes.category")?,
            hostname,
            role_type,
            service_name: require(attributes.service_name, "attributes.serviceName")?,
        })
    }

    /// Label values in [`TimeseriesAttributes::LABEL_NAMES`] order.
    pub fn label_values(&self) -> Vec<String> {
        vec![
            self.entity_name.clone(),
            self.service_type.clone(),
            self.category.clone(),
            self.hostname.clone(),
            self.role_type.clone(),
            self.service_name.clone(),
        ]
    }
}

/// The current value of one metric for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeseriesSample {
    pub metric_name: String,
    pub attributes: TimeseriesAttributes,
    pub value: f64,
}

impl TimeseriesSample {
    /// Decode the raw `timeSeries` list of one element of a timeseries response.
    pub fn series_of(item: serde_json::Value) -> Result<Vec<serde_json::Value>, DecodeError> {
        let response: ApiTimeseriesResponse = serde_json::from_value(item)?;
        require(response.time_series, "timeSeries")
    }

    /// Decode one series into its current sample.
    ///
    /// Returns `Ok(None)` when the series carries no data points in the window.
    pub fn from_value(
        value: serde_json::Value,
        category: TimeseriesCategory,
    ) -> Result<Option<Self>, DecodeError> {
        let series: ApiTimeseries = serde_json::from_value(value)?;
        let points = series.data.unwrap_or_default();
        if points.is_empty() {
            return Ok(None);
        }

        let metadata = require(series.metadata, "metadata")?;
        let metric_name = require(metadata.metric_name, "metadata.metricName")?;
        let attributes = TimeseriesAttributes::from_api(
            require(metadata.attributes, "metadata.attributes")?,
            category,
        )?;
        let value = latest_value(&points).ok_or(DecodeError::MissingField("data[].value"))?;

        Ok(Some(Self {
            metric_name,
            attributes,
            value,
        }))
    }
}

/// Pick the most recent reading among `points`.
///
/// When every valued point carries a parseable timestamp the newest one wins
/// (later position breaks ties); otherwise the last valued point in response
/// order is used.
fn latest_value(points: &[ApiDataPoint]) -> Option<f64> {
    let valued: Vec<(Option<DateTime<FixedOffset>>, f64)> = points
        .iter()
        .filter_map(|point| {
            let value = point.value?;
            let ts = point
                .timestamp
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok());
            Some((ts, value))
        })
        .collect();

    if valued.iter().all(|(ts, _)| ts.is_some()) {
        valued
            .iter()
            .max_by_key(|(ts, _)| *ts)
            .map(|(_, value)| *value)
    } else {
        valued.last().map(|(_, value)| *value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn point(timestamp: Option<&str>, value: Option<f64>) -> ApiDataPoint {
        ApiDataPoint {
            timestamp: timestamp.map(str::to_string),
            value,
        }
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(TimeseriesCategory::Service.as_ref(), "SERVICE");
        assert_eq!(TimeseriesCategory::Role.to_string(), "ROLE");
        assert_eq!(
            TimeseriesCategory::from_str("ROLE").unwrap(),
            TimeseriesCategory::Role
        );
    }

    #[test]
    fn test_decode_service() {
        let body = json!({
            "name": "hdfs",
            "type": "HDFS",
            "healthSummary": "GOOD",
            "healthChecks": [
                {"name": "HDFS_CANARY_HEALTH", "summary": "GOOD", "explanation": "Canary passed"},
                {"name": "HDFS_HA_NAMENODE_HEALTH", "summary": "CONCERNING"}
            ]
        });

        let service = Service::decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(service.service_type, "HDFS");
        assert_eq!(service.health_summary, "GOOD");
        assert_eq!(service.health_checks.len(), 2);
        assert_eq!(service.health_checks[0].explanation, "Canary passed");
        assert_eq!(service.health_checks[1].explanation, "");
    }

    #[test]
    fn test_decode_service_missing_summary() {
        let body = json!({"type": "HDFS", "healthChecks": []});
        let err = Service::decode(body.to_string().as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField("healthSummary")));
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_decode_service_without_checks() {
        let body = json!({"type": "ZOOKEEPER", "healthSummary": "DISABLED"});
        let service = Service::decode(body.to_string().as_bytes()).unwrap();
        assert!(service.health_checks.is_empty());
    }

    #[test]
    fn test_decode_empty_and_garbage() {
        let err = Service::decode(b"").unwrap_err();
        assert!(matches!(err, DecodeError::Empty));
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);

        let err = Service::decode(b"<html>Unauthorized</html>").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));

        let err = Service::decode(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_decode_items() {
        let items = decode_items(br#"{"items": [{"a": 1}, {"b": 2}]}"#).unwrap();
        assert_eq!(items.len(), 2);

        let err = decode_items(br#"{"other": []}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField("items")));
    }

    #[test]
    fn test_decode_role() {
        let value = json!({
            "name": "hdfs-DATANODE-1",
            "type": "DATANODE",
            "serviceRef": {"clusterName": "cluster", "serviceName": "hdfs", "serviceType": "HDFS"},
            "hostRef": {"hostId": "abc", "hostname": "node1.example.com"},
            "healthSummary": "BAD",
            "healthChecks": [{"name": "DATA_NODE_FREE_SPACE", "summary": "BAD", "explanation": "Low"}]
        });

        let role = Role::from_value(value).unwrap();
        assert_eq!(role.role_type, "DATANODE");
        assert_eq!(role.name, "hdfs-DATANODE-1");
        assert_eq!(role.cluster_name, "cluster");
        assert_eq!(role.host_name, "node1.example.com");
        assert_eq!(role.service_type, "HDFS");
        assert_eq!(role.health_summary, "BAD");
        assert_eq!(role.health_checks[0].name, "DATA_NODE_FREE_SPACE");
    }

    #[test]
    fn test_decode_role_missing_host() {
        let value = json!({
            "name": "r", "type": "DATANODE", "healthSummary": "GOOD",
            "serviceRef": {"clusterName": "c", "serviceType": "HDFS"}
        });
        let err = Role::from_value(value).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField("hostRef")));
    }

    #[test]
    fn test_decode_schema_entry() {
        let entry =
            MetricSchemaEntry::from_value(json!({"name": "cpu_user_rate", "isCounter": false}))
                .unwrap();
        assert_eq!(entry.name, "cpu_user_rate");
        assert_eq!(entry.description, "");

        assert!(MetricSchemaEntry::from_value(json!({"description": "x"})).is_err());
    }

    #[test]
    fn test_service_sample_blanks_host_and_role() {
        let value = json!({
            "metadata": {
                "metricName": "cpu_user",
                "attributes": {
                    "entityName": "svc1", "serviceType": "HDFS", "category": "SERVICE",
                    "serviceName": "hdfs1", "hostname": "ignored", "roleType": "ignored"
                }
            },
            "data": [{"value": 1.0}, {"value": 2.5}]
        });

        let sample = TimeseriesSample::from_value(value, TimeseriesCategory::Service)
            .unwrap()
            .unwrap();
        assert_eq!(sample.metric_name, "cpu_user");
        assert_eq!(sample.value, 2.5);
        assert_eq!(
            sample.attributes.label_values(),
            vec!["svc1", "HDFS", "SERVICE", "", "", "hdfs1"]
        );
    }

    #[test]
    fn test_role_sample_requires_host() {
        let value = json!({
            "metadata": {
                "metricName": "mem_rss",
                "attributes": {
                    "entityName": "hdfs-DATANODE-1", "serviceType": "HDFS",
                    "category": "ROLE", "serviceName": "hdfs1", "roleType": "DATANODE"
                }
            },
            "data": [{"value": 10.0}]
        });
        let err = TimeseriesSample::from_value(value, TimeseriesCategory::Role).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField("attributes.hostname")));
    }

    #[test]
    fn test_sample_without_points_is_skipped() {
        let value = json!({"metadata": {"metricName": "cpu_user"}, "data": []});
        assert!(
            TimeseriesSample::from_value(value, TimeseriesCategory::Service)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_latest_value_uses_last_point_without_timestamps() {
        let points = vec![point(None, Some(1.0)), point(None, Some(2.5))];
        assert_eq!(latest_value(&points), Some(2.5));
    }

    #[test]
    fn test_latest_value_prefers_newest_timestamp() {
        let points = vec![
            point(Some("2024-03-01T12:01:00.000Z"), Some(7.0)),
            point(Some("2024-03-01T12:00:00.000Z"), Some(3.0)),
        ];
        assert_eq!(latest_value(&points), Some(7.0));
    }

    #[test]
    fn test_latest_value_falls_back_on_unparseable_timestamp() {
        let points = vec![
            point(Some("2024-03-01T12:01:00.000Z"), Some(7.0)),
            point(Some("yesterday"), Some(3.0)),
        ];
        assert_eq!(latest_value(&points), Some(3.0));
    }

    #[test]
    fn test_latest_value_ignores_null_values() {
        let points = vec![point(None, Some(4.0)), point(None, None)];
        assert_eq!(latest_value(&points), Some(4.0));
        assert_eq!(latest_value(&[point(None, None)]), None);
    }

    #[test]
    fn test_series_of() {
        let item = json!({"timeSeries": [{"data": []}, {"data": []}]});
        assert_eq!(TimeseriesSample::series_of(item).unwrap().len(), 2);
        assert!(TimeseriesSample::series_of(json!({"warnings": []})).is_err());
    }
}
