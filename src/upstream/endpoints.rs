//! URL assembly for the Cloudera Manager REST resources.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use url::Url;

use super::model::TimeseriesCategory;

/// View requested for service and role resources.
const HEALTH_VIEW_QUERY: &str = "view=FULL_WITH_HEALTH_CHECK_EXPLANATION";

/// Trailing window for timeseries queries, in seconds.
pub const TIMESERIES_LOOKBACK_SECS: i64 = 120;

/// Resolves upstream resource URLs for one API address and version.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Create endpoints for `address` (`host:port`, optionally with an
    /// explicit `http://` or `https://` scheme) and `api_version`.
    ///
    /// # Errors
    /// Returns a parse error if the address does not form a valid base URL.
    pub fn new(address: &str, api_version: &str) -> Result<Self, url::ParseError> {
        let address = address.trim_end_matches('/');
        let mut base = if address.contains("://") {
            Url::parse(address)?
        } else {
            Url::parse(&format!("http://{address}"))?
        };
        if base.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
        }
        base.set_query(None);
        if let Ok(mut segments) = base.path_segments_mut() {
            segments.pop_if_empty().push("api").push(api_version);
        }
        Ok(Self { base })
    }

    /// `GET /clusters/{cluster}/services/{component}` with health check explanations.
    pub fn service(&self, cluster: &str, component: &str) -> Url {
        let mut url = self.join(&["clusters", cluster, "services", component]);
        url.set_query(Some(HEALTH_VIEW_QUERY));
        url
    }

    /// `GET /clusters/{cluster}/services/{component}/roles` with health check explanations.
    pub fn roles(&self, cluster: &str, component: &str) -> Url {
        let mut url = self.join(&["clusters", cluster, "services", component, "roles"]);
        url.set_query(Some(HEALTH_VIEW_QUERY));
        url
    }

    /// `GET /timeseries/schema`.
    pub fn timeseries_schema(&self) -> Url {
        self.join(&["timeseries", "schema"])
    }

    /// `POST /timeseries`.
    pub fn timeseries(&self) -> Url {
        self.join(&["timeseries"])
    }

    fn join(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }
}

/// Body of a `POST /timeseries` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeseriesQuery {
    pub query: String,
    pub from: String,
}

impl TimeseriesQuery {
    /// Query every metric of `category` over the trailing window ending at `now`.
    pub fn new(category: TimeseriesCategory, now: DateTime<Utc>) -> Self {
        Self {
            query: format!("SELECT * WHERE category = {}", category.as_ref()),
            from: (now - chrono::Duration::seconds(TIMESERIES_LOOKBACK_SECS))
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Serialize to the JSON request body.
    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn endpoints() -> Endpoints {
        Endpoints::new("cm.example.com:7180", "v33").unwrap()
    }

    #[test]
    fn test_service_url() {
        let url = endpoints().service("Cluster 1", "hdfs");
        assert_eq!(
            url.as_str(),
            "http://cm.example.com:7180/api/v33/clusters/Cluster%201/services/hdfs?view=FULL_WITH_HEALTH_CHECK_EXPLANATION"
        );
    }

    #[test]
    fn test_roles_url() {
        let url = endpoints().roles("Cluster 1", "zookeeper");
        assert_eq!(
            url.as_str(),
            "http://cm.example.com:7180/api/v33/clusters/Cluster%201/services/zookeeper/roles?view=FULL_WITH_HEALTH_CHECK_EXPLANATION"
        );
    }

    #[test]
    fn test_timeseries_urls() {
        let endpoints = endpoints();
        assert_eq!(
            endpoints.timeseries_schema().as_str(),
            "http://cm.example.com:7180/api/v33/timeseries/schema"
        );
        assert_eq!(
            endpoints.timeseries().as_str(),
            "http://cm.example.com:7180/api/v33/timeseries"
        );
    }

    #[test]
    fn test_explicit_scheme_is_kept() {
        let endpoints = Endpoints::new("https://cm.example.com:7183/", "v41").unwrap();
        assert_eq!(
            endpoints.timeseries().as_str(),
            "https://cm.example.com:7183/api/v41/timeseries"
        );
    }

    #[test]
    fn test_invalid_address() {
        assert!(Endpoints::new("", "v33").is_err());
        assert!(Endpoints::new("cm.example.com:notaport", "v33").is_err());
    }

    #[test]
    fn test_timeseries_query_body() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 30).unwrap();

        let query = TimeseriesQuery::new(TimeseriesCategory::Service, now);
        assert_eq!(query.query, "SELECT * WHERE category = SERVICE");
        assert_eq!(query.from, "2024-03-01T11:58:30Z");

        let body: serde_json::Value = serde_json::from_slice(
            &TimeseriesQuery::new(TimeseriesCategory::Role, now)
                .to_body()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(body["query"], "SELECT * WHERE category = ROLE");
        assert_eq!(body["from"], "2024-03-01T11:58:30Z");
    }
}
