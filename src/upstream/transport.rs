//! Authenticated HTTP transport for upstream API calls.
//!
//! A failed request never surfaces as an error to the collectors: the
//! transport logs what went wrong and hands back an empty body, which the
//! decoders then treat as "no data this scrape".

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use thiserror::Error;
use url::Url;

/// Content type sent with every upstream request.
pub const CONTENT_TYPE_JSON: &str = "application/json;charset=utf-8";

/// Language preference sent with every upstream request.
pub const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9";

/// Errors raised while building the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The credential cannot be carried in an HTTP header.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// HTTP method for upstream requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    /// Get the method name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A single upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub body: Option<Vec<u8>>,
}

impl UpstreamRequest {
    /// Build a GET request without a body.
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            body: None,
        }
    }

    /// Build a POST request carrying a JSON body.
    pub fn post(url: Url, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            body: Some(body),
        }
    }
}

/// Executes upstream requests.
///
/// Implementations return the raw response body, or an empty vector when
/// anything along the way fails. Failures are logged by the implementation.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Fetch the body of `request`.
    async fn fetch(&self, request: UpstreamRequest) -> Vec<u8>;
}

/// [`Transport`] backed by a shared `reqwest` client.
///
/// Every request carries the JSON content type, the fixed language preference
/// and the pre-encoded `Authorization` credential.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport that authenticates with `credential`.
    ///
    /// # Errors
    /// Returns `TransportError::InvalidCredential` if the credential contains
    /// bytes that are not valid in a header, or `TransportError::Client` if
    /// the client cannot be built.
    pub fn new(credential: &str, request_timeout: Duration) -> Result<Self, TransportError> {
        let mut authorization = HeaderValue::from_str(credential)
            .map_err(|e| TransportError::InvalidCredential(e.to_string()))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE),
        );
        headers.insert(AUTHORIZATION, authorization);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()?;

        Ok(Self { client })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: UpstreamRequest) -> Vec<u8> {
        let method = request.method.as_str();
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url.clone()),
            HttpMethod::Post => self.client.post(request.url.clone()),
        };
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    method,
                    url = %request.url,
                    error = %e,
                    "Upstream request failed"
                );
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                method,
                url = %request.url,
                status = status.as_u16(),
                "Upstream returned non-success status"
            );
            return Vec::new();
        }

        match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                tracing::error!(
                    method,
                    url = %request.url,
                    error = %e,
                    "Failed to read upstream response body"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_as_str() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }

    #[test]
    fn test_request_constructors() {
        let url = Url::parse("http://cm.example.com:7180/api/v33/timeseries").unwrap();

        let get = UpstreamRequest::get(url.clone());
        assert_eq!(get.method, HttpMethod::Get);
        assert!(get.body.is_none());

        let post = UpstreamRequest::post(url, b"{}".to_vec());
        assert_eq!(post.method, HttpMethod::Post);
        assert_eq!(post.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_transport_rejects_header_unsafe_credential() {
        let result = HttpTransport::new("Basic abc\ndef", Duration::from_secs(1));
        assert!(matches!(result, Err(TransportError::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_yields_empty_body() {
        let transport = HttpTransport::new("Basic YWRtaW46YWRtaW4=", Duration::from_secs(2))
            .expect("transport should build");

        // Port 9 (discard) on localhost is closed in test environments.
        let url = Url::parse("http://127.0.0.1:9/api/v33/timeseries/schema").unwrap();
        let body = transport.fetch(UpstreamRequest::get(url)).await;
        assert!(body.is_empty());
    }
}
