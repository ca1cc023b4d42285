//! Scriptable in-memory transport for collector tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::transport::{HttpMethod, Transport, UpstreamRequest};

struct Route {
    method: HttpMethod,
    path: String,
    body_contains: Option<String>,
    response: Vec<u8>,
}

/// A recorded fetch with its start and end instants.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub request: UpstreamRequest,
    pub started: Instant,
    pub finished: Instant,
}

/// Transport answering from canned routes; unmatched requests get an empty body.
#[derive(Default)]
pub(crate) struct StubTransport {
    routes: Vec<Route>,
    delay: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `GET {path}` with `response`.
    pub fn get(mut self, path: &str, response: impl Into<String>) -> Self {
        self.routes.push(Route {
            method: HttpMethod::Get,
            path: path.to_string(),
            body_contains: None,
            response: response.into().into_bytes(),
        });
        self
    }

    /// Answer `POST {path}` whose body contains `needle` with `response`.
    pub fn post(mut self, path: &str, needle: &str, response: impl Into<String>) -> Self {
        self.routes.push(Route {
            method: HttpMethod::Post,
            path: path.to_string(),
            body_contains: Some(needle.to_string()),
            response: response.into().into_bytes(),
        });
        self
    }

    /// Sleep for `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &UpstreamRequest) -> Vec<u8> {
        let body = request
            .body
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default();

        self.routes
            .iter()
            .find(|route| {
                route.method == request.method
                    && route.path == request.url.path()
                    && route
                        .body_contains
                        .as_deref()
                        .is_none_or(|needle| body.contains(needle))
            })
            .map(|route| route.response.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Transport for StubTransport {
    async fn fetch(&self, request: UpstreamRequest) -> Vec<u8> {
        let started = Instant::now();
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = self.respond(&request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(Call {
                request,
                started,
                finished: Instant::now(),
            });
        }
        response
    }
}
